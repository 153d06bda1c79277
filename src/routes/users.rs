use crate::{
    auth::CurrentUser,
    availability,
    error::AppError,
    models::{UpdateOperatorRequest, UpdateProfileRequest, UserProfile, UserRole},
    routes::auth::normalize_email,
    state::AppState,
    uploads::{self, Accept, IMAGE_EXTENSIONS},
};
use actix_multipart::Multipart;
use actix_web::{get, put, web, HttpResponse, Responder};
use serde_json::json;
use tokio::fs;
use uuid::Uuid;
use validator::Validate;

/// Returns the caller's profile.
#[get("/my-profile")]
pub async fn get_my_profile(current: CurrentUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(json!({ "user": UserProfile::from(&current.0) })))
}

/// Updates the caller's name and/or email.
#[put("/my-profile")]
pub async fn update_my_profile(
    state: web::Data<AppState>,
    current: CurrentUser,
    profile_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;
    let profile_data = profile_data.into_inner();
    let mut user = current.0;

    if let Some(name) = profile_data.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = profile_data.email {
        let email = normalize_email(&email);
        if email != user.email && state.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("Email already in use".into()));
        }
        user.email = email;
    }

    let user = state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": UserProfile::from(&user) })))
}

/// Replaces the caller's profile picture with the uploaded image.
///
/// Expects `multipart/form-data` with a `file` field holding a png, jpg, gif or webp image.
#[put("/my-profile/profilepic")]
pub async fn update_profile_pic(
    state: web::Data<AppState>,
    current: CurrentUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let form = uploads::receive(
        payload,
        &state.uploads,
        Accept::Extensions(IMAGE_EXTENSIONS),
    )
    .await?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;

    let mut user = current.0;
    let previous = user.profile_picture.replace(uploads::public_path(&file.file_name));
    let user = match state.store.save_user(&user).await {
        Ok(user) => user,
        Err(err) => {
            uploads::discard(&form, &state.uploads).await;
            return Err(err);
        }
    };

    if let Some(old_name) = previous.as_deref().and_then(|path| path.strip_prefix("/public/")) {
        if let Some(old_path) = uploads::stored_path(&state.uploads.dir, old_name) {
            if let Err(err) = fs::remove_file(&old_path).await {
                log::warn!("could not remove old profile picture {}: {}", old_name, err);
            }
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile picture updated",
        "user": UserProfile::from(&user),
    })))
}

/// Lists every operator with its active-task count and availability.
#[get("/operators")]
pub async fn get_all_operators(
    state: web::Data<AppState>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    current.require_supervisor()?;

    let operators = state.store.list_users_by_role(UserRole::Operator).await?;
    let ids: Vec<Uuid> = operators.iter().map(|operator| operator.id).collect();
    let counts = state.store.active_task_counts(&ids).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "operators": availability::summarize(&operators, &counts),
    })))
}

/// Lets a supervisor rename, re-email or recategorize an operator.
#[put("/operators/{operator_id}")]
pub async fn update_operator(
    state: web::Data<AppState>,
    current: CurrentUser,
    operator_id: web::Path<Uuid>,
    operator_data: web::Json<UpdateOperatorRequest>,
) -> Result<impl Responder, AppError> {
    current.require_supervisor()?;
    operator_data.validate()?;
    let operator_data = operator_data.into_inner();

    let mut operator = state
        .store
        .find_user_by_id(operator_id.into_inner())
        .await?
        .filter(|user| user.is_operator())
        .ok_or_else(|| AppError::NotFound("Operator not found".into()))?;

    if let Some(name) = operator_data.name {
        operator.name = name.trim().to_string();
    }
    if let Some(email) = operator_data.email {
        let email = normalize_email(&email);
        if email != operator.email && state.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("Email already in use".into()));
        }
        operator.email = email;
    }
    if let Some(category) = operator_data.category {
        operator.category = Some(category);
    }

    let operator = state.store.save_user(&operator).await?;
    log::info!("operator {} updated by {}", operator.id, current.id());

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Operator updated successfully",
        "operator": UserProfile::from(&operator),
    })))
}
