use crate::{
    auth::{
        activation::{
            generate_otp, issue_activation_token, issue_reset_token, verify_activation,
            verify_reset_token, PendingUser,
        },
        generate_token, hash_password, verify_password, AuthResponse, ForgotPasswordRequest,
        LoginRequest, RegisterRequest, RegisterResponse, ResetPasswordRequest, ResetQuery,
        VerifyOtpRequest,
    },
    error::AppError,
    mail::Mail,
    models::{UserProfile, UserRole},
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Start a registration
///
/// Emails a one-time code and returns the activation token that carries the
/// pending account. Nothing is stored until `verify-user` succeeds.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let request = register_data.into_inner();
    let email = normalize_email(&request.email);

    let role = request.role.unwrap_or_default();
    if role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts can not be self-registered".into(),
        ));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let pending = PendingUser {
        name: request.name.trim().to_string(),
        email: email.clone(),
        password_hash: hash_password(&request.password, state.auth.bcrypt_cost)?,
        role,
    };
    let otp = generate_otp();
    let activation_token =
        issue_activation_token(pending.clone(), &otp, &state.auth.activation_secret)?;

    state
        .mailer
        .send(Mail::otp(&pending.email, &pending.name, &otp))
        .await?;
    log::info!("registration started for {}", email);

    Ok(HttpResponse::Ok().json(RegisterResponse {
        message: "Otp sent to your mail".into(),
        activation_token,
    }))
}

/// Confirm a registration with the mailed one-time code and create the user.
#[post("/verify-user")]
pub async fn verify_user(
    state: web::Data<AppState>,
    verify_data: web::Json<VerifyOtpRequest>,
) -> Result<impl Responder, AppError> {
    verify_data.validate()?;

    let pending = verify_activation(
        &verify_data.activation_token,
        &verify_data.otp,
        &state.auth.activation_secret,
    )?;

    // The same token may be replayed within its lifetime.
    if state.store.find_user_by_email(&pending.email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let user = state.store.create_user(pending.into()).await?;
    log::info!("user {} registered as {:?}", user.email, user.role);

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": UserProfile::from(&user),
    })))
}

/// Login user
///
/// Authenticates a user and returns a session token valid for fifteen days.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let email = normalize_email(&login_data.email);

    let user = state.store.find_user_by_email(&email).await?;

    match user {
        Some(user) if verify_password(&login_data.password, &user.password_hash)? => {
            let token = generate_token(user.id, &state.auth.jwt_secret)?;
            Ok(HttpResponse::Ok().json(AuthResponse {
                message: format!("Welcome back {}", user.name),
                token,
                user: UserProfile::from(&user),
            }))
        }
        _ => {
            log::info!("failed login for {}", email);
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
    }
}

/// Mail a password-reset link valid for five minutes.
#[post("/forgot")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    forgot_data: web::Json<ForgotPasswordRequest>,
) -> Result<impl Responder, AppError> {
    forgot_data.validate()?;
    let email = normalize_email(&forgot_data.email);

    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::BadRequest("No user with this email".into()))?;

    let (token, expires_at) = issue_reset_token(&user.email, &state.auth.forgot_secret)?;
    user.reset_password_expires = Some(expires_at);
    state.store.save_user(&user).await?;

    state
        .mailer
        .send(Mail::password_reset(&user.email, &state.reset_link(&token)))
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Reset password link is sent to your mail"
    })))
}

/// Set a new password using the token from the reset link.
#[post("/reset")]
pub async fn reset_password(
    state: web::Data<AppState>,
    query: web::Query<ResetQuery>,
    reset_data: web::Json<ResetPasswordRequest>,
) -> Result<impl Responder, AppError> {
    reset_data.validate()?;

    let email = verify_reset_token(&query.token, &state.auth.forgot_secret)?;
    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::BadRequest("User doesn't exist".into()))?;

    match user.reset_password_expires {
        Some(expires_at) if expires_at > Utc::now() => {}
        _ => return Err(AppError::BadRequest("Token expired".into())),
    }

    user.password_hash = hash_password(&reset_data.password, state.auth.bcrypt_cost)?;
    user.reset_password_expires = None;
    state.store.save_user(&user).await?;
    log::info!("password reset for {}", user.email);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password reset successfully"
    })))
}
