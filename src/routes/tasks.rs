use crate::{
    auth::CurrentUser,
    availability::{self, Availability},
    error::AppError,
    models::{AssignRequest, CommentRequest, StatusRequest, Task, TaskInput},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Loads a task the caller may see: its creator, one of its assignees, or an admin.
///
/// A task the caller can not see is reported as missing.
async fn visible_task(
    state: &AppState,
    current: &CurrentUser,
    task_id: Uuid,
) -> Result<Task, AppError> {
    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if task.created_by == current.id() || task.is_assigned_to(current.id()) || current.0.is_admin()
    {
        Ok(task)
    } else {
        Err(AppError::NotFound("Task not found".into()))
    }
}

/// Loads a task the caller manages: a supervisor who created it, or an admin.
async fn managed_task(
    state: &AppState,
    current: &CurrentUser,
    task_id: Uuid,
) -> Result<Task, AppError> {
    current.require_supervisor()?;
    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if task.created_by == current.id() || current.0.is_admin() {
        Ok(task)
    } else {
        Err(AppError::Forbidden(
            "Only the task creator can manage this task".into(),
        ))
    }
}

/// Creates a new, unassigned task owned by the calling supervisor.
///
/// ## Responses:
/// - `201 Created`: `{success, data}` with the new task.
/// - `403 Forbidden`: the caller is not a supervisor.
/// - `422 Unprocessable Entity`: the input failed validation.
#[post("/create")]
pub async fn create_task(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    current.require_supervisor()?;
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), current.id());
    let task = state.store.create_task(&task).await?;
    log::info!("task {} created by {}", task.id, current.id());

    Ok(HttpResponse::Created().json(json!({ "success": true, "data": task })))
}

/// Lists the caller's tasks, newest first.
///
/// Supervisors and admins get the tasks they created, operators the tasks assigned to them.
#[get("/my-tasks")]
pub async fn get_my_tasks(
    state: web::Data<AppState>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let tasks = if current.0.is_supervisor() {
        state.store.list_tasks_created_by(current.id()).await?
    } else {
        state.store.list_tasks_assigned_to(current.id()).await?
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "tasks": tasks })))
}

#[get("/{task_id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&state, &current, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task })))
}

/// Replaces title, description and deadline; priority and status only when given.
#[put("/{task_id}/update")]
pub async fn update_task(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let mut task = managed_task(&state, &current, task_id.into_inner()).await?;
    task_data.validate()?;

    task.apply(task_data.into_inner());
    let task = state.store.save_task(&task).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task })))
}

#[delete("/{task_id}/delete")]
pub async fn delete_task(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = managed_task(&state, &current, task_id.into_inner()).await?;

    if !state.store.delete_task(task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }
    log::info!("task {} deleted by {}", task.id, current.id());

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Task deleted successfully",
    })))
}

/// Replaces the assignee list of a task.
///
/// Every id must belong to an operator. Operators joining the task must be
/// available unless the task is already completed; operators that stay keep
/// their slot whatever their load.
///
/// ## Responses:
/// - `200 OK`: `{success, task}`.
/// - `400 Bad Request`: an id is unknown or not an operator.
/// - `409 Conflict`: a newly added operator is busy.
#[put("/{task_id}/assign")]
pub async fn assign_task(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
    assign_data: web::Json<AssignRequest>,
) -> Result<impl Responder, AppError> {
    let task = managed_task(&state, &current, task_id.into_inner()).await?;
    let requested = availability::dedup_preserving_order(&assign_data.assigned_to);

    let mut operators = Vec::with_capacity(requested.len());
    for id in &requested {
        match state.store.find_user_by_id(*id).await? {
            Some(user) if user.is_operator() => operators.push(user),
            _ => {
                return Err(AppError::BadRequest(format!(
                    "User {} is not an operator",
                    id
                )))
            }
        }
    }

    if task.status.is_active() {
        let added = availability::newly_added(&task.assigned_to, &requested);
        if !added.is_empty() {
            let counts = state.store.active_task_counts(&added).await?;
            let busy = operators.iter().find(|operator| {
                added.contains(&operator.id)
                    && Availability::from_active_count(
                        counts.get(&operator.id).copied().unwrap_or(0),
                    ) == Availability::Busy
            });
            if let Some(operator) = busy {
                return Err(AppError::Conflict(format!(
                    "Operator {} is busy",
                    operator.name
                )));
            }
        }
    }

    let task = state.store.set_assignees(task.id, &requested).await?;
    log::info!("task {} assigned to {} operator(s)", task.id, requested.len());

    Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task })))
}

/// Lets an assigned operator move a task between statuses.
#[put("/{task_id}/status")]
pub async fn update_task_status(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
    status_data: web::Json<StatusRequest>,
) -> Result<impl Responder, AppError> {
    current.require_operator()?;
    let mut task = state
        .store
        .find_task(task_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if !task.is_assigned_to(current.id()) {
        return Err(AppError::Forbidden(
            "You are not assigned to this task".into(),
        ));
    }

    task.status = status_data.status;
    let task = state.store.save_task(&task).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task })))
}

#[post("/{task_id}/comments")]
pub async fn add_comment(
    state: web::Data<AppState>,
    current: CurrentUser,
    task_id: web::Path<Uuid>,
    comment_data: web::Json<CommentRequest>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&state, &current, task_id.into_inner()).await?;
    comment_data.validate()?;

    let task = state
        .store
        .add_comment(task.id, current.id(), comment_data.text.trim())
        .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "task": task })))
}
