use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{NewTask, TaskChanges},
    services::tasks,
};
use actix_web::{delete, get, patch, post, route, web, HttpResponse, Responder};
use sqlx::SqlitePool;

/// Lists the authenticated user's tasks, newest first.
///
/// ## Responses:
/// - `200 OK`: a JSON array of `Task` objects.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = tasks::list_tasks(&pool, caller.user_id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task owned by the authenticated user.
///
/// ## Request Body:
/// - `title` (required): at most 255 characters.
/// - `description` (optional).
/// - `due_date` (optional): `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// ## Responses:
/// - `201 Created`: the new `Task`, with `completed: false`.
/// - `422 Unprocessable Entity`: field validation failed.
#[post("")]
pub async fn create_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_data: web::Json<NewTask>,
) -> Result<impl Responder, AppError> {
    let task = tasks::create_task(&pool, caller.user_id, task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `403 Forbidden`: the task belongs to another user.
/// - `404 Not Found`: no task with this id.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task = tasks::get_task(&pool, caller.user_id, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Fields left out of the body are not touched; `null`
/// clears `description` or `due_date`.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `403 Forbidden` / `404 Not Found`: as for `GET`.
/// - `422 Unprocessable Entity`: a sent field failed validation.
#[route("/{id}", method = "PUT", method = "PATCH")]
pub async fn update_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
    changes: web::Json<TaskChanges>,
) -> Result<impl Responder, AppError> {
    let task = tasks::update_task(
        &pool,
        caller.user_id,
        task_id.into_inner(),
        changes.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// ## Responses:
/// - `204 No Content`: deleted.
/// - `403 Forbidden` / `404 Not Found`: as for `GET`; a second delete is a 404.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    tasks::delete_task(&pool, caller.user_id, task_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Flips `completed` and returns the task.
#[patch("/{id}/complete")]
pub async fn toggle_complete(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task = tasks::toggle_complete(&pool, caller.user_id, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}
