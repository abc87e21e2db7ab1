pub mod auth;
pub mod health;
pub mod tasks;

use actix_cors::Cors;
use actix_web::{
    error::{JsonPayloadError, PathError},
    web, HttpRequest,
};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// CORS for the browser client: a single allowed origin, or any origin when unset.
pub fn cors(allowed_origin: Option<&str>) -> Cors {
    let cors = match allowed_origin {
        Some(origin) => Cors::default().allowed_origin(origin),
        None => Cors::default().allow_any_origin(),
    };
    cors.allow_any_method().allow_any_header().max_age(3600)
}

/// Registers every route: `/health` plus the `/api` scope guarded by `AuthMiddleware`.
///
/// The app must provide `web::Data<SqlitePool>` and `web::Data<AuthSettings>`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health).service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .configure(api_config),
    );
}

/// The `/api` routes without the scope or middleware.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(auth::register)
        .service(auth::login)
        .service(auth::current_user)
        .service(auth::logout)
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task)
                .service(tasks::toggle_complete),
        );
}

// Malformed bodies and wrong JSON types get the same JSON error shape as everything else.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Malformed JSON body: {}", err)).into()
}

// Ids that do not parse can never name a task.
fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("unparseable path {}: {}", req.path(), err);
    AppError::NotFound("Task not found".into()).into()
}
