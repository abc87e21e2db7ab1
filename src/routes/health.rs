use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

/// Liveness probe. Not behind authentication.
///
/// ## Responses:
/// - `200 OK`: `{"status": "ok", "database": "ok", "timestamp": ...}`.
/// - `503 Service Unavailable`: the database did not answer.
#[get("/health")]
pub async fn health(pool: web::Data<SqlitePool>) -> impl Responder {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "database": "ok",
            "timestamp": Utc::now()
        })),
        Err(err) => {
            log::error!("health check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(json!({
                "message": "Database unavailable",
                "status": "degraded",
                "database": "unreachable",
                "timestamp": Utc::now()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_database() {
        let pool = crate::db::setup("sqlite::memory:").await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .service(health),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "ok");
        assert!(json["timestamp"].is_string());

        pool.close().await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
