#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use taskdeck::auth::AuthSettings;
use taskdeck::{db, routes};

pub fn settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl: chrono::Duration::hours(1),
        // Minimum bcrypt cost keeps registration fast under test.
        bcrypt_cost: 4,
    }
}

pub async fn pool() -> SqlitePool {
    db::setup("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database")
}

pub async fn init_app(
    pool: &SqlitePool,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(settings()))
            .wrap(routes::cors(None))
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

/// Sends `req` and returns the status with the body parsed as JSON (`Null` when empty).
pub async fn send(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    req: Request,
) -> (actix_web::http::StatusCode, Value) {
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!(
                "Body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&body)
            )
        })
    };
    (status, json)
}

/// Registers `name` as `<name>@example.com` and returns a bearer token for it.
pub async fn register_and_login(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    name: &str,
) -> String {
    let email = format!("{}@example.com", name.to_lowercase());
    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": "password123",
            "password_confirmation": "password123"
        }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, 201, "Registration failed: {}", body);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({
            "email": email,
            "password": "password123",
            "device_name": "integration-tests"
        }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, 200, "Login failed: {}", body);
    body["token"]
        .as_str()
        .expect("Login response has no token")
        .to_string()
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (
        actix_web::http::header::AUTHORIZATION,
        format!("Bearer {}", token),
    )
}
