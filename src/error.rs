//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the server side
//! of the application. Every failure a handler can produce, from a malformed request body
//! to a task owned by somebody else, ends up as one of its variants.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so handlers simply return
//! `Result<_, AppError>` and the variant decides the HTTP status. Every JSON error body
//! carries a `message` key; validation failures add a per-field `errors` map.

use std::borrow::Cow;
use std::collections::BTreeMap;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use validator::{ValidationError, ValidationErrors};

/// Message used for every 422 response.
pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// Represents all possible errors that can occur within the API.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed, expired or revoked credentials (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated, but the policy denied the action (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The request body could not be parsed (HTTP 400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// An unexpected server-side error (HTTP 500).
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    /// A failure reported by sqlx (HTTP 500). The detail is logged, not returned.
    #[error("Database Error: {0}")]
    DatabaseError(String),
    /// Field-level input validation failures (HTTP 422).
    #[error("Validation Error: {0}")]
    ValidationError(ValidationErrors),
}

impl AppError {
    /// Builds a single-field validation error, for checks that need the database
    /// (such as a duplicate email) and so cannot live in a `Validate` derive.
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    /// The human-readable message placed under the `message` key.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "Database error".to_string(),
            AppError::ValidationError(_) => VALIDATION_MESSAGE.to_string(),
        }
    }
}

/// Flattens `ValidationErrors` into `{ field: [message, ...] }`, sorted by field name.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|err| match &err.message {
                    Some(message) => message.to_string(),
                    None => default_message(field, &err.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn default_message(field: &str, code: &str) -> String {
    let label = field.replace('_', " ");
    match code {
        "required" => format!("The {} field is required.", label),
        "email" => format!("The {} must be a valid email address.", label),
        "length" => format!("The {} has an invalid length.", label),
        "must_match" => format!("The {} confirmation does not match.", label),
        "regex" => format!("The {} format is invalid.", label),
        _ => format!("The {} is invalid.", label),
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ValidationError(errors) => json!({
                "message": self.public_message(),
                "errors": field_messages(errors),
            }),
            _ => json!({ "message": self.public_message() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// `RowNotFound` becomes `NotFound`; everything else is logged and hidden behind a 500.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => {
                log::error!("database error: {}", error);
                AppError::DatabaseError(error.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error)
    }
}

/// JWT processing failures surface as 401.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            AppError::Unauthorized("Invalid token".into())
                .error_response()
                .status(),
            401
        );
        assert_eq!(
            AppError::Forbidden("nope".into()).error_response().status(),
            403
        );
        assert_eq!(
            AppError::BadRequest("Invalid input".into())
                .error_response()
                .status(),
            400
        );
        assert_eq!(
            AppError::NotFound("Resource not found".into())
                .error_response()
                .status(),
            404
        );
        assert_eq!(
            AppError::DatabaseError("boom".into())
                .error_response()
                .status(),
            500
        );
        assert_eq!(
            AppError::invalid_field("email", "unique", "taken")
                .error_response()
                .status(),
            422
        );
    }

    #[actix_rt::test]
    async fn test_validation_body_lists_field_messages() {
        let error = AppError::invalid_field(
            "email",
            "unique",
            "The email has already been taken.",
        );
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], VALIDATION_MESSAGE);
        assert_eq!(json["errors"]["email"][0], "The email has already been taken.");
    }

    #[actix_rt::test]
    async fn test_database_detail_is_not_leaked() {
        let error = AppError::DatabaseError("no such table: tasks".into());
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "Database error");
    }

    #[test]
    fn test_default_messages_name_the_field() {
        let mut errors = ValidationErrors::new();
        errors.add("due_date", ValidationError::new("required"));
        errors.add("password", ValidationError::new("must_match"));

        let messages = field_messages(&errors);
        assert_eq!(messages["due_date"], vec!["The due date field is required."]);
        assert_eq!(
            messages["password"],
            vec!["The password confirmation does not match."]
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound(_)
        ));
    }
}
