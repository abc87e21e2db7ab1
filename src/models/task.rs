use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const TITLE_MAX_CHARS: usize = 255;

/// A task as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    /// Owner. Set from the authenticated caller on creation, never reassigned.
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. Every rule applies, `title` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewTask {
    #[validate(required, custom = "validate_title")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp; only the date is kept.
    #[validate(custom = "validate_due_date")]
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Input for updating a task.
///
/// The outer `Option` tells whether the field was sent at all; absent fields are left
/// untouched. For `description` and `due_date` an explicit `null` clears the value,
/// while `title` may be omitted but never nulled or blanked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskChanges {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
}

impl TaskChanges {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn due_date(mut self, due_date: Option<String>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }
}

impl Validate for TaskChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match &self.title {
            Some(None) => errors.add("title", ValidationError::new("required")),
            Some(Some(title)) => {
                if let Err(err) = validate_title(title) {
                    errors.add("title", err);
                }
            }
            None => {}
        }

        if let Some(Some(due_date)) = &self.due_date {
            if let Err(err) = validate_due_date(due_date) {
                errors.add("due_date", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// Wraps any value that is present in the payload, `null` included, in `Some`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        let mut err = ValidationError::new("length");
        err.message = Some(Cow::Borrowed(
            "The title may not be greater than 255 characters.",
        ));
        return Err(err);
    }
    Ok(())
}

fn validate_due_date(due_date: &str) -> Result<(), ValidationError> {
    match parse_due_date(due_date) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("date");
            err.message = Some(Cow::Borrowed("The due date is not a valid date."));
            Err(err)
        }
    }
}

/// Accepts `2024-05-01`, `2024-05-01 10:00:00` and RFC 3339 timestamps.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
