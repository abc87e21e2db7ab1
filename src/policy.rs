//! Ownership-based authorization.
//!
//! A policy answers "may this user perform this action on this resource". The
//! answer is a plain `bool`; `authorize` turns a denial into `AppError::Forbidden`,
//! which is kept apart from `NotFound` so callers can tell the two cases apart.

use std::fmt;

use crate::error::AppError;
use crate::models::Task;

/// Actions a caller can attempt on a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    View,
    Update,
    Delete,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            TaskAction::View => "view",
            TaskAction::Update => "update",
            TaskAction::Delete => "delete",
        };
        f.write_str(verb)
    }
}

pub trait Authorizer<R> {
    type Action: fmt::Display + Copy;

    fn can(&self, user_id: i64, action: Self::Action, resource: &R) -> bool;

    fn authorize(&self, user_id: i64, action: Self::Action, resource: &R) -> Result<(), AppError> {
        if self.can(user_id, action, resource) {
            Ok(())
        } else {
            log::warn!("user {} denied {} access", user_id, action);
            Err(AppError::Forbidden(format!(
                "This action is unauthorized: you may not {} this resource.",
                action
            )))
        }
    }
}

/// Tasks are private to their owner. Every action uses the same rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskPolicy;

impl Authorizer<Task> for TaskPolicy {
    type Action = TaskAction;

    fn can(&self, user_id: i64, _action: TaskAction, task: &Task) -> bool {
        task.user_id == user_id
    }
}
