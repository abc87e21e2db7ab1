#![doc = "The `taskdeck` library crate."]
#![doc = ""]
#![doc = "Server side: domain models, token authentication, the ownership policy, the"]
#![doc = "database services and the actix-web routes used by the `taskdeck` binary."]
#![doc = "Client side: `client` holds the HTTP API client and the state stores a UI"]
#![doc = "layer drives (tasks, auth with durable token storage, and the route guard)."]

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod policy;
pub mod routes;
pub mod services;

pub use crate::error::AppError;
pub use crate::models::{NewTask, Task, TaskChanges, User};
