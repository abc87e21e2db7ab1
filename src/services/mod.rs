//! Database-backed operations behind the HTTP handlers.
//!
//! Handlers stay thin: they extract the caller and the payload and hand both to these
//! functions, which validate, authorize and run the queries.

pub mod tasks;
pub mod users;
