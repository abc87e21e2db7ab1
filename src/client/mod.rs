//! Client side of taskdeck: what a UI layer binds to.

pub mod api;
pub mod app;
pub mod auth_store;
mod error;
pub mod router;
pub mod storage;
pub mod task_store;

pub use api::{ApiClient, AuthApi, TaskApi};
pub use app::ClientApp;
pub use auth_store::{AuthStore, Credentials, DEFAULT_DEVICE_NAME};
pub use error::ClientError;
pub use router::{guard, AuthStatus, Navigation, Route, Router};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use task_store::{TaskState, TaskStore};
