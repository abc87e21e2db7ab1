use std::sync::Arc;

use crate::client::{
    ApiClient, AuthStore, ClientError, Credentials, Route, Router, TaskStore, TokenStorage,
};
use crate::models::User;

/// One client session: a shared `ApiClient`, both stores and the router.
pub struct ClientApp<S> {
    pub api: Arc<ApiClient>,
    pub auth: AuthStore<ApiClient, S>,
    pub tasks: TaskStore<ApiClient>,
    pub router: Router,
}

impl<S: TokenStorage> ClientApp<S> {
    pub fn new(base_url: &str, storage: S) -> Result<Self, ClientError> {
        let api = Arc::new(ApiClient::new(base_url)?);
        Ok(Self {
            auth: AuthStore::new(api.clone(), storage)?,
            tasks: TaskStore::new(api.clone()),
            router: Router::default(),
            api,
        })
    }

    /// Restores a persisted session, then routes to `initial` through the guard.
    /// A token the server no longer accepts is dropped and the user lands on login.
    pub async fn start(&self, initial: Route) -> Route {
        if let Err(err) = self.auth.fetch_user().await {
            log::info!("stored session discarded: {}", err);
        }
        let route = self.router.navigate(initial, &self.auth);
        if route == Route::Tasks {
            // The error is already recorded in the store.
            let _ = self.tasks.fetch_tasks().await;
        }
        route
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User, ClientError> {
        let user = self.auth.login(credentials).await?;
        self.router.navigate(Route::Tasks, &self.auth);
        self.tasks.fetch_tasks().await?;
        Ok(user)
    }

    /// Logs out, drops the local task list and returns to the login page.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = self.auth.logout().await;
        self.tasks.clear_tasks();
        self.router.navigate(Route::Login, &self.auth);
        result
    }
}
