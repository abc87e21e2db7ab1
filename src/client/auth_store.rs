use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::client::{AuthApi, ClientError, TokenStorage};
use crate::models::User;

pub const DEFAULT_DEVICE_NAME: &str = "taskdeck-client";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Default)]
struct AuthState {
    user: Option<User>,
    token: Option<String>,
}

/// Session state of the client: the bearer token and the signed-in user.
///
/// The token is persisted through `S` and installed as the API client's default
/// bearer header. Any failed sign-in, failed user lookup or logout clears the
/// token from memory, from storage and from the header.
pub struct AuthStore<A, S> {
    api: Arc<A>,
    storage: S,
    device_name: String,
    state: Mutex<AuthState>,
}

impl<A: AuthApi, S: TokenStorage> AuthStore<A, S> {
    /// Restores a persisted token, if any. The user is only known after `fetch_user`.
    pub fn new(api: Arc<A>, storage: S) -> Result<Self, ClientError> {
        let token = storage.load()?;
        Ok(Self {
            api,
            storage,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            state: Mutex::new(AuthState { user: None, token }),
        })
    }

    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().token.is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state().token.clone()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, ClientError> {
        let request = LoginRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
            device_name: self.device_name.clone(),
        };

        match self.sign_in(&request).await {
            Ok(user) => {
                log::info!("signed in as user {}", user.id);
                Ok(user)
            }
            Err(err) => {
                log::warn!("login failed: {}", err);
                self.clear_auth();
                Err(err)
            }
        }
    }

    async fn sign_in(&self, request: &LoginRequest) -> Result<User, ClientError> {
        let AuthResponse { token, .. } = self.api.login(request).await?;
        self.set_token(token)?;
        let user = self.api.current_user().await?;
        self.state().user = Some(user.clone());
        Ok(user)
    }

    /// Creates the account. The caller still has to log in.
    pub async fn register(&self, input: &RegisterRequest) -> Result<User, ClientError> {
        self.api.register(input).await
    }

    /// Revokes the token on the server, then forgets it locally even if the call failed.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.api.logout().await;
        if let Err(err) = &result {
            log::warn!("logout failed on the server: {}", err);
        }
        self.clear_auth();
        result
    }

    /// Resolves the user behind a persisted token. Without a token this does nothing.
    pub async fn fetch_user(&self) -> Result<Option<User>, ClientError> {
        let token = match self.token() {
            Some(token) => token,
            None => return Ok(None),
        };
        self.api.set_token(Some(token));

        match self.api.current_user().await {
            Ok(user) => {
                self.state().user = Some(user.clone());
                Ok(Some(user))
            }
            Err(err) => {
                log::warn!("could not restore session: {}", err);
                self.clear_auth();
                Err(err)
            }
        }
    }

    fn set_token(&self, token: String) -> Result<(), ClientError> {
        self.storage.save(&token)?;
        self.api.set_token(Some(token.clone()));
        self.state().token = Some(token);
        Ok(())
    }

    fn clear_auth(&self) {
        {
            let mut state = self.state();
            state.user = None;
            state.token = None;
        }
        self.api.set_token(None);
        if let Err(err) = self.storage.clear() {
            log::error!("failed to clear stored token: {}", err);
        }
    }
}
