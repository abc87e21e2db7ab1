//! HTTP access to the taskdeck API.
//!
//! `TaskApi` and `AuthApi` are the seams the stores depend on; `ApiClient` is the
//! reqwest implementation. Once a token is set it is sent as the default
//! `Authorization: Bearer` header of every request.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::client::ClientError;
use crate::models::{NewTask, Task, TaskChanges, User};

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError>;
    async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError>;
    async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<Task, ClientError>;
    async fn delete_task(&self, id: i64) -> Result<(), ClientError>;
    async fn toggle_complete(&self, id: i64) -> Result<Task, ClientError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Installs or removes the default bearer token.
    fn set_token(&self, token: Option<String>);
    async fn register(&self, input: &RegisterRequest) -> Result<User, ClientError>;
    async fn login(&self, input: &LoginRequest) -> Result<AuthResponse, ClientError>;
    async fn current_user(&self) -> Result<User, ClientError>;
    async fn logout(&self) -> Result<(), ClientError>;
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Url(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        Err(ClientError::from_response(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(builder).await?.json::<T>().await?)
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        self.send_json(self.request(Method::GET, "/tasks")).await
    }

    async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError> {
        self.send_json(self.request(Method::POST, "/tasks").json(input))
            .await
    }

    async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<Task, ClientError> {
        self.send_json(
            self.request(Method::PUT, &format!("/tasks/{}", id))
                .json(changes),
        )
        .await
    }

    async fn delete_task(&self, id: i64) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/tasks/{}", id)))
            .await?;
        Ok(())
    }

    async fn toggle_complete(&self, id: i64) -> Result<Task, ClientError> {
        self.send_json(self.request(Method::PATCH, &format!("/tasks/{}/complete", id)))
            .await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    async fn register(&self, input: &RegisterRequest) -> Result<User, ClientError> {
        self.send_json(self.request(Method::POST, "/register").json(input))
            .await
    }

    async fn login(&self, input: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.send_json(self.request(Method::POST, "/login").json(input))
            .await
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        self.send_json(self.request(Method::GET, "/user")).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.send(self.request(Method::POST, "/logout")).await?;
        Ok(())
    }
}
