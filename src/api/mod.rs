//! Typed client for the task API.
//!
//! Thin JSON layer over [`AuthPipeline`]: every task and category call is
//! authenticated and renewal-aware; login and registration go out
//! anonymously. Login writes the issued token into the credential store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{
    ApiRequest, ApiResponse, AuthPipeline, CredentialStore, HttpTransport, PipelineError,
};
use crate::types::Credential;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// A task as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Planned number of focus sessions
    pub pomodoro_count: u32,
    pub category_id: i64,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pomodoro_count: u32,
    pub category_id: i64,
}

impl NewTask {
    /// A one-session task in the default category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            pomodoro_count: 1,
            category_id: 1,
        }
    }
}

/// Partial update for a task; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pomodoro_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl TaskUpdate {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.pomodoro_count.is_none()
            && self.category_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

/// Payload for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response of the login and register endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<User>,
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

// ============================================================================
// ApiError
// ============================================================================

/// Errors from the typed client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The response body did not match the expected shape.
    #[error("レスポンスの解析に失敗しました: {0}")]
    Decode(String),

    /// The request payload could not be serialized.
    #[error("リクエストの作成に失敗しました: {0}")]
    Encode(String),
}

impl ApiError {
    /// Returns true if the user has to log in again.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Pipeline(e) if e.is_session_expired())
    }
}

// ============================================================================
// TaskClient
// ============================================================================

/// Task, category and auth calls over an [`AuthPipeline`].
pub struct TaskClient<T, S> {
    pipeline: AuthPipeline<T, S>,
}

impl<T: HttpTransport, S: CredentialStore> TaskClient<T, S> {
    pub fn new(pipeline: AuthPipeline<T, S>) -> Self {
        Self { pipeline }
    }

    /// Returns the underlying pipeline.
    pub fn pipeline(&self) -> &AuthPipeline<T, S> {
        &self.pipeline
    }

    /// Logs in and stores the issued credential.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .with_form(&[("username", username), ("password", password)]);
        let response = self.pipeline.execute_anonymous(request).await?;
        let auth: AuthResponse = decode(&response)?;

        self.pipeline
            .store()
            .set(Credential::new(auth.access_token.clone()));
        tracing::info!(username, "logged in");
        Ok(auth)
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let request = json_request(ApiRequest::post("/auth/register"), registration)?;
        let response = self.pipeline.execute_anonymous(request).await?;
        decode(&response)
    }

    /// Forgets the stored credential.
    pub fn logout(&self) {
        self.pipeline.store().clear();
        tracing::info!("logged out");
    }

    /// Returns true if a credential is stored.
    pub fn is_authenticated(&self) -> bool {
        self.pipeline.store().get().is_some()
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response = self.pipeline.execute(ApiRequest::get("/tasks")).await?;
        decode(&response)
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let request = json_request(ApiRequest::post("/tasks"), task)?;
        let response = self.pipeline.execute(request).await?;
        decode(&response)
    }

    pub async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        let request = json_request(ApiRequest::patch(format!("/tasks/{task_id}")), update)?;
        let response = self.pipeline.execute(request).await?;
        decode(&response)
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<(), ApiError> {
        self.pipeline
            .execute(ApiRequest::delete(format!("/tasks/{task_id}")))
            .await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self.pipeline.execute(ApiRequest::get("/categories")).await?;
        decode(&response)
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let request = json_request(
            ApiRequest::post("/categories"),
            &serde_json::json!({ "name": name }),
        )?;
        let response = self.pipeline.execute(request).await?;
        decode(&response)
    }
}

fn json_request<B: Serialize + ?Sized>(request: ApiRequest, body: &B) -> Result<ApiRequest, ApiError> {
    request
        .with_json(body)
        .map_err(|e| ApiError::Encode(e.to_string()))
}

fn decode<D: DeserializeOwned>(response: &ApiResponse) -> Result<D, ApiError> {
    response.json().map_err(|e| ApiError::Decode(e.to_string()))
}
