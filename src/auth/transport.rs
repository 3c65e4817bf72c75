//! HTTP transport for the request pipeline.
//!
//! Requests and responses are plain data so the pipeline can capture a
//! failed request and replay it verbatim. The transport executes one
//! round-trip and owns timeouts; it never retries.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::error::TransportError;
use crate::config::ApiConfig;
use crate::types::Credential;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

// ============================================================================
// HttpMethod
// ============================================================================

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// ApiRequest / ApiResponse
// ============================================================================

/// An API call described as data: method, path, headers and body.
///
/// `path` is relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets a JSON body and content type.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        let mut request = self.with_header("Content-Type", "application/json");
        request.body = Some(json);
        Ok(request)
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut request = self.with_header("Content-Type", "application/x-www-form-urlencoded");
        request.body = Some(encoded);
        request
    }

    /// Returns a copy carrying the credential as a bearer header.
    pub fn with_bearer(&self, credential: &Credential) -> Self {
        self.clone().with_header(AUTHORIZATION, credential.bearer())
    }

    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the bearer token attached to this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
    }
}

/// A response described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Executes a single HTTP round-trip.
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends the request exactly as given.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

// ============================================================================
// ReqwestTransport
// ============================================================================

/// Transport backed by a shared [`reqwest::Client`].
///
/// The cookie store keeps the refresh session cookie set at login so the
/// renewal endpoint can authenticate without the expired bearer token.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Builds a transport for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TransportError::Other(format!("HTTPクライアントを作成できません: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.into(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// In-process API double for pipeline tests.
///
/// Protected calls succeed only when they carry the token the mock currently
/// accepts. Calls to the renewal path issue the configured next token (or
/// fail with the configured status) and count each attempt.
#[derive(Debug)]
pub struct MockTransport {
    refresh_path: String,
    accepted_token: Mutex<Option<String>>,
    next_token: Mutex<Result<String, u16>>,
    queued: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    renewal_delay: Mutex<Option<Duration>>,
    path_delays: Mutex<Vec<(String, Duration)>>,
    renewal_count: AtomicUsize,
    reject_all: AtomicBool,
}

impl MockTransport {
    /// Creates a mock accepting `accepted_token` and renewing to `next_token`.
    #[must_use]
    pub fn new(accepted_token: Option<&str>, next_token: &str) -> Self {
        Self {
            refresh_path: crate::config::DEFAULT_REFRESH_PATH.to_string(),
            accepted_token: Mutex::new(accepted_token.map(str::to_string)),
            next_token: Mutex::new(Ok(next_token.to_string())),
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            renewal_delay: Mutex::new(None),
            path_delays: Mutex::new(Vec::new()),
            renewal_count: AtomicUsize::new(0),
            reject_all: AtomicBool::new(false),
        }
    }

    /// Makes renewal fail with the given status.
    pub fn fail_renewal(&self, status: u16) {
        *lock(&self.next_token) = Err(status);
    }

    /// Holds each renewal open for `delay` before answering.
    pub fn set_renewal_delay(&self, delay: Duration) {
        *lock(&self.renewal_delay) = Some(delay);
    }

    /// Holds every protected call to `path` for `delay` before answering.
    pub fn set_path_delay(&self, path: &str, delay: Duration) {
        lock(&self.path_delays).push((path.to_string(), delay));
    }

    /// Rejects every protected call with 401, even with a fresh token.
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Queues a canned outcome for the next protected call.
    pub fn push_outcome(&self, outcome: Result<ApiResponse, TransportError>) {
        lock(&self.queued).push_back(outcome);
    }

    /// Number of renewal calls received.
    #[must_use]
    pub fn renewal_count(&self) -> usize {
        self.renewal_count.load(Ordering::SeqCst)
    }

    /// Every request received, in order, as sent.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Requests received for anything but the renewal path.
    #[must_use]
    pub fn protected_requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.path != self.refresh_path)
            .cloned()
            .collect()
    }

    async fn renew(&self) -> Result<ApiResponse, TransportError> {
        self.renewal_count.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.renewal_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.next_token).clone();
        match next {
            Ok(token) => {
                *lock(&self.accepted_token) = Some(token.clone());
                let body = serde_json::json!({ "access_token": token, "token_type": "bearer" });
                Ok(ApiResponse::new(200, body.to_string()))
            }
            Err(status) => Ok(ApiResponse::new(status, "{\"detail\":\"refresh rejected\"}")),
        }
    }
}

impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        lock(&self.requests).push(request.clone());

        if request.path == self.refresh_path {
            return self.renew().await;
        }

        let delay = lock(&self.path_delays)
            .iter()
            .find(|(path, _)| *path == request.path)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = lock(&self.queued).pop_front();
        if let Some(outcome) = queued {
            return outcome;
        }

        let authorized = !self.reject_all.load(Ordering::SeqCst)
            && request.bearer_token().is_some()
            && lock(&self.accepted_token).as_deref() == request.bearer_token();

        if authorized {
            Ok(ApiResponse::new(200, "{\"ok\":true}"))
        } else {
            Ok(ApiResponse::new(401, "{\"detail\":\"Not authenticated\"}"))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
