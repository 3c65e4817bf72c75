//! Authenticated request pipeline.
//!
//! Every call goes through [`AuthPipeline::execute`]:
//!
//! ```text
//!  request ──▶ attach bearer ──▶ transport ──▶ non-401 ──▶ caller
//!                                    │
//!                                   401
//!                                    ▼
//!                     capture PendingRequest
//!                                    │
//!              token changed since send? ──yes──┐
//!                                    │ no       │
//!                                    ▼          │
//!                join or create shared renewal  │
//!                  │ ok              │ failed   │
//!                  ▼                 ▼          │
//!            replay once ◀───────────┼──────────┘
//!                  │           clear store, SessionExpired
//!           401 ──▶ SessionExpired
//! ```
//!
//! A renewal is a [`Shared`] future stored in a slot. The first caller to
//! need one creates it; concurrent callers clone and await the same future.
//! The future writes the store and empties the slot itself, so it resolves
//! for the remaining waiters even if the caller that created it goes away.
//! Its outcome is kept, so a 401 that arrives after the renewal finished,
//! for a request sent before it finished, reuses that outcome instead of
//! renewing again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::error::{PipelineError, RenewalFailure};
use crate::auth::store::CredentialStore;
use crate::auth::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::config::DEFAULT_REFRESH_PATH;
use crate::types::Credential;

/// Capacity of the session signal channel.
const SIGNAL_CAPACITY: usize = 16;

type RenewalFuture = Shared<BoxFuture<'static, Result<Credential, RenewalFailure>>>;

/// Signals the pipeline emits for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The credential was renewed.
    Renewed,
    /// The session is over; the store has been cleared.
    Expired,
}

/// Body returned by the renewal endpoint.
#[derive(Debug, Deserialize)]
struct RenewalResponse {
    access_token: String,
}

/// A request that got a 401 and may be replayed once.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// The caller's request, without credential header
    pub request: ApiRequest,
    /// Token the failed attempt carried
    pub sent_with: Option<Credential>,
    /// Renewals finished before the failed attempt was sent
    pub epoch: u64,
}

struct InFlightRenewal {
    id: u64,
    future: RenewalFuture,
}

/// Outcome of the most recently finished renewal.
struct FinishedRenewal {
    /// Value of `RenewalState::finished` once this renewal completed
    seq: u64,
    outcome: Result<Credential, RenewalFailure>,
}

#[derive(Default)]
struct RenewalState {
    next_id: u64,
    finished: u64,
    in_flight: Option<InFlightRenewal>,
    last: Option<FinishedRenewal>,
}

// ============================================================================
// AuthPipeline
// ============================================================================

/// Wraps a transport with credential attachment and one-shot renewal.
pub struct AuthPipeline<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    refresh_path: Arc<str>,
    renewal: Arc<Mutex<RenewalState>>,
    signals: broadcast::Sender<SessionSignal>,
}

impl<T, S> Clone for AuthPipeline<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            refresh_path: Arc::clone(&self.refresh_path),
            renewal: Arc::clone(&self.renewal),
            signals: self.signals.clone(),
        }
    }
}

impl<T: HttpTransport, S: CredentialStore> AuthPipeline<T, S> {
    /// Creates a pipeline renewing against the default refresh path.
    pub fn new(transport: Arc<T>, store: Arc<S>) -> Self {
        Self::with_refresh_path(transport, store, DEFAULT_REFRESH_PATH)
    }

    /// Creates a pipeline renewing against `refresh_path`.
    pub fn with_refresh_path(transport: Arc<T>, store: Arc<S>, refresh_path: &str) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            transport,
            store,
            refresh_path: Arc::from(refresh_path),
            renewal: Arc::new(Mutex::new(RenewalState::default())),
            signals,
        }
    }

    /// Subscribes to renewal/expiry signals.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    /// Returns the credential store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Sends `request` without credential handling (login, register).
    pub async fn execute_anonymous(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let response = self.transport.send(&request).await?;
        classify(response)
    }

    /// Sends `request` with the current credential attached.
    ///
    /// A 401 triggers at most one renewal and one replay.
    ///
    /// # Errors
    ///
    /// - `Transport` if any round-trip fails to complete
    /// - `Server` for non-401 error statuses
    /// - `SessionExpired` if renewal fails or the replay is rejected again
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let span = tracing::debug_span!(
            "execute",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        let (epoch, sent_with) = {
            let state = lock(&self.renewal);
            (state.finished, self.store.get())
        };
        let response = self.dispatch(&request, sent_with.as_ref()).await?;
        if !response.is_unauthorized() {
            return classify(response);
        }

        let pending = PendingRequest {
            request,
            sent_with,
            epoch,
        };
        let credential = self.credential_for_replay(&pending).await?;

        tracing::debug!("replaying request with renewed credential");
        let replayed = self.dispatch(&pending.request, Some(&credential)).await?;
        if replayed.is_unauthorized() {
            tracing::warn!("replay rejected after renewal, ending session");
            self.expire();
            return Err(PipelineError::SessionExpired);
        }
        classify(replayed)
    }

    /// Picks the token for the one replay.
    ///
    /// If the store changed since the request went out, another caller
    /// already renewed and that token is used as-is. A renewal that finished
    /// after the request went out is reused, whatever its outcome.
    async fn credential_for_replay(
        &self,
        pending: &PendingRequest,
    ) -> Result<Credential, PipelineError> {
        if let Some(current) = self.store.get() {
            if pending.sent_with.as_ref() != Some(&current) {
                tracing::debug!("credential already renewed by another call");
                return Ok(current);
            }
        }

        self.renewal(pending)
            .await
            .map_err(|_| PipelineError::SessionExpired)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<ApiResponse, PipelineError> {
        let response = match credential {
            Some(credential) => self.transport.send(&request.with_bearer(credential)).await?,
            None => self.transport.send(request).await?,
        };
        tracing::debug!(status = response.status, "response received");
        Ok(response)
    }

    /// Joins the in-flight renewal, reuses a finished one that still
    /// applies to `pending`, or starts a new one.
    ///
    /// A finished renewal applies if it completed after `pending` was sent,
    /// or if it failed and `pending` carried no credential (the session
    /// ended and nobody has logged in since).
    fn renewal(&self, pending: &PendingRequest) -> RenewalFuture {
        let mut state = lock(&self.renewal);
        if let Some(in_flight) = state.in_flight.as_ref() {
            tracing::debug!(renewal = in_flight.id, "joining in-flight renewal");
            return in_flight.future.clone();
        }
        let reusable = state.last.as_ref().filter(|last| {
            last.seq > pending.epoch || (pending.sent_with.is_none() && last.outcome.is_err())
        });
        if let Some(last) = reusable {
            tracing::debug!(ok = last.outcome.is_ok(), "reusing finished renewal");
            return future::ready(last.outcome.clone()).boxed().shared();
        }

        let id = state.next_id;
        state.next_id += 1;
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let refresh_path = Arc::clone(&self.refresh_path);
        let renewal = Arc::clone(&self.renewal);
        let signals = self.signals.clone();

        let future = async move {
            tracing::info!(renewal = id, "renewing credential");
            let result = request_renewal(transport.as_ref(), &refresh_path).await;

            let mut state = lock(&renewal);
            match &result {
                Ok(credential) => {
                    store.set(credential.clone());
                    let _ = signals.send(SessionSignal::Renewed);
                    tracing::info!(renewal = id, "credential renewed");
                }
                Err(e) => {
                    store.clear();
                    let _ = signals.send(SessionSignal::Expired);
                    tracing::warn!(renewal = id, "credential renewal failed: {}", e);
                }
            }

            state.finished += 1;
            let seq = state.finished;
            state.last = Some(FinishedRenewal {
                seq,
                outcome: result.clone(),
            });
            if state.in_flight.as_ref().is_some_and(|in_flight| in_flight.id == id) {
                state.in_flight = None;
            }
            result
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlightRenewal {
            id,
            future: future.clone(),
        });
        future
    }

    fn expire(&self) {
        self.store.clear();
        let _ = self.signals.send(SessionSignal::Expired);
    }
}

fn lock(state: &Mutex<RenewalState>) -> MutexGuard<'_, RenewalState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn request_renewal<T: HttpTransport>(
    transport: &T,
    refresh_path: &str,
) -> Result<Credential, RenewalFailure> {
    let response = transport.send(&ApiRequest::post(refresh_path)).await?;
    if !response.is_success() {
        return Err(RenewalFailure::Rejected(response.status));
    }
    let body: RenewalResponse = response
        .json()
        .map_err(|e| RenewalFailure::InvalidBody(e.to_string()))?;
    if body.access_token.is_empty() {
        return Err(RenewalFailure::InvalidBody("empty access_token".to_string()));
    }
    Ok(Credential::new(body.access_token))
}

/// Statuses below 400 pass through; 4xx/5xx become `Server` errors.
fn classify(response: ApiResponse) -> Result<ApiResponse, PipelineError> {
    if response.status < 400 {
        Ok(response)
    } else {
        Err(PipelineError::Server {
            status: response.status,
            body: response.body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
