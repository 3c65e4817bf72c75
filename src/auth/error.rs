//! Error types for the authenticated request pipeline.
//!
//! `PipelineError` is what callers of `AuthPipeline::execute` see. Every
//! variant is `Clone` because one renewal outcome is handed to all callers
//! waiting on it.

use thiserror::Error;

/// Connection-level failure reported by the HTTP transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("APIサーバーに接続できません: {0}")]
    Connect(String),

    /// The transport gave up waiting for a response.
    #[error("APIリクエストがタイムアウトしました: {0}")]
    Timeout(String),

    /// The request was sent but the response could not be read.
    #[error("API通信エラー: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Why a credential renewal did not produce a new token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenewalFailure {
    /// The renewal call never got a response.
    #[error("トークン更新の通信に失敗しました: {0}")]
    Transport(#[from] TransportError),

    /// The renewal endpoint refused to issue a token.
    #[error("トークン更新が拒否されました (HTTP {0})")]
    Rejected(u16),

    /// The renewal endpoint answered with an unusable body.
    #[error("トークン更新のレスポンスが不正です: {0}")]
    InvalidBody(String),
}

/// Errors surfaced by `AuthPipeline::execute`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Network or connection failure, never retried.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A non-401 failure response, passed through untouched.
    #[error("サーバーエラー (HTTP {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Renewal failed or the replay was rejected again.
    #[error("セッションの有効期限が切れました")]
    SessionExpired,
}

impl PipelineError {
    /// Returns true if the caller must send the user back to login.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns true if the request never got a response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns the HTTP status of a server error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns a user-facing hint for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Transport(_) => "APIサーバーが起動しているか、--api-url の設定を確認してください",
            Self::Server { status, .. } if *status == 404 => "対象が存在するか確認してください",
            Self::Server { .. } => "入力内容を確認し、しばらくしてから再試行してください",
            Self::SessionExpired => "'pomotask login' で再度ログインしてください",
        }
    }
}
