// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types shared by the client services.
//!
//! `BackendError` is the closed set of ways a backend call can fail. It is
//! built once, at the HTTP boundary, and wrapped by `AppError` according to
//! which flow the call belonged to.

/// Status reported for failures that never produced an HTTP response.
pub const TRANSPORT_STATUS: i32 = -1;

/// Failure of a single backend request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network unreachable: {0}")]
    Unreachable(String),

    #[error("No active session")]
    NoSession,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl BackendError {
    pub const TIMEOUT_MESSAGE: &'static str = "Request timed out";
    pub const UNREACHABLE_MESSAGE: &'static str = "Network unreachable";

    /// Status code as seen by callers; `-1` for transport-level failures.
    pub fn status(&self) -> i32 {
        match self {
            BackendError::Timeout | BackendError::Unreachable(_) => TRANSPORT_STATUS,
            BackendError::NoSession => 401,
            BackendError::Http { status, .. } => i32::from(*status),
        }
    }

    /// Normalized message without the status prefix.
    pub fn message(&self) -> String {
        match self {
            BackendError::Timeout => Self::TIMEOUT_MESSAGE.to_string(),
            BackendError::Unreachable(detail) => {
                format!("{}: {}", Self::UNREACHABLE_MESSAGE, detail)
            }
            BackendError::NoSession => "No active session".to_string(),
            BackendError::Http { message, .. } => message.clone(),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.status() == TRANSPORT_STATUS
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Http { status: 409, .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            BackendError::NoSession | BackendError::Http { status: 401, .. }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::Http { status: 429, .. })
    }
}

/// Application error type returned by the client services.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Identity bootstrap failed: {0}")]
    IdentityBootstrap(BackendError),

    #[error("Authentication failed: {0}")]
    Authentication(BackendError),

    #[error("Backend error: {0}")]
    Upstream(BackendError),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Too many attempts, retry in {retry_after_secs}s")]
    Throttled { retry_after_secs: i64 },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The backend failure behind this error, if any.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            AppError::IdentityBootstrap(e) | AppError::Authentication(e) | AppError::Upstream(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// Backend status code, `-1` for transport failures, `None` for local errors.
    pub fn status(&self) -> Option<i32> {
        self.backend().map(BackendError::status)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.backend(), Some(BackendError::Timeout))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.backend().is_some_and(BackendError::is_rate_limited)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;
