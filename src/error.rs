//! Error types for the seams between providers, storage and the HTTP surface.

use serde::Serialize;
use thiserror::Error;

/// Failure class recorded in ingestion reports and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Transient,
    Malformed,
    Storage,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Malformed => "malformed",
            ErrorClass::Storage => "storage",
        }
    }
}

/// Error from one external provider call.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{provider}: rate limited")]
    RateLimited { provider: &'static str },

    #[error("{provider}: transient failure: {message}")]
    Transient {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: malformed payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
}

impl SourceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SourceError::RateLimited { .. } | SourceError::Transient { .. } => {
                ErrorClass::Transient
            }
            SourceError::Malformed { .. } => ErrorClass::Malformed,
        }
    }

    pub fn transient(provider: &'static str, message: impl ToString) -> Self {
        SourceError::Transient {
            provider,
            message: message.to_string(),
        }
    }

    pub fn malformed(provider: &'static str, message: impl ToString) -> Self {
        SourceError::Malformed {
            provider,
            message: message.to_string(),
        }
    }

    /// Map a transport error. Timeouts and connection failures are transient.
    pub fn from_reqwest(provider: &'static str, e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::from_status(provider, status);
        }
        if e.is_decode() {
            return Self::malformed(provider, e);
        }
        Self::transient(provider, e)
    }

    /// Map a non-success HTTP status.
    pub fn from_status(provider: &'static str, status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            SourceError::RateLimited { provider }
        } else if status.is_server_error() {
            Self::transient(provider, format!("http {status}"))
        } else {
            Self::malformed(provider, format!("unexpected http {status}"))
        }
    }
}

/// Storage failure. Not recovered locally.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}
