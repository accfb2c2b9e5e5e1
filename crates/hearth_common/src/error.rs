use serde::{Deserialize, Serialize};

/// A field-level validation message attached to [`ApiError::Validation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Errors surfaced by the request transport.
///
/// This is a closed taxonomy: every failure a caller can observe is one of
/// these variants, so UI code can match exhaustively. Errors are `Clone`
/// because a single in-flight request may be shared by several deduplicated
/// callers, each of which receives the same settled result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the request payload. Carries field-level messages
    /// for form UIs.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// No authenticated session. Upstream code may tear the session down.
    #[error("not authenticated")]
    Unauthorized,

    /// Authenticated, but not allowed to perform this action.
    #[error("forbidden")]
    Forbidden,

    /// The referenced resource does not exist (or is not visible).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The request conflicts with current server state (e.g. "already voted").
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Too many requests; `retry_after_secs` is a server hint, not a promise.
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Opaque server-side failure.
    #[error("server error: {message}")]
    Server { message: String },

    /// The request never reached the server or the reply never arrived.
    #[error("network error: {message}")]
    Network { message: String },

    /// The caller canceled the request before it settled.
    #[error("request aborted")]
    Aborted,
}

/// Discriminant-only view of [`ApiError`], for code that branches on the
/// class of failure without caring about the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimit,
    Server,
    Network,
    Aborted,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::Forbidden => ErrorKind::Forbidden,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Conflict { .. } => ErrorKind::Conflict,
            ApiError::RateLimited { .. } => ErrorKind::RateLimit,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Network { .. } => ErrorKind::Network,
            ApiError::Aborted => ErrorKind::Aborted,
        }
    }

    /// Transient failures are eligible for caller-driven retry. Only network
    /// interruptions and aborts qualify; everything else reflects a decision
    /// the server already made.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Aborted)
    }

    /// Shorthand for a validation error without field details.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        ApiError::Server {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(ApiError::validation("bad title").kind(), ErrorKind::Validation);
        assert_eq!(ApiError::conflict("already voted").kind(), ErrorKind::Conflict);
        assert_eq!(
            ApiError::RateLimited { retry_after_secs: Some(30) }.kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(ApiError::Aborted.kind(), ErrorKind::Aborted);
    }

    #[test]
    fn only_network_and_abort_are_transient() {
        assert!(ApiError::network("connection reset").is_transient());
        assert!(ApiError::Aborted.is_transient());
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(!ApiError::conflict("already voted").is_transient());
        assert!(!ApiError::server("boom").is_transient());
    }

    #[test]
    fn display_includes_message() {
        let err = ApiError::not_found("thread");
        assert_eq!(err.to_string(), "thread not found");
    }
}
