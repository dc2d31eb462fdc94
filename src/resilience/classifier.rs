//! # Failure Classification
//!
//! Determines whether a remote failure is worth retrying. Typed error
//! variants classify directly; free-text messages fall through to substring
//! matching because the upstream proxy does not provide structured error
//! codes. The substring table is a best-effort heuristic, deliberately
//! contained in this one module so it can be swapped out once a typed error
//! contract exists.

use serde::{Deserialize, Serialize};

/// Primary failure categories used to drive retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection-level failure; may succeed on retry
    Network,
    /// Operation exceeded its per-attempt deadline
    Timeout,
    /// Credentials rejected; retrying cannot help
    Authentication,
    /// Malformed request or payload; retrying cannot help
    Validation,
    /// Another actor modified the same record; caller retries once, not here
    Conflict,
    /// Upstream asked us to slow down
    RateLimit,
    /// Unclassifiable; retried conservatively
    Unknown,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Timeout | Self::RateLimit | Self::Unknown => true,
            Self::Authentication | Self::Validation | Self::Conflict => false,
        }
    }
}

/// Errors that can report their own failure category.
///
/// Implementations should map typed variants directly and only fall back to
/// [`classify_message`] for free-text carriers.
pub trait Classifiable {
    fn classification(&self) -> ErrorKind;
}

/// Substring-based fallback classification for unstructured error text.
///
/// Match order matters: the more specific non-retryable signals are checked
/// before the generic network bucket.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("authentication")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("invalid key")
    {
        ErrorKind::Authentication
    } else if lower.contains("validation")
        || lower.contains("invalid reference")
        || lower.contains("malformed")
        || lower.contains("bad request")
    {
        ErrorKind::Validation
    } else if lower.contains("conflict") || lower.contains("already modified") {
        ErrorKind::Conflict
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        ErrorKind::RateLimit
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ErrorKind::Timeout
    } else if lower.contains("network")
        || lower.contains("connection")
        || lower.contains("non-2xx")
        || lower.contains("unreachable")
    {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_retryable_kinds() {
        assert!(!ErrorKind::Authentication.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Conflict.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(
            classify_message("Authentication failed for key"),
            ErrorKind::Authentication
        );
        assert_eq!(
            classify_message("request returned non-2xx status"),
            ErrorKind::Network
        );
        assert_eq!(
            classify_message("validation error: amount missing"),
            ErrorKind::Validation
        );
        assert_eq!(classify_message("gateway timed out"), ErrorKind::Timeout);
        assert_eq!(classify_message("row conflict detected"), ErrorKind::Conflict);
        assert_eq!(classify_message("something odd happened"), ErrorKind::Unknown);
    }

    #[test]
    fn test_specific_signals_win_over_network_bucket() {
        // "unauthorized connection" carries both signals; auth must win.
        assert_eq!(
            classify_message("unauthorized connection attempt"),
            ErrorKind::Authentication
        );
    }
}
