//! # Payment Gateway Boundary
//!
//! The external payment gateway is reached through a backend proxy that
//! returns loosely-typed JSON. This module owns the narrow trait the rest of
//! the crate calls, plus the boundary validation that converts duck-typed
//! response payloads into the closed data model before any internal logic
//! consumes them. Malformed payloads are rejected here rather than letting
//! null ambiguity propagate inward.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::resilience::{classify_message, Classifiable, ErrorKind};

/// Failures of the gateway proxy itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway network error: {0}")]
    Network(String),

    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway authentication failed: {0}")]
    Authentication(String),

    #[error("gateway returned non-2xx status {status}")]
    Http { status: u16 },

    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Free-text failures from the proxy; classified by substring fallback.
    #[error("{0}")]
    Other(String),
}

impl Classifiable for GatewayError {
    fn classification(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout => ErrorKind::Timeout,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Http { status } => match status {
                401 | 403 => ErrorKind::Authentication,
                400 | 404 | 422 => ErrorKind::Validation,
                429 => ErrorKind::RateLimit,
                _ => ErrorKind::Network,
            },
            Self::MalformedResponse(_) => ErrorKind::Validation,
            Self::Other(message) => classify_message(message),
        }
    }
}

/// Narrow interface to the payment gateway proxy.
///
/// Both calls return the proxy's raw JSON payload; callers validate through
/// [`InitializedPayment::from_value`] / [`VerificationOutcome::from_value`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment: returns `{reference, authorizationUrl, ...}`.
    async fn initialize(
        &self,
        email: &str,
        amount_minor: i64,
        metadata: Value,
    ) -> Result<Value, GatewayError>;

    /// Verify a payment by reference: returns `{status, amount, paidAt, ...}`.
    async fn verify(&self, reference: &str) -> Result<Value, GatewayError>;
}

/// Convert a major-unit amount to the gateway's integer minor units.
pub fn to_minor_units(amount_major: f64) -> i64 {
    (amount_major * 100.0).round() as i64
}

/// Settlement status reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    /// Statuses this client does not know; never treated as success.
    Other(String),
}

impl GatewayPaymentStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            "pending" => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Pending => "pending",
            Self::Other(raw) => raw,
        }
    }
}

/// Validated initialize payload.
#[derive(Debug, Clone)]
pub struct InitializedPayment {
    pub reference: String,
    pub authorization_url: String,
}

impl InitializedPayment {
    pub fn from_value(payload: &Value) -> Result<Self, GatewayError> {
        let reference = require_str(payload, "reference")?;
        let authorization_url = require_str(payload, "authorization_url")?;
        Ok(Self {
            reference,
            authorization_url,
        })
    }
}

/// Validated verify payload.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub status: GatewayPaymentStatus,
    /// Minor currency units.
    pub amount_minor: i64,
    pub paid_at: Option<DateTime<Utc>>,
}

impl VerificationOutcome {
    pub fn from_value(payload: &Value) -> Result<Self, GatewayError> {
        let status = GatewayPaymentStatus::parse(&require_str(payload, "status")?);

        let amount_minor = payload
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("missing or non-integer 'amount'".to_string())
            })?;

        let paid_at = match payload.get("paid_at") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| {
                        GatewayError::MalformedResponse(format!("unparseable 'paid_at': {e}"))
                    })?
                    .with_timezone(&Utc),
            ),
            Some(other) => {
                return Err(GatewayError::MalformedResponse(format!(
                    "'paid_at' must be a string, got {other}"
                )))
            }
        };

        Ok(Self {
            status,
            amount_minor,
            paid_at,
        })
    }
}

fn require_str(payload: &Value, field: &str) -> Result<String, GatewayError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            GatewayError::MalformedResponse(format!("missing or empty '{field}' field"))
        })
}
