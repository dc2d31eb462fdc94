//! Crate-wide error taxonomy.
//!
//! Component modules define their own focused error enums; this module
//! provides the umbrella type used at composition boundaries and the
//! crate-wide `Result` alias. Expected business outcomes (a declined
//! payment, a blocked recovery attempt) travel in result structs, not
//! through these types.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::delivery::AvailabilityError;
use crate::orders::{StoreError, TransitionError};
use crate::payments::{GatewayError, ReconcileError};

#[derive(Debug, Error)]
pub enum OrderflowError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),
}

pub type Result<T> = std::result::Result<T, OrderflowError>;
