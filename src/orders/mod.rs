//! # Orders Module
//!
//! Order lifecycle states, the status transition state machine, and the
//! narrow store interfaces the reconciliation and admin flows share.

pub mod states;
pub mod status_machine;
pub mod store;

pub use states::{OrderStatus, PaymentStatus};
pub use status_machine::{
    validate_transition, OrderStatusStateMachine, TransitionCheck, TransitionError,
};
pub use store::{OrderStore, StatusUpdater, StoreError};
