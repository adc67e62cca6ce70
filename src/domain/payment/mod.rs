//! Payment aggregate

pub mod model;
pub mod repository;

pub use model::{
    CallbackResult, OrderRef, PaymentMethod, PaymentStatus, PaymentTarget, PaymentTransaction,
    ReconcileOutcome,
};
pub use repository::{PaymentRepository, Reconciled};
