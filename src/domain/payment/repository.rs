//! Payment repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{CallbackResult, PaymentTransaction, ReconcileOutcome};
use crate::domain::DomainResult;

/// Result of a reconciliation, with the row as stored afterwards.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub payment: PaymentTransaction,
    pub outcome: ReconcileOutcome,
    /// Capture cascaded into a completed session (reservation completed,
    /// spot re-asserted Available)
    pub cascaded: bool,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: PaymentTransaction) -> DomainResult<PaymentTransaction>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PaymentTransaction>>;

    /// Apply a verified callback in one transaction.
    ///
    /// The row is located by `provider_ref` or by `payment_id` and locked
    /// for the rest of the transaction. Status
    /// follows `PaymentStatus::merge`. When the row becomes Captured and its
    /// session is Completed, the linked reservation is completed and the spot
    /// set Available unless it has an open session.
    async fn reconcile(&self, payment_id: Uuid, result: &CallbackResult)
        -> DomainResult<Reconciled>;

    /// Staff capture of a cash payment, with the same cascade as `reconcile`.
    async fn capture(&self, payment_id: Uuid) -> DomainResult<Reconciled>;
}
