//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::reservation_repository::{lock_reservation, write_reservation};
use super::spot_state::release_spot;
use super::{db_err, parse_column};
use crate::domain::payment::{
    CallbackResult, PaymentRepository, PaymentStatus, PaymentTransaction, Reconciled,
    ReconcileOutcome,
};
use crate::domain::session::SessionStatus;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{charging_session, payment_transaction};

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: payment_transaction::Model) -> DomainResult<PaymentTransaction> {
    Ok(PaymentTransaction {
        id: m.id,
        user_id: m.user_id,
        reservation_id: m.reservation_id,
        session_id: m.session_id,
        amount: m.amount,
        method: parse_column(&m.method)?,
        status: parse_column(&m.status)?,
        provider_ref: m.provider_ref,
        provider_txn_no: m.provider_txn_no,
        response_code: m.response_code,
        bank_code: m.bank_code,
        created_at: m.created_at,
        updated_at: m.updated_at,
        captured_at: m.captured_at,
    })
}

fn domain_to_active(p: &PaymentTransaction) -> payment_transaction::ActiveModel {
    payment_transaction::ActiveModel {
        id: Set(p.id),
        user_id: Set(p.user_id),
        reservation_id: Set(p.reservation_id),
        session_id: Set(p.session_id),
        amount: Set(p.amount),
        method: Set(p.method.as_str().to_string()),
        status: Set(p.status.as_str().to_string()),
        provider_ref: Set(p.provider_ref.clone()),
        provider_txn_no: Set(p.provider_txn_no.clone()),
        response_code: Set(p.response_code.clone()),
        bank_code: Set(p.bank_code.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
        captured_at: Set(p.captured_at),
    }
}

/// Locate the row by provider reference, then by id, under a row lock where
/// the backend supports it.
async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    provider_ref: Option<&str>,
) -> DomainResult<PaymentTransaction> {
    if let Some(provider_ref) = provider_ref {
        let by_ref = payment_transaction::Entity::find()
            .filter(payment_transaction::Column::ProviderRef.eq(provider_ref))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(db_err)?;
        if let Some(model) = by_ref {
            return model_to_domain(model);
        }
    }
    payment_transaction::Entity::find_by_id(payment_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::not_found("PaymentTransaction", payment_id))
        .and_then(model_to_domain)
}

/// Write `payment` only if the stored status is still `expected`.
///
/// A miss means a concurrent callback got there first; the error is
/// transient so the caller retries and sees the settled row.
async fn write_payment<C: ConnectionTrait>(
    conn: &C,
    payment: &PaymentTransaction,
    expected: PaymentStatus,
) -> DomainResult<()> {
    let written = payment_transaction::Entity::update_many()
        .set(domain_to_active(payment))
        .filter(payment_transaction::Column::Id.eq(payment.id))
        .filter(payment_transaction::Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await
        .map_err(db_err)?
        .rows_affected;
    if written == 0 {
        return Err(DomainError::Storage(format!(
            "payment {} changed concurrently",
            payment.id
        )));
    }
    Ok(())
}

/// After a capture: if the paid-for session is Completed, complete its
/// reservation and re-assert the spot as Available. Returns whether it
/// cascaded.
async fn cascade_capture<C: ConnectionTrait>(
    conn: &C,
    payment: &PaymentTransaction,
) -> DomainResult<bool> {
    let completed = SessionStatus::Completed.as_str();
    let session = if let Some(session_id) = payment.session_id {
        charging_session::Entity::find_by_id(session_id)
            .filter(charging_session::Column::Status.eq(completed))
            .one(conn)
            .await
            .map_err(db_err)?
    } else if let Some(reservation_id) = payment.reservation_id {
        charging_session::Entity::find()
            .filter(charging_session::Column::ReservationId.eq(reservation_id))
            .filter(charging_session::Column::Status.eq(completed))
            .one(conn)
            .await
            .map_err(db_err)?
    } else {
        None
    };
    let Some(session) = session else {
        return Ok(false);
    };

    if let Some(reservation_id) = session.reservation_id.or(payment.reservation_id) {
        if let Some(mut r) = lock_reservation(conn, reservation_id).await? {
            let previous = r.status;
            if !previous.is_terminal() {
                r.complete();
                write_reservation(conn, &r, previous).await?;
            }
        }
    }
    release_spot(conn, session.spot_id).await?;
    Ok(true)
}

// ── PaymentRepository impl ──────────────────────────────────────

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn create(&self, payment: PaymentTransaction) -> DomainResult<PaymentTransaction> {
        debug!("Creating payment {} ({}, {})", payment.id, payment.method, payment.amount);

        domain_to_active(&payment).insert(&self.db).await.map_err(db_err)?;
        Ok(payment)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PaymentTransaction>> {
        payment_transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn reconcile(
        &self,
        payment_id: Uuid,
        result: &CallbackResult,
    ) -> DomainResult<Reconciled> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut payment = find_for_update(&txn, payment_id, Some(&result.order_ref)).await?;

        let before = payment.status;
        if before == PaymentStatus::Captured
            || (before.is_terminal() && before.merge(result.status()) == before)
        {
            debug!("Payment {} already {}, callback ignored", payment.id, before);
            return Ok(Reconciled {
                payment,
                outcome: ReconcileOutcome::AlreadyProcessed,
                cascaded: false,
            });
        }

        let newly_captured = payment.apply_outcome(result, Utc::now());
        write_payment(&txn, &payment, before).await?;
        let cascaded = if newly_captured {
            cascade_capture(&txn, &payment).await?
        } else {
            false
        };
        txn.commit().await.map_err(db_err)?;

        info!(
            "Payment {} reconciled: {} -> {} (cascaded: {})",
            payment.id, before, payment.status, cascaded
        );
        Ok(Reconciled {
            payment,
            outcome: ReconcileOutcome::Applied,
            cascaded,
        })
    }

    async fn capture(&self, payment_id: Uuid) -> DomainResult<Reconciled> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut payment = find_for_update(&txn, payment_id, None).await?;

        let before = payment.status;
        if !payment.capture(Utc::now()) {
            return Ok(Reconciled {
                payment,
                outcome: ReconcileOutcome::AlreadyProcessed,
                cascaded: false,
            });
        }
        write_payment(&txn, &payment, before).await?;
        let cascaded = cascade_capture(&txn, &payment).await?;
        txn.commit().await.map_err(db_err)?;

        info!("Payment {} captured (cascaded: {})", payment.id, cascaded);
        Ok(Reconciled {
            payment,
            outcome: ReconcileOutcome::Applied,
            cascaded,
        })
    }
}
