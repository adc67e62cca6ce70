//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::spot_state::{
    ensure_window_free, lock_spot, open_session_count, release_spot, set_spot_status,
};
use super::{db_err, parse_column};
use crate::domain::availability::SlotHolder;
use crate::domain::booking::{
    Booking, BookingPayment, BookingPaymentStatus, BookingRepository, BookingSession,
    BookingStatus, ProviderResult, RecordedPayment,
};
use crate::domain::payment::ReconcileOutcome;
use crate::domain::station::SpotStatus;
use crate::domain::{ConflictKind, DomainError, DomainResult, StateKind};
use crate::infrastructure::database::entities::{booking, booking_payment, booking_session};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn booking_from_model(m: booking::Model) -> DomainResult<Booking> {
    Ok(Booking {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        station_id: m.station_id,
        spot_id: m.spot_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: parse_column(&m.status)?,
        created_at: m.created_at,
    })
}

fn session_from_model(m: booking_session::Model) -> DomainResult<BookingSession> {
    Ok(BookingSession {
        id: m.id,
        booking_id: m.booking_id,
        spot_id: m.spot_id,
        price_per_kwh: m.price_per_kwh,
        status: parse_column(&m.status)?,
        start_time: m.start_time,
        end_time: m.end_time,
        energy_kwh: m.energy_kwh,
        cost: m.cost,
    })
}

fn session_to_active(s: &BookingSession) -> booking_session::ActiveModel {
    booking_session::ActiveModel {
        id: Set(s.id),
        booking_id: Set(s.booking_id),
        spot_id: Set(s.spot_id),
        price_per_kwh: Set(s.price_per_kwh),
        status: Set(s.status.as_str().to_string()),
        start_time: Set(s.start_time),
        end_time: Set(s.end_time),
        energy_kwh: Set(s.energy_kwh),
        cost: Set(s.cost),
    }
}

fn payment_from_model(m: booking_payment::Model) -> DomainResult<BookingPayment> {
    Ok(BookingPayment {
        id: m.id,
        booking_id: m.booking_id,
        provider: parse_column(&m.provider)?,
        amount: m.amount,
        status: parse_column(&m.status)?,
        bank_code: m.bank_code,
        txn_ref: m.txn_ref,
        txn_no: m.txn_no,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn payment_to_active(p: &BookingPayment) -> booking_payment::ActiveModel {
    booking_payment::ActiveModel {
        id: Set(p.id),
        booking_id: Set(p.booking_id),
        provider: Set(p.provider.as_str().to_string()),
        amount: Set(p.amount),
        status: Set(p.status.as_str().to_string()),
        bank_code: Set(p.bank_code.clone()),
        txn_ref: Set(p.txn_ref.clone()),
        txn_no: Set(p.txn_no.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn create_if_slot_free(&self, b: Booking) -> DomainResult<Booking> {
        debug!("Creating booking {} on spot {}", b.id, b.spot_id);

        let txn = self.db.begin().await.map_err(db_err)?;
        lock_spot(&txn, b.spot_id).await?;
        ensure_window_free(&txn, b.spot_id, &b.window()).await?;

        booking::ActiveModel {
            id: Set(b.id),
            user_id: Set(b.user_id),
            vehicle_id: Set(b.vehicle_id),
            station_id: Set(b.station_id),
            spot_id: Set(b.spot_id),
            start_time: Set(b.start_time),
            end_time: Set(b.end_time),
            status: Set(b.status.as_str().to_string()),
            created_at: Set(b.created_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(b)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(booking_from_model)
            .transpose()
    }

    async fn find_live_for_spot(&self, spot_id: Uuid) -> DomainResult<Vec<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::SpotId.eq(spot_id))
            .filter(booking::Column::Status.ne(BookingStatus::Cancelled.as_str()))
            .order_by_asc(booking::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(booking_from_model)
            .collect()
    }

    async fn start_session(
        &self,
        booking_id: Uuid,
        prepay_required: bool,
    ) -> DomainResult<BookingSession> {
        debug!("Starting session for booking {}", booking_id);

        let txn = self.db.begin().await.map_err(db_err)?;

        let model = booking::Entity::find_by_id(booking_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Booking", booking_id))?;
        let booking = booking_from_model(model.clone())?;
        if booking.status == BookingStatus::Cancelled {
            return Err(DomainError::InvalidState(StateKind::BookingCancelled));
        }

        if prepay_required {
            let paid = booking_payment::Entity::find()
                .filter(booking_payment::Column::BookingId.eq(booking_id))
                .filter(
                    booking_payment::Column::Status.eq(BookingPaymentStatus::Succeeded.as_str()),
                )
                .count(&txn)
                .await
                .map_err(db_err)?;
            if paid == 0 {
                return Err(DomainError::InvalidState(StateKind::PaymentRequired));
            }
        }

        let spot = lock_spot(&txn, booking.spot_id).await?;
        if open_session_count(&txn, spot.id).await? > 0 {
            return Err(DomainError::Conflict(ConflictKind::SpotBusy));
        }
        if parse_column::<SpotStatus>(&spot.status)? != SpotStatus::Available {
            return Err(DomainError::InvalidState(StateKind::SpotNotAvailable));
        }

        let session = BookingSession::start(&booking, spot.price_per_kwh, Utc::now());
        session_to_active(&session).insert(&txn).await.map_err(db_err)?;
        set_spot_status(&txn, spot, SpotStatus::Occupied).await?;

        let mut active: booking::ActiveModel = model.into();
        active.status = Set(BookingStatus::Confirmed.as_str().to_string());
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(session)
    }

    async fn end_session(
        &self,
        session_id: Uuid,
        energy_kwh: f64,
    ) -> DomainResult<Option<BookingSession>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(model) = booking_session::Entity::find_by_id(session_id)
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let mut session = session_from_model(model)?;
        if !session.end(energy_kwh, Utc::now()) {
            return Ok(None);
        }
        session_to_active(&session).update(&txn).await.map_err(db_err)?;
        release_spot(&txn, session.spot_id).await?;

        txn.commit().await.map_err(db_err)?;
        debug!("Booking session {} ended, cost {:?}", session.id, session.cost);
        Ok(Some(session))
    }

    async fn find_session(&self, id: Uuid) -> DomainResult<Option<BookingSession>> {
        booking_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(session_from_model)
            .transpose()
    }

    async fn record_provider_result(
        &self,
        result: &ProviderResult,
    ) -> DomainResult<Option<RecordedPayment>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let exists = booking::Entity::find_by_id(result.booking_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let mut existing = None;
        if let Some(txn_ref) = &result.txn_ref {
            existing = booking_payment::Entity::find()
                .filter(booking_payment::Column::TxnRef.eq(txn_ref.as_str()))
                .one(&txn)
                .await
                .map_err(db_err)?;
        }
        if existing.is_none() {
            existing = booking_payment::Entity::find()
                .filter(booking_payment::Column::BookingId.eq(result.booking_id))
                .order_by_desc(booking_payment::Column::CreatedAt)
                .one(&txn)
                .await
                .map_err(db_err)?;
        }

        let now = Utc::now();
        let recorded = match existing {
            Some(model) => {
                let mut payment = payment_from_model(model)?;
                if payment.apply(result, now) {
                    payment_to_active(&payment).update(&txn).await.map_err(db_err)?;
                    RecordedPayment {
                        payment,
                        outcome: ReconcileOutcome::Applied,
                    }
                } else {
                    RecordedPayment {
                        payment,
                        outcome: ReconcileOutcome::AlreadyProcessed,
                    }
                }
            }
            None => {
                let payment = BookingPayment::from_result(result, now);
                payment_to_active(&payment).insert(&txn).await.map_err(db_err)?;
                RecordedPayment {
                    payment,
                    outcome: ReconcileOutcome::Applied,
                }
            }
        };

        txn.commit().await.map_err(db_err)?;
        info!(
            "Booking {} payment {} is {}",
            result.booking_id, recorded.payment.id, recorded.payment.status
        );
        Ok(Some(recorded))
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<BookingPayment>> {
        booking_payment::Entity::find()
            .filter(booking_payment::Column::BookingId.eq(booking_id))
            .order_by_asc(booking_payment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(payment_from_model)
            .collect()
    }
}
