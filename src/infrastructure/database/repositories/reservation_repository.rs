//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::spot_state::{ensure_window_free, lock_spot};
use super::{db_err, parse_column};
use crate::domain::availability::SlotHolder;
use crate::domain::reservation::{Reservation, ReservationRepository, ReservationStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn reservation_from_model(m: reservation::Model) -> DomainResult<Reservation> {
    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        spot_id: m.spot_id,
        station_id: m.station_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: parse_column(&m.status)?,
        confirmation_code: m.confirmation_code,
        notes: m.notes,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn reservation_to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: Set(r.id),
        user_id: Set(r.user_id),
        vehicle_id: Set(r.vehicle_id),
        spot_id: Set(r.spot_id),
        station_id: Set(r.station_id),
        start_time: Set(r.start_time),
        end_time: Set(r.end_time),
        status: Set(r.status.as_str().to_string()),
        confirmation_code: Set(r.confirmation_code.clone()),
        notes: Set(r.notes.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

/// Load a reservation, taking a row lock where the backend supports it.
pub(super) async fn lock_reservation<C: ConnectionTrait>(
    conn: &C,
    reservation_id: Uuid,
) -> DomainResult<Option<Reservation>> {
    reservation::Entity::find_by_id(reservation_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .map(reservation_from_model)
        .transpose()
}

/// Write `r` only if the stored status is still `expected`.
///
/// A miss means another transaction moved the row after it was read; the
/// error is transient so callers can retry on fresh state.
pub(super) async fn write_reservation<C: ConnectionTrait>(
    conn: &C,
    r: &Reservation,
    expected: ReservationStatus,
) -> DomainResult<()> {
    let written = reservation::Entity::update_many()
        .set(reservation_to_active(r))
        .filter(reservation::Column::Id.eq(r.id))
        .filter(reservation::Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await
        .map_err(db_err)?
        .rows_affected;
    if written == 0 {
        return Err(DomainError::Storage(format!(
            "reservation {} changed concurrently",
            r.id
        )));
    }
    Ok(())
}

fn live_statuses() -> [&'static str; 3] {
    [
        ReservationStatus::Pending.as_str(),
        ReservationStatus::Confirmed.as_str(),
        ReservationStatus::CheckedIn.as_str(),
    ]
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn create_if_slot_free(&self, r: Reservation) -> DomainResult<Reservation> {
        debug!("Creating reservation {} on spot {}", r.id, r.spot_id);

        let txn = self.db.begin().await.map_err(db_err)?;
        lock_spot(&txn, r.spot_id).await?;
        ensure_window_free(&txn, r.spot_id, &r.window()).await?;
        reservation_to_active(&r).insert(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(r)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(reservation_from_model)
            .transpose()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<(ReservationStatus, Reservation)>> {
        debug!("Setting reservation {} to {}", id, status);

        let txn = self.db.begin().await.map_err(db_err)?;
        let Some(mut r) = lock_reservation(&txn, id).await? else {
            return Ok(None);
        };
        let previous = r.status;
        r.set_status(status, notes);
        write_reservation(&txn, &r, previous).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(Some((previous, r)))
    }

    async fn cancel_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        reason: Option<&str>,
    ) -> DomainResult<Option<Reservation>> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let Some(mut r) = lock_reservation(&txn, id).await? else {
            return Ok(None);
        };
        if !r.is_owned_by(user_id) || r.status.is_terminal() {
            debug!("Cancel of reservation {} ignored ({})", id, r.status);
            return Ok(None);
        }
        let previous = r.status;
        r.cancel(reason);
        write_reservation(&txn, &r, previous).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(Some(r))
    }

    async fn find_upcoming_for_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .filter(reservation::Column::StartTime.gte(from))
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(reservation_from_model)
            .collect()
    }

    async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .filter(reservation::Column::Status.is_in(live_statuses()))
            .filter(reservation::Column::EndTime.gt(now))
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(reservation_from_model)
            .collect()
    }

    async fn find_live_for_spot(&self, spot_id: Uuid) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(spot_id))
            .filter(reservation::Column::Status.is_in(live_statuses()))
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(reservation_from_model)
            .collect()
    }
}
