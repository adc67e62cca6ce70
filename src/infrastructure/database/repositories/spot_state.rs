//! Spot checks and writes shared by the transactional repositories
//!
//! Every function takes the caller's connection so it runs inside the
//! caller's transaction.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::booking_repository::booking_from_model;
use super::reservation_repository::reservation_from_model;
use super::{db_err, parse_column};
use crate::domain::availability::{is_free_at, is_slot_available, TimeWindow};
use crate::domain::booking::{Booking, BookingSessionStatus, BookingStatus};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::session::SessionStatus;
use crate::domain::station::SpotStatus;
use crate::domain::{ConflictKind, DomainError, DomainResult};
use crate::infrastructure::database::entities::{
    booking, booking_session, charging_session, charging_spot, reservation,
};

/// Load a spot, taking a row lock where the backend supports it.
pub(super) async fn lock_spot<C: ConnectionTrait>(
    conn: &C,
    spot_id: Uuid,
) -> DomainResult<charging_spot::Model> {
    charging_spot::Entity::find_by_id(spot_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::not_found("ChargingSpot", spot_id))
}

/// Open sessions on the spot across both flows.
pub(super) async fn open_session_count<C: ConnectionTrait>(
    conn: &C,
    spot_id: Uuid,
) -> DomainResult<u64> {
    let charging = charging_session::Entity::find()
        .filter(charging_session::Column::SpotId.eq(spot_id))
        .filter(charging_session::Column::Status.eq(SessionStatus::InProgress.as_str()))
        .count(conn)
        .await
        .map_err(db_err)?;
    let booking = booking_session::Entity::find()
        .filter(booking_session::Column::SpotId.eq(spot_id))
        .filter(booking_session::Column::Status.eq(BookingSessionStatus::Active.as_str()))
        .count(conn)
        .await
        .map_err(db_err)?;
    Ok(charging + booking)
}

pub(super) async fn set_spot_status<C: ConnectionTrait>(
    conn: &C,
    spot: charging_spot::Model,
    status: SpotStatus,
) -> DomainResult<()> {
    let mut active: charging_spot::ActiveModel = spot.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(db_err)?;
    Ok(())
}

/// Put the spot back to Available unless another session still holds it.
///
/// Returns whether the spot was written.
pub(super) async fn release_spot<C: ConnectionTrait>(conn: &C, spot_id: Uuid) -> DomainResult<bool> {
    if open_session_count(conn, spot_id).await? > 0 {
        return Ok(false);
    }
    let spot = lock_spot(conn, spot_id).await?;
    if parse_column::<SpotStatus>(&spot.status)? == SpotStatus::Available {
        return Ok(false);
    }
    set_spot_status(conn, spot, SpotStatus::Available).await?;
    Ok(true)
}

/// Reservations and bookings on the spot that still hold their window.
async fn live_holds<C: ConnectionTrait>(
    conn: &C,
    spot_id: Uuid,
) -> DomainResult<(Vec<Reservation>, Vec<Booking>)> {
    let reservations = reservation::Entity::find()
        .filter(reservation::Column::SpotId.eq(spot_id))
        .filter(reservation::Column::Status.is_not_in([
            ReservationStatus::Completed.as_str(),
            ReservationStatus::Cancelled.as_str(),
        ]))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(reservation_from_model)
        .collect::<DomainResult<Vec<_>>>()?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::SpotId.eq(spot_id))
        .filter(booking::Column::Status.ne(BookingStatus::Cancelled.as_str()))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(booking_from_model)
        .collect::<DomainResult<Vec<_>>>()?;

    Ok((reservations, bookings))
}

/// Fail with `SlotConflict` if a live reservation or booking on the spot
/// overlaps `window`.
pub(super) async fn ensure_window_free<C: ConnectionTrait>(
    conn: &C,
    spot_id: Uuid,
    window: &TimeWindow,
) -> DomainResult<()> {
    let (reservations, bookings) = live_holds(conn, spot_id).await?;
    if is_slot_available(&reservations, window) && is_slot_available(&bookings, window) {
        Ok(())
    } else {
        Err(DomainError::Conflict(ConflictKind::SlotConflict))
    }
}

/// Fail with `SlotConflict` if a live reservation or booking on the spot
/// covers `now`. `own_reservation` is the one being checked in, if any.
pub(super) async fn ensure_free_at<C: ConnectionTrait>(
    conn: &C,
    spot_id: Uuid,
    now: DateTime<Utc>,
    own_reservation: Option<Uuid>,
) -> DomainResult<()> {
    let (mut reservations, bookings) = live_holds(conn, spot_id).await?;
    reservations.retain(|r| Some(r.id) != own_reservation);
    if is_free_at(&reservations, now) && is_free_at(&bookings, now) {
        Ok(())
    } else {
        Err(DomainError::Conflict(ConflictKind::SlotConflict))
    }
}
