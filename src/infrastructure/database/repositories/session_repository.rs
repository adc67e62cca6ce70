//! SeaORM implementation of SessionRepository
//!
//! Start, close, status overwrite and progress writes each run in a single
//! transaction that locks the session row and also rewrites the spot status
//! and, where linked, the reservation.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::reservation_repository::{lock_reservation, write_reservation};
use super::spot_state::{
    ensure_free_at, lock_spot, open_session_count, release_spot, set_spot_status,
};
use super::station_repository::spot_from_model;
use super::{db_err, parse_column};
use crate::domain::session::{
    ChargingSession, ChargingSessionProgress, NewSession, SessionRepository, SessionStatus,
};
use crate::domain::station::{SpotStatus, StationStatus};
use crate::domain::{ConflictKind, DomainError, DomainResult, StateKind};
use crate::infrastructure::database::entities::{
    charging_session, charging_session_progress, station,
};

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn session_from_model(m: charging_session::Model) -> DomainResult<ChargingSession> {
    Ok(ChargingSession {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        spot_id: m.spot_id,
        station_id: m.station_id,
        reservation_id: m.reservation_id,
        status: parse_column(&m.status)?,
        start_time: m.start_time,
        end_time: m.end_time,
        initial_soc: m.initial_soc,
        target_soc: m.target_soc,
        energy_requested_kwh: m.energy_requested_kwh,
        energy_delivered_kwh: m.energy_delivered_kwh,
        price_per_kwh: m.price_per_kwh,
        cost: m.cost,
        current_soc: m.current_soc,
        current_power_kw: m.current_power_kw,
        estimated_minutes_remaining: m.estimated_minutes_remaining,
        last_updated_at: m.last_updated_at,
        notes: m.notes,
        created_at: m.created_at,
    })
}

fn session_to_active(s: &ChargingSession) -> charging_session::ActiveModel {
    charging_session::ActiveModel {
        id: Set(s.id),
        user_id: Set(s.user_id),
        vehicle_id: Set(s.vehicle_id),
        spot_id: Set(s.spot_id),
        station_id: Set(s.station_id),
        reservation_id: Set(s.reservation_id),
        status: Set(s.status.as_str().to_string()),
        start_time: Set(s.start_time),
        end_time: Set(s.end_time),
        initial_soc: Set(s.initial_soc),
        target_soc: Set(s.target_soc),
        energy_requested_kwh: Set(s.energy_requested_kwh),
        energy_delivered_kwh: Set(s.energy_delivered_kwh),
        price_per_kwh: Set(s.price_per_kwh),
        cost: Set(s.cost),
        current_soc: Set(s.current_soc),
        current_power_kw: Set(s.current_power_kw),
        estimated_minutes_remaining: Set(s.estimated_minutes_remaining),
        last_updated_at: Set(s.last_updated_at),
        notes: Set(s.notes.clone()),
        created_at: Set(s.created_at),
    }
}

fn progress_from_model(m: charging_session_progress::Model) -> ChargingSessionProgress {
    ChargingSessionProgress {
        id: Some(m.id),
        session_id: m.session_id,
        soc: m.soc,
        power_kw: m.power_kw,
        energy_delivered_kwh: m.energy_delivered_kwh,
        estimated_minutes_remaining: m.estimated_minutes_remaining,
        recorded_at: m.recorded_at,
    }
}

/// Load the stored row under a row lock where the backend supports it.
async fn lock_session<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> DomainResult<Option<charging_session::Model>> {
    charging_session::Entity::find_by_id(session_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)
}

/// Load the stored row and fail unless it is still InProgress.
async fn load_open<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> DomainResult<charging_session::Model> {
    let stored = lock_session(conn, session_id)
        .await?
        .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))?;
    if parse_column::<SessionStatus>(&stored.status)? != SessionStatus::InProgress {
        return Err(DomainError::InvalidState(StateKind::SessionNotInProgress));
    }
    Ok(stored)
}

/// Write `s` only if the stored status is still `expected`.
async fn write_session<C: ConnectionTrait>(
    conn: &C,
    s: &ChargingSession,
    expected: SessionStatus,
) -> DomainResult<()> {
    let written = charging_session::Entity::update_many()
        .set(session_to_active(s))
        .filter(charging_session::Column::Id.eq(s.id))
        .filter(charging_session::Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await
        .map_err(db_err)?
        .rows_affected;
    if written == 0 {
        return Err(DomainError::InvalidState(StateKind::SessionNotInProgress));
    }
    Ok(())
}

/// Move a Pending/Confirmed reservation to CheckedIn.
async fn check_in_reservation<C: ConnectionTrait>(
    conn: &C,
    reservation_id: Uuid,
) -> DomainResult<()> {
    let Some(mut r) = lock_reservation(conn, reservation_id).await? else {
        return Ok(());
    };
    let previous = r.status;
    if previous.can_check_in() {
        r.check_in();
        write_reservation(conn, &r, previous).await?;
    }
    Ok(())
}

// ── SessionRepository impl ──────────────────────────────────────

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn start(&self, request: NewSession) -> DomainResult<ChargingSession> {
        debug!("Starting session on spot {} for {}", request.spot_id, request.user_id);

        let txn = self.db.begin().await.map_err(db_err)?;

        let spot = lock_spot(&txn, request.spot_id).await?;
        let station = station::Entity::find_by_id(spot.station_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Station", spot.station_id))?;
        if parse_column::<StationStatus>(&station.status)? != StationStatus::Active {
            return Err(DomainError::InvalidState(StateKind::StationUnavailable));
        }
        if open_session_count(&txn, spot.id).await? > 0 {
            return Err(DomainError::Conflict(ConflictKind::SpotBusy));
        }
        if parse_column::<SpotStatus>(&spot.status)? != SpotStatus::Available {
            return Err(DomainError::InvalidState(StateKind::SpotNotAvailable));
        }
        let now = Utc::now();
        ensure_free_at(&txn, spot.id, now, request.reservation_id).await?;

        let session = ChargingSession::start(&request, &spot_from_model(spot.clone())?, now);
        session_to_active(&session).insert(&txn).await.map_err(db_err)?;
        set_spot_status(&txn, spot, SpotStatus::Occupied).await?;
        if let Some(reservation_id) = session.reservation_id {
            check_in_reservation(&txn, reservation_id).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargingSession>> {
        charging_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(session_from_model)
            .transpose()
    }

    async fn close(&self, session: &ChargingSession) -> DomainResult<()> {
        debug!("Closing session {} as {}", session.id, session.status);

        let txn = self.db.begin().await.map_err(db_err)?;
        load_open(&txn, session.id).await?;
        write_session(&txn, session, SessionStatus::InProgress).await?;
        if let Some(reservation_id) = session.reservation_id {
            check_in_reservation(&txn, reservation_id).await?;
        }
        release_spot(&txn, session.spot_id).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn overwrite_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<(ChargingSession, bool)>> {
        debug!("Overwriting session {} with {}", session_id, status);

        let txn = self.db.begin().await.map_err(db_err)?;
        let Some(stored) = lock_session(&txn, session_id).await? else {
            return Ok(None);
        };
        let mut session = session_from_model(stored)?;
        let previous = session.status;
        let closed = session.overwrite_status(status, notes, Utc::now());
        write_session(&txn, &session, previous).await?;
        if closed {
            if let Some(reservation_id) = session.reservation_id {
                check_in_reservation(&txn, reservation_id).await?;
            }
            release_spot(&txn, session.spot_id).await?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(Some((session, closed)))
    }

    async fn record_progress(
        &self,
        session: &ChargingSession,
        record: ChargingSessionProgress,
    ) -> DomainResult<ChargingSessionProgress> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut live = session_from_model(load_open(&txn, session.id).await?)?;

        let last = charging_session_progress::Entity::find()
            .filter(charging_session_progress::Column::SessionId.eq(session.id))
            .order_by_desc(charging_session_progress::Column::RecordedAt)
            .one(&txn)
            .await
            .map_err(db_err)?
            .map(|m| m.recorded_at);
        let record = record.not_before(last);

        live.current_soc = session.current_soc;
        live.current_power_kw = session.current_power_kw;
        live.energy_delivered_kwh = session.energy_delivered_kwh;
        live.estimated_minutes_remaining = session.estimated_minutes_remaining;
        live.last_updated_at = Some(record.recorded_at);
        write_session(&txn, &live, SessionStatus::InProgress).await?;

        let row = charging_session_progress::ActiveModel {
            id: NotSet,
            session_id: Set(record.session_id),
            soc: Set(record.soc),
            power_kw: Set(record.power_kw),
            energy_delivered_kwh: Set(record.energy_delivered_kwh),
            estimated_minutes_remaining: Set(record.estimated_minutes_remaining),
            recorded_at: Set(record.recorded_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(progress_from_model(row))
    }

    async fn progress_history(
        &self,
        session_id: Uuid,
    ) -> DomainResult<Vec<ChargingSessionProgress>> {
        let models = charging_session_progress::Entity::find()
            .filter(charging_session_progress::Column::SessionId.eq(session_id))
            .order_by_asc(charging_session_progress::Column::RecordedAt)
            .order_by_asc(charging_session_progress::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(progress_from_model).collect())
    }

    async fn count_open_on_spot(&self, spot_id: Uuid) -> DomainResult<u64> {
        open_session_count(&self.db, spot_id).await
    }
}
