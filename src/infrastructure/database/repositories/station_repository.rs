//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::{db_err, parse_column};
use crate::domain::booking::BookingSessionStatus;
use crate::domain::session::SessionStatus;
use crate::domain::station::{ChargingSpot, SpotStatus, Station, StationRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{
    booking_session, charging_session, charging_spot, station,
};

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn station_from_model(m: station::Model) -> DomainResult<Station> {
    Ok(Station {
        id: m.id,
        name: m.name,
        address: m.address,
        status: parse_column(&m.status)?,
        created_at: m.created_at,
    })
}

pub(super) fn spot_from_model(m: charging_spot::Model) -> DomainResult<ChargingSpot> {
    Ok(ChargingSpot {
        id: m.id,
        station_id: m.station_id,
        label: m.label,
        connector_type: m.connector_type,
        power_kw: m.power_kw,
        status: parse_column(&m.status)?,
        price_per_kwh: m.price_per_kwh,
        updated_at: m.updated_at,
    })
}

// ── StationRepository impl ──────────────────────────────────────

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn find_station(&self, id: Uuid) -> DomainResult<Option<Station>> {
        station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(station_from_model)
            .transpose()
    }

    async fn find_spot(&self, id: Uuid) -> DomainResult<Option<ChargingSpot>> {
        charging_spot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(spot_from_model)
            .transpose()
    }

    async fn list_spots_by_station(&self, station_id: Uuid) -> DomainResult<Vec<ChargingSpot>> {
        charging_spot::Entity::find()
            .filter(charging_spot::Column::StationId.eq(station_id))
            .order_by_asc(charging_spot::Column::Label)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(spot_from_model)
            .collect()
    }

    async fn save_station(&self, s: Station) -> DomainResult<()> {
        debug!("Saving station: {}", s.id);

        let model = station::ActiveModel {
            id: Set(s.id),
            name: Set(s.name),
            address: Set(s.address),
            status: Set(s.status.as_str().to_string()),
            created_at: Set(s.created_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn save_spot(&self, s: ChargingSpot) -> DomainResult<()> {
        debug!("Saving spot: {} ({})", s.id, s.label);

        let model = charging_spot::ActiveModel {
            id: Set(s.id),
            station_id: Set(s.station_id),
            label: Set(s.label),
            connector_type: Set(s.connector_type),
            power_kw: Set(s.power_kw),
            status: Set(s.status.as_str().to_string()),
            price_per_kwh: Set(s.price_per_kwh),
            updated_at: Set(s.updated_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_spot_price(&self, spot_id: Uuid, price_per_kwh: f64) -> DomainResult<()> {
        debug!("Updating price of spot {} to {}", spot_id, price_per_kwh);

        let existing = charging_spot::Entity::find_by_id(spot_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("ChargingSpot", spot_id))?;

        let mut active: charging_spot::ActiveModel = existing.into();
        active.price_per_kwh = Set(price_per_kwh);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_spot_status(&self, spot_id: Uuid, status: SpotStatus) -> DomainResult<()> {
        debug!("Updating status of spot {} to {}", spot_id, status);

        let existing = charging_spot::Entity::find_by_id(spot_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("ChargingSpot", spot_id))?;

        let mut active: charging_spot::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn busy_spot_ids(&self, station_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let mut busy: Vec<Uuid> = charging_session::Entity::find()
            .select_only()
            .column(charging_session::Column::SpotId)
            .filter(charging_session::Column::StationId.eq(station_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::InProgress.as_str()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let spot_ids: Vec<Uuid> = charging_spot::Entity::find()
            .select_only()
            .column(charging_spot::Column::Id)
            .filter(charging_spot::Column::StationId.eq(station_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        if !spot_ids.is_empty() {
            let booked: Vec<Uuid> = booking_session::Entity::find()
                .select_only()
                .column(booking_session::Column::SpotId)
                .filter(booking_session::Column::SpotId.is_in(spot_ids))
                .filter(booking_session::Column::Status.eq(BookingSessionStatus::Active.as_str()))
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(db_err)?;
            busy.extend(booked);
        }

        busy.sort();
        busy.dedup();
        Ok(busy)
    }
}
