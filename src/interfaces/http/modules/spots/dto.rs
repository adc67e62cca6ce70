//! Spot DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::services::SpotAvailability;

#[derive(Debug, Serialize, ToSchema)]
pub struct SpotDto {
    pub id: Uuid,
    pub station_id: Uuid,
    pub label: String,
    pub connector_type: Option<String>,
    pub power_kw: Option<f64>,
    /// Available, Occupied, Maintenance or Offline
    pub status: String,
    pub price_per_kwh: f64,
    /// A session could start on this spot right now
    pub can_start_now: bool,
}

impl From<SpotAvailability> for SpotDto {
    fn from(a: SpotAvailability) -> Self {
        Self {
            id: a.spot.id,
            station_id: a.spot.station_id,
            label: a.spot.label,
            connector_type: a.spot.connector_type,
            power_kw: a.spot.power_kw,
            status: a.spot.status.to_string(),
            price_per_kwh: a.spot.price_per_kwh,
            can_start_now: a.can_start_now,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Window start (RFC 3339)
    pub start: DateTime<Utc>,
    /// Window end (RFC 3339), exclusive
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityDto {
    pub spot_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// No live reservation or booking overlaps the window
    pub available: bool,
    pub can_start_now: bool,
}
