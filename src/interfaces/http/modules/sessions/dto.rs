//! Session DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::session::{ChargingSession, ChargingSessionProgress, ProgressReport};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSessionRequest {
    pub spot_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    /// Reservation to check in; must be yours and on the same spot
    pub reservation_id: Option<Uuid>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub initial_soc: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub target_soc: Option<f64>,
    #[validate(range(min = 0.0))]
    pub energy_requested_kwh: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanSessionRequest {
    /// Scanned QR payload (the spot id)
    #[validate(length(min = 1, max = 128))]
    pub qr_code: String,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteSessionRequest {
    #[validate(range(min = 0.0))]
    pub energy_delivered_kwh: f64,
    /// Explicit bill; still raised to the base fee
    #[validate(range(min = 0.0))]
    pub cost: Option<f64>,
    /// Price override for this bill only
    #[validate(range(min = 0.0))]
    pub price_per_kwh: Option<f64>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSessionStatusRequest {
    /// InProgress, Completed, Cancelled or Failed
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProgressRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub soc: f64,
    #[validate(range(min = 0.0))]
    pub power_kw: f64,
    #[validate(range(min = 0.0))]
    pub energy_delivered_kwh: f64,
    #[validate(range(min = 0.0))]
    pub estimated_minutes_remaining: Option<f64>,
}

impl From<ProgressRequest> for ProgressReport {
    fn from(r: ProgressRequest) -> Self {
        Self {
            soc: r.soc,
            power_kw: r.power_kw,
            energy_delivered_kwh: r.energy_delivered_kwh,
            estimated_minutes_remaining: r.estimated_minutes_remaining,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub spot_id: Uuid,
    pub station_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub initial_soc: f64,
    pub target_soc: f64,
    pub energy_requested_kwh: Option<f64>,
    pub energy_delivered_kwh: f64,
    pub price_per_kwh: f64,
    pub cost: Option<f64>,
    pub current_soc: Option<f64>,
    pub current_power_kw: Option<f64>,
    pub estimated_minutes_remaining: Option<f64>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<ChargingSession> for SessionDto {
    fn from(s: ChargingSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            vehicle_id: s.vehicle_id,
            spot_id: s.spot_id,
            station_id: s.station_id,
            reservation_id: s.reservation_id,
            status: s.status.to_string(),
            start_time: s.start_time,
            end_time: s.end_time,
            initial_soc: s.initial_soc,
            target_soc: s.target_soc,
            energy_requested_kwh: s.energy_requested_kwh,
            energy_delivered_kwh: s.energy_delivered_kwh,
            price_per_kwh: s.price_per_kwh,
            cost: s.cost,
            current_soc: s.current_soc,
            current_power_kw: s.current_power_kw,
            estimated_minutes_remaining: s.estimated_minutes_remaining,
            last_updated_at: s.last_updated_at,
            notes: s.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressDto {
    pub soc: f64,
    pub power_kw: f64,
    pub energy_delivered_kwh: f64,
    pub estimated_minutes_remaining: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl From<ChargingSessionProgress> for ProgressDto {
    fn from(p: ChargingSessionProgress) -> Self {
        Self {
            soc: p.soc,
            power_kw: p.power_kw,
            energy_delivered_kwh: p.energy_delivered_kwh,
            estimated_minutes_remaining: p.estimated_minutes_remaining,
            recorded_at: p.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EstimateDto {
    pub session_id: Uuid,
    /// `null` when SOC, target or power is unknown, or power is zero
    pub estimated_minutes_remaining: Option<f64>,
}
