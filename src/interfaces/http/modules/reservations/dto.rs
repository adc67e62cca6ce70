//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::reservation::Reservation;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    pub spot_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    /// Defaults to start + the configured hold length
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReservationStatusRequest {
    /// Pending, Confirmed, CheckedIn, Completed or Cancelled
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelReservationRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelReservationResponse {
    /// False when the reservation is unknown, not yours, or already closed
    pub cancelled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub spot_id: Uuid,
    pub station_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub confirmation_code: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            spot_id: r.spot_id,
            station_id: r.station_id,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status.to_string(),
            confirmation_code: r.confirmation_code,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
