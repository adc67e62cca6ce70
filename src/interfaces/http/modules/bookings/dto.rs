//! Booking DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::booking::{Booking, BookingSession};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct StartBookingRequest {
    /// Scanned QR payload; must name the booked spot when given
    #[validate(length(min = 1, max = 128))]
    pub qr_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EndBookingSessionRequest {
    #[validate(range(min = 0.0))]
    pub energy_kwh: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookingVnPayRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(url)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Pending, Confirmed or Cancelled
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            vehicle_id: b.vehicle_id,
            station_id: b.station_id,
            spot_id: b.spot_id,
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status.to_string(),
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingSessionDto {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub spot_id: Uuid,
    pub price_per_kwh: f64,
    /// Active or Completed
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub energy_kwh: Option<f64>,
    pub cost: Option<f64>,
}

impl From<BookingSession> for BookingSessionDto {
    fn from(s: BookingSession) -> Self {
        Self {
            id: s.id,
            booking_id: s.booking_id,
            spot_id: s.spot_id,
            price_per_kwh: s.price_per_kwh,
            status: s.status.to_string(),
            start_time: s.start_time,
            end_time: s.end_time,
            energy_kwh: s.energy_kwh,
            cost: s.cost,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EndBookingSessionResponse {
    /// False when the session was already closed
    pub ended: bool,
    pub session: BookingSessionDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentUrlDto {
    pub payment_url: String,
}
