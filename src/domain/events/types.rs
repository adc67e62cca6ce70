//! Notification events
//!
//! Defines all event types that can be broadcast to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event types for notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SessionChanged(SessionChangedEvent),
    ReservationChanged(ReservationChangedEvent),
    SpotStatusChanged(SpotStatusChangedEvent),
    StationAvailabilityChanged(StationAvailabilityChangedEvent),
    PaymentUpdated(PaymentUpdatedEvent),
    BookingChanged(BookingChangedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::SessionChanged(_) => "session_changed",
            Event::ReservationChanged(_) => "reservation_changed",
            Event::SpotStatusChanged(_) => "spot_status_changed",
            Event::StationAvailabilityChanged(_) => "station_availability_changed",
            Event::PaymentUpdated(_) => "payment_updated",
            Event::BookingChanged(_) => "booking_changed",
        }
    }

    pub fn station_id(&self) -> Option<Uuid> {
        match self {
            Event::SessionChanged(e) => Some(e.station_id),
            Event::ReservationChanged(e) => Some(e.station_id),
            Event::SpotStatusChanged(e) => Some(e.station_id),
            Event::StationAvailabilityChanged(e) => Some(e.station_id),
            Event::PaymentUpdated(_) => None,
            Event::BookingChanged(e) => Some(e.station_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChangedEvent {
    pub session_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub energy_delivered_kwh: f64,
    pub current_soc: Option<f64>,
    pub cost: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationChangedEvent {
    pub reservation_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotStatusChangedEvent {
    pub spot_id: Uuid,
    pub station_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationAvailabilityChangedEvent {
    pub station_id: Uuid,
    pub available_spots: usize,
    pub total_spots: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdatedEvent {
    /// Payment transaction id, or booking id for booking payments
    pub payment_id: Uuid,
    pub provider: String,
    pub status: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingChangedEvent {
    pub booking_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let station_id = Uuid::new_v4();
        let msg = EventMessage::new(Event::SpotStatusChanged(SpotStatusChangedEvent {
            spot_id: Uuid::new_v4(),
            station_id,
            status: "Occupied".into(),
            timestamp: Utc::now(),
        }));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "SpotStatusChanged");
        assert_eq!(json["data"]["status"], "Occupied");
        assert_eq!(msg.event.station_id(), Some(station_id));
        assert_eq!(msg.event.event_type(), "spot_status_changed");
    }
}
