//! [`Notifier`] backed by the in-process event bus

use chrono::Utc;

use crate::application::ports::Notifier;
use crate::domain::booking::Booking;
use crate::domain::events::{
    BookingChangedEvent, Event, PaymentUpdatedEvent, ReservationChangedEvent,
    SessionChangedEvent, SpotStatusChangedEvent, StationAvailabilityChangedEvent,
};
use crate::domain::payment::PaymentTransaction;
use crate::domain::reservation::Reservation;
use crate::domain::session::ChargingSession;
use crate::domain::station::ChargingSpot;

use super::event_bus::SharedEventBus;

pub struct EventBusNotifier {
    bus: SharedEventBus,
}

impl EventBusNotifier {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }
}

impl Notifier for EventBusNotifier {
    fn session_changed(&self, session: &ChargingSession) {
        self.bus.publish(Event::SessionChanged(SessionChangedEvent {
            session_id: session.id,
            station_id: session.station_id,
            spot_id: session.spot_id,
            user_id: session.user_id,
            status: session.status.to_string(),
            energy_delivered_kwh: session.energy_delivered_kwh,
            current_soc: session.current_soc,
            cost: session.cost,
            timestamp: Utc::now(),
        }));
    }

    fn reservation_changed(&self, reservation: &Reservation) {
        self.bus.publish(Event::ReservationChanged(ReservationChangedEvent {
            reservation_id: reservation.id,
            station_id: reservation.station_id,
            spot_id: reservation.spot_id,
            user_id: reservation.user_id,
            status: reservation.status.to_string(),
            timestamp: Utc::now(),
        }));
    }

    fn spot_status_changed(&self, spot: &ChargingSpot) {
        self.bus.publish(Event::SpotStatusChanged(SpotStatusChangedEvent {
            spot_id: spot.id,
            station_id: spot.station_id,
            status: spot.status.to_string(),
            timestamp: Utc::now(),
        }));
    }

    fn station_availability_changed(
        &self,
        station_id: uuid::Uuid,
        available_spots: usize,
        total_spots: usize,
    ) {
        self.bus
            .publish(Event::StationAvailabilityChanged(StationAvailabilityChangedEvent {
                station_id,
                available_spots,
                total_spots,
                timestamp: Utc::now(),
            }));
    }

    fn payment_updated(&self, payment: &PaymentTransaction) {
        self.bus.publish(Event::PaymentUpdated(PaymentUpdatedEvent {
            payment_id: payment.id,
            provider: payment.method.to_string(),
            status: payment.status.to_string(),
            amount: payment.amount,
            timestamp: Utc::now(),
        }));
    }

    fn booking_changed(&self, booking: &Booking) {
        self.bus.publish(Event::BookingChanged(BookingChangedEvent {
            booking_id: booking.id,
            station_id: booking.station_id,
            spot_id: booking.spot_id,
            status: booking.status.to_string(),
            timestamp: Utc::now(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;
    use uuid::Uuid;

    #[tokio::test]
    async fn notifier_publishes_to_subscribers() {
        let bus = create_event_bus();
        let mut sub = bus.subscribe();
        let notifier = EventBusNotifier::new(bus.clone());

        let spot = ChargingSpot::new(Uuid::new_v4(), "B-02", 4000.0);
        notifier.spot_status_changed(&spot);

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "spot_status_changed");
        assert_eq!(msg.event.station_id(), Some(spot.station_id));
    }

    #[test]
    fn publishing_without_subscribers_does_not_fail() {
        let notifier = EventBusNotifier::new(create_event_bus());
        notifier.station_availability_changed(Uuid::new_v4(), 1, 4);
    }
}
