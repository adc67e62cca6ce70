//! In-process broadcast of domain events
//!
//! Services publish after their transaction commits; WebSocket clients
//! subscribe either to everything or to a single station.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::{Event, EventMessage};

/// Messages a slow subscriber may fall behind before it starts skipping.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Stamp and broadcast `event`. Returns how many subscribers got it;
    /// zero subscribers is not an error.
    pub fn publish(&self, event: Event) -> usize {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        let station_id = message.event.station_id();

        metrics::counter!("events_published_total", "event_type" => event_type).increment(1);
        let delivered = self.sender.send(message).unwrap_or(0);
        debug!(event_type, ?station_id, delivered, "Event published");
        delivered
    }

    /// Every event on the bus.
    pub fn subscribe(&self) -> EventSubscriber {
        self.subscriber(None)
    }

    /// Only events carrying `station_id`.
    pub fn subscribe_station(&self, station_id: Uuid) -> EventSubscriber {
        self.subscriber(Some(station_id))
    }

    fn subscriber(&self, station_id: Option<Uuid>) -> EventSubscriber {
        let subscriber = EventSubscriber {
            receiver: self.sender.subscribe(),
            station_id,
        };
        debug!(?station_id, total = self.receiver_count(), "Event subscriber added");
        subscriber
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    station_id: Option<Uuid>,
}

impl EventSubscriber {
    /// Next matching event, or `None` once the bus is gone. Lagging skips
    /// the missed messages and keeps going.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if self.accepts(&msg) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    metrics::counter!("event_subscriber_lagged_total").increment(missed);
                    warn!(missed, station_id = ?self.station_id, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, msg: &EventMessage) -> bool {
        match self.station_id {
            Some(id) => msg.event.station_id() == Some(id),
            None => true,
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::StationAvailabilityChangedEvent;
    use chrono::Utc;

    fn availability(station_id: Uuid) -> Event {
        Event::StationAvailabilityChanged(StationAvailabilityChangedEvent {
            station_id,
            available_spots: 2,
            total_spots: 3,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn station_subscriber_skips_other_stations() {
        let bus = EventBus::new();
        let mut all = bus.subscribe();
        let ours = Uuid::new_v4();
        let mut scoped = bus.subscribe_station(ours);

        assert_eq!(bus.publish(availability(Uuid::new_v4())), 2);
        bus.publish(availability(ours));

        assert_ne!(all.recv().await.unwrap().event.station_id(), Some(ours));
        assert_eq!(scoped.recv().await.unwrap().event.station_id(), Some(ours));
    }

    #[tokio::test]
    async fn lagging_subscriber_resumes_with_newest() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        let last = Uuid::new_v4();
        for _ in 0..4 {
            bus.publish(availability(Uuid::new_v4()));
        }
        bus.publish(availability(last));

        let mut seen = Vec::new();
        while let Ok(Some(msg)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await
        {
            seen.push(msg.event.station_id());
        }
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.last().copied().flatten(), Some(last));
    }

    #[test]
    fn publish_without_subscribers_reaches_nobody() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(availability(Uuid::new_v4())), 0);
        let sub = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(sub);
        assert_eq!(bus.receiver_count(), 0);
    }
}
