//! Event stream for UI clients
//!
//! `GET /api/v1/notifications/ws?station_id=..&event_types=a,b` upgrades to
//! a WebSocket that receives every matching `EventMessage` as JSON.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::select;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::events::{EventMessage, SharedEventBus};

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only events about this station
    pub station_id: Option<Uuid>,
    /// Comma-separated event types, e.g. `session_changed,spot_status_changed`
    pub event_types: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, message: &EventMessage) -> bool {
        if let Some(station_id) = self.station_id {
            if message.event.station_id() != Some(station_id) {
                return false;
            }
        }

        match &self.event_types {
            Some(types) => types
                .split(',')
                .map(str::trim)
                .any(|t| t == message.event.event_type()),
            None => true,
        }
    }
}

#[derive(Clone)]
pub struct NotificationState {
    pub event_bus: SharedEventBus,
}

pub async fn ws_notifications_handler(
    ws: WebSocketUpgrade,
    State(state): State<NotificationState>,
    Query(filter): Query<EventFilter>,
) -> impl IntoResponse {
    info!(
        station_id = ?filter.station_id,
        event_types = ?filter.event_types,
        "Notification client connecting"
    );
    ws.on_upgrade(move |socket| stream_events(socket, state, filter))
}

async fn stream_events(socket: WebSocket, state: NotificationState, filter: EventFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscriber = match filter.station_id {
        Some(station_id) => state.event_bus.subscribe_station(station_id),
        None => state.event_bus.subscribe(),
    };

    let welcome = serde_json::json!({
        "type": "connected",
        "filter": {
            "station_id": filter.station_id,
            "event_types": filter.event_types,
        }
    });
    if let Err(e) = sender.send(Message::Text(welcome.to_string().into())).await {
        error!(error = %e, "Failed to send welcome message");
        return;
    }

    loop {
        select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            warn!(error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "Notification socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            event = subscriber.recv() => {
                let Some(message) = event else {
                    warn!("Event bus closed");
                    break;
                };
                if !filter.matches(&message) {
                    continue;
                }
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if let Err(e) = sender.send(Message::Text(json.into())).await {
                            debug!(error = %e, "Notification client went away");
                            break;
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to serialize event"),
                }
            }
        }
    }

    info!("Notification client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{Event, PaymentUpdatedEvent, SpotStatusChangedEvent};
    use chrono::Utc;

    fn spot_event(station_id: Uuid) -> EventMessage {
        EventMessage::new(Event::SpotStatusChanged(SpotStatusChangedEvent {
            spot_id: Uuid::new_v4(),
            station_id,
            status: "Occupied".into(),
            timestamp: Utc::now(),
        }))
    }

    #[test]
    fn empty_filter_passes_everything() {
        assert!(EventFilter::default().matches(&spot_event(Uuid::new_v4())));
    }

    #[test]
    fn station_filter_drops_other_stations_and_stationless_events() {
        let station = Uuid::new_v4();
        let filter = EventFilter {
            station_id: Some(station),
            event_types: None,
        };
        assert!(filter.matches(&spot_event(station)));
        assert!(!filter.matches(&spot_event(Uuid::new_v4())));

        let payment = EventMessage::new(Event::PaymentUpdated(PaymentUpdatedEvent {
            payment_id: Uuid::new_v4(),
            provider: "VnPay".into(),
            status: "Captured".into(),
            amount: 1.0,
            timestamp: Utc::now(),
        }));
        assert!(!filter.matches(&payment));
    }

    #[test]
    fn type_filter_accepts_listed_types() {
        let filter = EventFilter {
            station_id: None,
            event_types: Some("session_changed, spot_status_changed".into()),
        };
        assert!(filter.matches(&spot_event(Uuid::new_v4())));

        let only_sessions = EventFilter {
            station_id: None,
            event_types: Some("session_changed".into()),
        };
        assert!(!only_sessions.matches(&spot_event(Uuid::new_v4())));
    }
}
