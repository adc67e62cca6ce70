//! Application events (pub/sub)
//!
//! Event types are defined in `domain::events`. The `EventBus`
//! implementation (broadcast channel) and the `Notifier` adapter on top of
//! it live here.

pub mod event_bus;
pub mod notifier;

pub use crate::domain::events::{Event, EventMessage};

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use notifier::EventBusNotifier;
