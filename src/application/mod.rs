pub mod events;
pub mod payments;
pub mod ports;
pub mod services;

// Re-export key types for convenience
pub use events::{create_event_bus, Event, EventBus, EventBusNotifier, EventSubscriber, SharedEventBus};
pub use payments::{MomoGateway, PaymentGateway, VnPayGateway};
pub use ports::{NoopNotifier, Notifier};
pub use services::{
    AvailabilityService, BookingService, PaymentService, ProgressService, ReservationService,
    SessionService,
};
