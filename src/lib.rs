//! # EV charging reservation and session service
//!
//! Station spot availability, reservations, charging sessions with live
//! progress, and payment reconciliation against VNPay and MoMo callbacks.
//!
//! ## Architecture
//!
//! - **domain**: entities, availability rules and repository traits
//! - **application**: services, payment gateways and the event bus
//! - **infrastructure**: SeaORM entities, migrations and repositories; JWT
//! - **interfaces**: REST API (axum + Swagger) and the notification WebSocket
//! - **server**: process lifecycle shared by both binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

#[cfg(test)]
mod test_support;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use interfaces::create_api_router;

pub use application::events::{create_event_bus, Event, EventBus, SharedEventBus};
