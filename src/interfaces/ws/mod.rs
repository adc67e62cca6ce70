//! WebSocket interfaces
//!
//! - `notifications`: real-time event streaming to UI clients

pub mod notifications;

pub use notifications::{ws_notifications_handler, EventFilter, NotificationState};
