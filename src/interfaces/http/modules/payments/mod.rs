//! Payment intents, cash confirmation and provider callbacks

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
