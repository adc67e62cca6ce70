//! Outer adapters: REST API and realtime notifications

pub mod http;
pub mod ws;

pub use http::{create_api_router, AppServices, RouterDeps};
