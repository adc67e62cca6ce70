//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use super::booking::BookingRepository;
use super::payment::PaymentRepository;
use super::reservation::ReservationRepository;
use super::session::SessionRepository;
use super::station::StationRepository;
use super::vehicle::VehicleDirectory;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let spot = repos.stations().find_spot(spot_id).await?;
///     let session = repos.sessions().start(request).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn stations(&self) -> &dyn StationRepository;
    fn vehicles(&self) -> &dyn VehicleDirectory;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn sessions(&self) -> &dyn SessionRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn bookings(&self) -> &dyn BookingRepository;
}
