//! Application services

mod availability;
mod booking;
mod payment;
mod progress;
mod reservation;
mod session;

pub use availability::{AvailabilityService, SpotAvailability};
pub use booking::{BookingService, CreateBooking};
pub use payment::{CallbackOutcome, CreatePaymentIntent, PaymentIntent, PaymentService};
pub use progress::ProgressService;
pub use reservation::{CreateReservation, ReservationService};
pub use session::{CompleteSession, SessionService};

use tracing::warn;
use uuid::Uuid;

use crate::application::ports::Notifier;
use crate::domain::station::SpotStatus;
use crate::domain::RepositoryProvider;

/// Push the current state of a spot and its station's availability count.
///
/// Runs after a commit; lookup failures are logged and dropped.
pub(crate) async fn announce_spot(
    repos: &dyn RepositoryProvider,
    notifier: &dyn Notifier,
    spot_id: Uuid,
) {
    let spot = match repos.stations().find_spot(spot_id).await {
        Ok(Some(spot)) => spot,
        Ok(None) => return,
        Err(e) => {
            warn!(%spot_id, error = %e, "Spot notification skipped");
            return;
        }
    };
    notifier.spot_status_changed(&spot);

    match repos.stations().list_spots_by_station(spot.station_id).await {
        Ok(spots) => {
            let available = spots
                .iter()
                .filter(|s| s.status == SpotStatus::Available)
                .count();
            notifier.station_availability_changed(spot.station_id, available, spots.len());
        }
        Err(e) => {
            warn!(station_id = %spot.station_id, error = %e, "Availability notification skipped")
        }
    }
}
