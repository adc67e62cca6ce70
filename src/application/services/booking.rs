//! Pay-per-use booking flow

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::announce_spot;
use crate::application::payments::{PaymentGateway, RedirectRequest};
use crate::application::ports::Notifier;
use crate::config::BillingConfig;
use crate::domain::booking::{Booking, BookingSession, BookingStatus, ProviderResult};
use crate::domain::station::SpotStatus;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, StateKind};
use crate::shared::utills::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    billing: BillingConfig,
    vnpay: Option<Arc<dyn PaymentGateway>>,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            repos,
            notifier,
            billing,
            vnpay: None,
        }
    }

    pub fn with_vnpay(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.vnpay = Some(gateway);
        self
    }

    pub async fn create(&self, input: CreateBooking) -> DomainResult<Booking> {
        if !self
            .repos
            .vehicles()
            .vehicle_belongs_to_user(input.vehicle_id, input.user_id)
            .await?
        {
            return Err(DomainError::Forbidden(
                "vehicle does not belong to the caller".into(),
            ));
        }
        let booking = Booking::new(
            input.user_id,
            input.vehicle_id,
            input.station_id,
            input.spot_id,
            input.start,
            input.end,
        )?;

        let spot = self
            .repos
            .stations()
            .find_spot(input.spot_id)
            .await?
            .filter(|spot| spot.station_id == input.station_id)
            .ok_or_else(|| DomainError::not_found("ChargingSpot", input.spot_id))?;
        if matches!(spot.status, SpotStatus::Occupied | SpotStatus::Maintenance) {
            return Err(DomainError::InvalidState(StateKind::SpotNotAvailable));
        }

        let booking = self.repos.bookings().create_if_slot_free(booking).await?;
        info!(
            booking_id = %booking.id,
            spot_id = %booking.spot_id,
            start = %booking.start_time,
            end = %booking.end_time,
            "Booking created"
        );
        self.notifier.booking_changed(&booking);
        Ok(booking)
    }

    pub async fn get(&self, booking_id: Uuid) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", booking_id))
    }

    /// Start the booking's session. A scanned QR code, when given, must name
    /// the booked spot.
    pub async fn start_session(
        &self,
        booking_id: Uuid,
        qr: Option<&str>,
    ) -> DomainResult<BookingSession> {
        let booking = self.get(booking_id).await?;
        if let Some(qr) = qr {
            let scanned = Uuid::parse_str(qr.trim())
                .map_err(|_| DomainError::Validation("QR code is not a spot id".into()))?;
            if scanned != booking.spot_id {
                return Err(DomainError::Validation(
                    "QR code does not match the booked spot".into(),
                ));
            }
        }

        let session = match self
            .repos
            .bookings()
            .start_session(booking_id, self.billing.prepay_required)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                if e.is_conflict() {
                    metrics::counter!("session_start_conflicts_total").increment(1);
                }
                warn!(%booking_id, error = %e, "Booking session start rejected");
                return Err(e);
            }
        };

        metrics::counter!("sessions_started_total").increment(1);
        info!(
            %booking_id,
            session_id = %session.id,
            price_per_kwh = session.price_per_kwh,
            "Booking session started"
        );
        if let Ok(booking) = self.get(booking_id).await {
            self.notifier.booking_changed(&booking);
        }
        announce_spot(self.repos.as_ref(), self.notifier.as_ref(), session.spot_id).await;
        Ok(session)
    }

    /// Returns false if the session does not exist or is already closed.
    pub async fn end_session(&self, session_id: Uuid, energy_kwh: f64) -> DomainResult<bool> {
        if energy_kwh.is_nan() || energy_kwh < 0.0 {
            return Err(DomainError::Validation(
                "energy must not be negative".into(),
            ));
        }
        let Some(session) = self.repos.bookings().end_session(session_id, energy_kwh).await? else {
            return Ok(false);
        };
        info!(
            %session_id,
            energy_kwh,
            cost = ?session.cost,
            "Booking session ended"
        );
        announce_spot(self.repos.as_ref(), self.notifier.as_ref(), session.spot_id).await;
        Ok(true)
    }

    pub async fn find_session(&self, session_id: Uuid) -> DomainResult<BookingSession> {
        self.repos
            .bookings()
            .find_session(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("BookingSession", session_id))
    }

    /// Idempotent upsert of a provider outcome. Returns false if the booking
    /// does not exist.
    pub async fn record_provider_result(&self, result: ProviderResult) -> DomainResult<bool> {
        let repos = self.repos.clone();
        let recorded = retry_with_backoff(
            RetryConfig::default(),
            || {
                let repos = repos.clone();
                let result = result.clone();
                async move { repos.bookings().record_provider_result(&result).await }
            },
            |e: &DomainError| e.is_conflict() || e.is_transient(),
            "record_booking_payment",
        )
        .await?;

        match recorded {
            Some(recorded) => {
                info!(
                    booking_id = %result.booking_id,
                    status = %recorded.payment.status,
                    outcome = ?recorded.outcome,
                    "Booking payment recorded"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Signed VNPay URL for paying `amount` towards a booking.
    pub async fn create_vnpay_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        amount: f64,
        client_ip: String,
        return_url: Option<String>,
    ) -> DomainResult<String> {
        let gateway = self
            .vnpay
            .as_ref()
            .ok_or_else(|| DomainError::Configuration("payment provider VnPay is not configured".into()))?;
        if amount.is_nan() || amount <= 0.0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }
        let booking = self.get(booking_id).await?;
        if booking.user_id != user_id {
            return Err(DomainError::Forbidden("booking belongs to another user".into()));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(DomainError::InvalidState(StateKind::BookingCancelled));
        }

        let request = RedirectRequest {
            order_ref: booking.order_ref(),
            amount,
            order_info: format!("Booking {}", booking.order_ref()),
            client_ip,
            return_url,
        };
        gateway.build_redirect_url(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::payments::VnPayGateway;
    use crate::config::VnPayConfig;
    use crate::domain::booking::{BookingPaymentStatus, BookingSessionStatus};
    use crate::domain::payment::PaymentMethod;
    use crate::domain::reservation::Reservation;
    use crate::domain::session::NewSession;
    use crate::domain::ConflictKind;
    use crate::test_support::{at, fixture, Fixture};

    fn service(fx: &Fixture) -> BookingService {
        BookingService::new(fx.repos.clone(), fx.notifier.clone(), fx.billing.clone())
    }

    fn input(fx: &Fixture, spot: usize, start: u32, end: u32) -> CreateBooking {
        CreateBooking {
            user_id: fx.user_id,
            vehicle_id: fx.vehicle.id,
            station_id: fx.station.id,
            spot_id: fx.spots[spot].id,
            start: at(start),
            end: at(end),
        }
    }

    fn paid(booking_id: Uuid, success: bool, txn_ref: Option<&str>) -> ProviderResult {
        ProviderResult {
            booking_id,
            provider: PaymentMethod::VnPay,
            success,
            amount: 50_000.0,
            bank_code: Some("NCB".into()),
            txn_ref: txn_ref.map(str::to_string),
            txn_no: Some("9001".into()),
        }
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected_boundary_is_allowed() {
        let fx = fixture().await;
        let svc = service(&fx);
        svc.create(input(&fx, 0, 10, 12)).await.unwrap();

        let err = svc.create(input(&fx, 0, 11, 13)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::SlotConflict)));
        svc.create(input(&fx, 0, 12, 13)).await.unwrap();
        assert_eq!(fx.notifier.count("booking_changed"), 2);
    }

    #[tokio::test]
    async fn booking_conflicts_with_reservation_on_same_spot() {
        let fx = fixture().await;
        let svc = service(&fx);
        fx.repos
            .reservations()
            .create_if_slot_free(Reservation::new(
                fx.user_id,
                fx.spots[1].id,
                fx.station.id,
                None,
                at(10),
                Some(at(12)),
                2,
                "EVR-",
            )
            .unwrap())
            .await
            .unwrap();
        let err = svc.create(input(&fx, 1, 11, 13)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::SlotConflict)));
    }

    #[tokio::test]
    async fn create_validates_inputs() {
        let fx = fixture().await;
        let svc = service(&fx);

        let mut foreign = input(&fx, 0, 10, 11);
        foreign.vehicle_id = fx.other_vehicle.id;
        assert!(matches!(svc.create(foreign).await, Err(DomainError::Forbidden(_))));

        assert!(matches!(
            svc.create(input(&fx, 0, 11, 10)).await,
            Err(DomainError::Validation(_))
        ));

        let mut wrong_station = input(&fx, 0, 10, 11);
        wrong_station.station_id = Uuid::new_v4();
        assert!(matches!(
            svc.create(wrong_station).await,
            Err(DomainError::NotFound { .. })
        ));

        fx.repos
            .stations()
            .update_spot_status(fx.spots[2].id, SpotStatus::Maintenance)
            .await
            .unwrap();
        assert!(matches!(
            svc.create(input(&fx, 2, 10, 11)).await,
            Err(DomainError::InvalidState(StateKind::SpotNotAvailable))
        ));
    }

    #[tokio::test]
    async fn session_lifecycle_bills_rounded_cost() {
        let fx = fixture().await;
        let svc = service(&fx);
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();

        let qr = fx.spots[0].id.to_string();
        let session = svc.start_session(booking.id, Some(&qr)).await.unwrap();
        assert_eq!(session.status, BookingSessionStatus::Active);
        assert_eq!(svc.get(booking.id).await.unwrap().status, BookingStatus::Confirmed);

        let spot = fx.repos.stations().find_spot(fx.spots[0].id).await.unwrap().unwrap();
        assert_eq!(spot.status, SpotStatus::Occupied);

        assert!(svc.end_session(session.id, 2.5).await.unwrap());
        let ended = svc.find_session(session.id).await.unwrap();
        assert_eq!(ended.cost, Some(8_750.0));
        assert!(!svc.end_session(session.id, 2.5).await.unwrap());

        let spot = fx.repos.stations().find_spot(fx.spots[0].id).await.unwrap().unwrap();
        assert_eq!(spot.status, SpotStatus::Available);
    }

    #[tokio::test]
    async fn booking_session_and_charging_session_exclude_each_other() {
        let fx = fixture().await;
        let svc = service(&fx);
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();
        fx.repos
            .sessions()
            .start(NewSession::new(fx.other_user_id, fx.spots[0].id))
            .await
            .unwrap();

        let err = svc.start_session(booking.id, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::SpotBusy)));
    }

    #[tokio::test]
    async fn wrong_qr_and_cancelled_booking_are_rejected() {
        let fx = fixture().await;
        let svc = service(&fx);
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();

        let other = fx.spots[1].id.to_string();
        assert!(matches!(
            svc.start_session(booking.id, Some(&other)).await,
            Err(DomainError::Validation(_))
        ));

        fx.set_booking_status(booking.id, BookingStatus::Cancelled).await;
        assert!(matches!(
            svc.start_session(booking.id, None).await,
            Err(DomainError::InvalidState(StateKind::BookingCancelled))
        ));
    }

    #[tokio::test]
    async fn prepay_gate_opens_after_successful_payment() {
        let fx = fixture().await;
        let mut billing = fx.billing.clone();
        billing.prepay_required = true;
        let svc = BookingService::new(fx.repos.clone(), fx.notifier.clone(), billing);
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();

        assert!(matches!(
            svc.start_session(booking.id, None).await,
            Err(DomainError::InvalidState(StateKind::PaymentRequired))
        ));

        assert!(svc.record_provider_result(paid(booking.id, false, None)).await.unwrap());
        assert!(matches!(
            svc.start_session(booking.id, None).await,
            Err(DomainError::InvalidState(StateKind::PaymentRequired))
        ));

        assert!(svc.record_provider_result(paid(booking.id, true, None)).await.unwrap());
        svc.start_session(booking.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn provider_results_upsert_by_reference() {
        let fx = fixture().await;
        let svc = service(&fx);
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();
        let txn_ref = booking.order_ref().to_string();

        for _ in 0..3 {
            assert!(svc
                .record_provider_result(paid(booking.id, true, Some(&txn_ref)))
                .await
                .unwrap());
        }
        svc.record_provider_result(paid(booking.id, false, Some(&txn_ref)))
            .await
            .unwrap();

        let payments = fx.repos.bookings().payments_for_booking(booking.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, BookingPaymentStatus::Succeeded);

        assert!(!svc
            .record_provider_result(paid(Uuid::new_v4(), true, None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn vnpay_payment_url_uses_booking_reference() {
        let fx = fixture().await;
        let svc = service(&fx).with_vnpay(Arc::new(VnPayGateway::new(VnPayConfig {
            tmn_code: "EVCS0001".into(),
            hash_secret: "TESTSECRET".into(),
            return_url: "https://evcs.test/return".into(),
            ..Default::default()
        })));
        let booking = svc.create(input(&fx, 0, 10, 11)).await.unwrap();

        let url = svc
            .create_vnpay_payment(booking.id, fx.user_id, 50_000.0, "10.0.0.1".into(), None)
            .await
            .unwrap();
        assert!(url.contains(&format!("vnp_TxnRef={}", booking.order_ref())));
        assert!(url.contains("vnp_Amount=5000000"));

        assert!(matches!(
            svc.create_vnpay_payment(booking.id, fx.other_user_id, 50_000.0, "10.0.0.1".into(), None)
                .await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service(&fx)
                .create_vnpay_payment(booking.id, fx.user_id, 50_000.0, "10.0.0.1".into(), None)
                .await,
            Err(DomainError::Configuration(_))
        ));
    }
}
