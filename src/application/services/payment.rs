//! Payment intents and provider callback reconciliation

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::announce_spot;
use crate::application::payments::{PaymentGateway, RedirectRequest};
use crate::application::ports::Notifier;
use crate::domain::booking::ProviderResult;
use crate::domain::payment::{
    CallbackResult, OrderRef, PaymentMethod, PaymentTarget, PaymentTransaction, ReconcileOutcome,
    Reconciled,
};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::utills::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    pub user_id: Uuid,
    pub target: PaymentTarget,
    pub amount: f64,
    pub method: PaymentMethod,
    pub client_ip: String,
    pub return_url: Option<String>,
}

/// Stored intent plus the provider URL for online methods.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub payment: PaymentTransaction,
    pub redirect_url: Option<String>,
}

/// Outcome of a verified callback.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub order_ref: OrderRef,
    pub outcome: ReconcileOutcome,
    /// Provider reported success with a valid signature
    pub success: bool,
}

pub struct PaymentService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
    retry: RetryConfig,
}

impl PaymentService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repos,
            notifier,
            gateways: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.method(), gateway);
        self
    }

    fn gateway(&self, method: PaymentMethod) -> DomainResult<&Arc<dyn PaymentGateway>> {
        self.gateways.get(&method).ok_or_else(|| {
            DomainError::Configuration(format!("payment provider {} is not configured", method))
        })
    }

    /// Record a Pending payment and, for online methods, sign a redirect URL.
    ///
    /// The URL is built before the row is written so that a misconfigured
    /// provider leaves nothing behind.
    pub async fn create_intent(&self, input: CreatePaymentIntent) -> DomainResult<PaymentIntent> {
        if input.amount.is_nan() || input.amount <= 0.0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }
        self.ensure_target(input.user_id, input.target).await?;

        let payment =
            PaymentTransaction::new(input.user_id, input.target, input.amount, input.method);
        let redirect_url = if input.method.is_online() {
            let request = RedirectRequest {
                order_ref: payment.order_ref(),
                amount: payment.amount,
                order_info: format!("Payment {}", payment.order_ref()),
                client_ip: input.client_ip,
                return_url: input.return_url,
            };
            Some(self.gateway(input.method)?.build_redirect_url(&request).await?)
        } else {
            None
        };

        let payment = self.repos.payments().create(payment).await?;
        info!(
            payment_id = %payment.id,
            method = %payment.method,
            amount = payment.amount,
            "Payment intent created"
        );
        self.notifier.payment_updated(&payment);
        Ok(PaymentIntent {
            payment,
            redirect_url,
        })
    }

    async fn ensure_target(&self, user_id: Uuid, target: PaymentTarget) -> DomainResult<()> {
        let owner = match target {
            PaymentTarget::Reservation(id) => self
                .repos
                .reservations()
                .find_by_id(id)
                .await?
                .ok_or_else(|| DomainError::not_found("Reservation", id))?
                .user_id,
            PaymentTarget::Session(id) => self
                .repos
                .sessions()
                .find_by_id(id)
                .await?
                .ok_or_else(|| DomainError::not_found("ChargingSession", id))?
                .user_id,
        };
        if owner != user_id {
            return Err(DomainError::Forbidden(
                "payment target belongs to another user".into(),
            ));
        }
        Ok(())
    }

    pub async fn get(&self, payment_id: Uuid) -> DomainResult<PaymentTransaction> {
        self.repos
            .payments()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("PaymentTransaction", payment_id))
    }

    /// Staff confirmation that a cash payment was received.
    pub async fn confirm_cash(&self, payment_id: Uuid) -> DomainResult<Reconciled> {
        let payment = self.get(payment_id).await?;
        if payment.method != PaymentMethod::Cash {
            return Err(DomainError::Validation(format!(
                "payment {} is not a cash payment",
                payment_id
            )));
        }
        let reconciled = self.repos.payments().capture(payment_id).await?;
        info!(%payment_id, outcome = ?reconciled.outcome, "Cash payment confirmed");
        self.after_reconcile(&reconciled).await;
        Ok(reconciled)
    }

    /// Verify and reconcile a provider callback.
    ///
    /// Safe to call repeatedly with the same parameters. Signature failures
    /// return `Signature`; unknown orders return `NotFound`.
    pub async fn handle_callback(
        &self,
        provider: PaymentMethod,
        params: &HashMap<String, String>,
    ) -> DomainResult<CallbackOutcome> {
        let result = match self.gateway(provider)?.validate_callback(params) {
            Ok(result) => result,
            Err(e) => {
                record_callback(provider, "malformed");
                return Err(e);
            }
        };

        if !result.signature_valid {
            record_callback(provider, "invalid_signature");
            warn!(
                provider = %provider,
                order_ref = %result.order_ref,
                "Rejected callback with invalid signature"
            );
            return Err(DomainError::Signature(format!(
                "{} callback signature mismatch",
                provider
            )));
        }

        let order_ref = match result.parsed_order_ref() {
            Ok(order_ref) => order_ref,
            Err(e) => {
                record_callback(provider, "malformed");
                return Err(e);
            }
        };

        let outcome = match order_ref {
            OrderRef::Payment(payment_id) => self.reconcile_payment(payment_id, &result).await,
            OrderRef::Booking(booking_id) => self.reconcile_booking(booking_id, &result).await,
        };

        match outcome {
            Ok(outcome) => {
                let label = match (outcome, result.success) {
                    (ReconcileOutcome::AlreadyProcessed, _) => "duplicate",
                    (ReconcileOutcome::Applied, true) => "captured",
                    (ReconcileOutcome::Applied, false) => "failed",
                };
                record_callback(provider, label);
                if !result.success {
                    info!(
                        provider = %provider,
                        %order_ref,
                        response_code = ?result.response_code,
                        "Provider reported payment failure"
                    );
                }
                Ok(CallbackOutcome {
                    order_ref,
                    outcome,
                    success: result.success,
                })
            }
            Err(e) => {
                record_callback(provider, "error");
                error!(provider = %provider, %order_ref, error = %e, "Callback reconciliation failed");
                Err(e)
            }
        }
    }

    async fn reconcile_payment(
        &self,
        payment_id: Uuid,
        result: &CallbackResult,
    ) -> DomainResult<ReconcileOutcome> {
        let repos = self.repos.clone();
        let reconciled = retry_with_backoff(
            self.retry.clone(),
            || {
                let repos = repos.clone();
                async move { repos.payments().reconcile(payment_id, result).await }
            },
            |e: &DomainError| e.is_conflict() || e.is_transient(),
            "reconcile_payment",
        )
        .await?;

        info!(
            %payment_id,
            status = %reconciled.payment.status,
            outcome = ?reconciled.outcome,
            cascaded = reconciled.cascaded,
            "Payment callback reconciled"
        );
        self.after_reconcile(&reconciled).await;
        Ok(reconciled.outcome)
    }

    async fn reconcile_booking(
        &self,
        booking_id: Uuid,
        result: &CallbackResult,
    ) -> DomainResult<ReconcileOutcome> {
        let amount = result
            .amount
            .ok_or_else(|| DomainError::Validation("callback amount is missing".into()))?;
        let provider_result = ProviderResult {
            booking_id,
            provider: result.provider,
            success: result.success,
            amount,
            bank_code: result.bank_code.clone(),
            txn_ref: Some(result.order_ref.clone()),
            txn_no: result.transaction_no.clone(),
        };

        let repos = self.repos.clone();
        let recorded = retry_with_backoff(
            self.retry.clone(),
            || {
                let repos = repos.clone();
                let provider_result = provider_result.clone();
                async move { repos.bookings().record_provider_result(&provider_result).await }
            },
            |e: &DomainError| e.is_conflict() || e.is_transient(),
            "record_booking_payment",
        )
        .await?
        .ok_or_else(|| DomainError::not_found("Booking", booking_id))?;

        info!(
            %booking_id,
            status = %recorded.payment.status,
            outcome = ?recorded.outcome,
            "Booking payment callback reconciled"
        );
        Ok(recorded.outcome)
    }

    async fn after_reconcile(&self, reconciled: &Reconciled) {
        if reconciled.outcome == ReconcileOutcome::AlreadyProcessed {
            return;
        }
        self.notifier.payment_updated(&reconciled.payment);
        if !reconciled.cascaded {
            return;
        }
        if let Some(reservation_id) = reconciled.payment.reservation_id {
            if let Ok(Some(reservation)) = self.repos.reservations().find_by_id(reservation_id).await {
                self.notifier.reservation_changed(&reservation);
            }
        }
        if let Some(session_id) = reconciled.payment.session_id {
            match self.repos.sessions().find_by_id(session_id).await {
                Ok(Some(session)) => {
                    if let Some(reservation_id) = session.reservation_id {
                        if let Ok(Some(reservation)) =
                            self.repos.reservations().find_by_id(reservation_id).await
                        {
                            self.notifier.reservation_changed(&reservation);
                        }
                    }
                    announce_spot(self.repos.as_ref(), self.notifier.as_ref(), session.spot_id)
                        .await;
                }
                Ok(None) => {}
                Err(e) => warn!(%session_id, error = %e, "Cascade notification skipped"),
            }
        }
    }
}

fn record_callback(provider: PaymentMethod, outcome: &'static str) {
    metrics::counter!(
        "payment_callbacks_total",
        "provider" => provider.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::application::payments::signing::hmac_sha512_hex;
    use crate::application::payments::VnPayGateway;
    use crate::config::VnPayConfig;
    use crate::domain::booking::{Booking, BookingPaymentStatus};
    use crate::domain::payment::PaymentStatus;
    use crate::domain::reservation::{Reservation, ReservationStatus};
    use crate::domain::session::{ChargingSession, NewSession};
    use crate::domain::station::SpotStatus;
    use crate::test_support::{at, fixture, pooled_fixture, Fixture};
    use chrono::Utc;

    const SECRET: &str = "TESTSECRET";

    fn vnpay_config() -> VnPayConfig {
        VnPayConfig {
            tmn_code: "EVCS0001".into(),
            hash_secret: SECRET.into(),
            return_url: "https://evcs.test/api/v1/payments/vnpay/return".into(),
            ..Default::default()
        }
    }

    fn service(fx: &Fixture) -> PaymentService {
        PaymentService::new(fx.repos.clone(), fx.notifier.clone())
            .with_gateway(Arc::new(VnPayGateway::new(vnpay_config())))
    }

    fn signed_callback(order_ref: &str, amount: f64, code: &str) -> HashMap<String, String> {
        let mut params: BTreeMap<String, String> = [
            ("vnp_Amount", ((amount * 100.0).round() as i64).to_string()),
            ("vnp_BankCode", "NCB".to_string()),
            ("vnp_ResponseCode", code.to_string()),
            ("vnp_TmnCode", "EVCS0001".to_string()),
            ("vnp_TransactionNo", "14000001".to_string()),
            ("vnp_TxnRef", order_ref.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let canonical = VnPayGateway::canonical_query(&params);
        let hash = hmac_sha512_hex(SECRET, &canonical).unwrap();
        params.insert("vnp_SecureHash".into(), hash);
        params.into_iter().collect()
    }

    async fn completed_session(fx: &Fixture, reservation_id: Option<Uuid>) -> ChargingSession {
        let mut request = NewSession::new(fx.user_id, fx.spots[0].id);
        request.reservation_id = reservation_id;
        let mut session = fx.repos.sessions().start(request).await.unwrap();
        session
            .complete(10.0, None, None, None, fx.billing.base_fee, Utc::now())
            .unwrap();
        fx.repos.sessions().close(&session).await.unwrap();
        session
    }

    async fn intent(svc: &PaymentService, fx: &Fixture, session: &ChargingSession) -> PaymentIntent {
        svc.create_intent(CreatePaymentIntent {
            user_id: fx.user_id,
            target: PaymentTarget::Session(session.id),
            amount: 35_000.0,
            method: PaymentMethod::VnPay,
            client_ip: "127.0.0.1".into(),
            return_url: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn vnpay_intent_has_signed_redirect() {
        let fx = fixture().await;
        let svc = service(&fx);
        let session = completed_session(&fx, None).await;

        let intent = intent(&svc, &fx, &session).await;
        let url = intent.redirect_url.unwrap();
        assert!(url.contains("vnp_SecureHash="));
        assert!(url.contains(&format!("vnp_TxnRef={}", intent.payment.order_ref())));
        assert_eq!(intent.payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_without_writing() {
        let fx = fixture().await;
        let svc = PaymentService::new(fx.repos.clone(), fx.notifier.clone());
        let session = completed_session(&fx, None).await;

        let err = svc
            .create_intent(CreatePaymentIntent {
                user_id: fx.user_id,
                target: PaymentTarget::Session(session.id),
                amount: 35_000.0,
                method: PaymentMethod::MoMo,
                client_ip: "127.0.0.1".into(),
                return_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
        assert_eq!(fx.notifier.count("payment_updated"), 0);
    }

    #[tokio::test]
    async fn replayed_callback_captures_once_and_cascades() {
        let fx = fixture().await;
        let svc = service(&fx);
        let reservation = fx
            .repos
            .reservations()
            .create_if_slot_free(Reservation::new(
                fx.user_id,
                fx.spots[0].id,
                fx.station.id,
                None,
                at(9),
                Some(at(10)),
                2,
                "EVR-",
            )
            .unwrap())
            .await
            .unwrap();
        let session = completed_session(&fx, Some(reservation.id)).await;
        let intent = intent(&svc, &fx, &session).await;
        let params = signed_callback(&intent.payment.order_ref().to_string(), 35_000.0, "00");

        let first = svc.handle_callback(PaymentMethod::VnPay, &params).await.unwrap();
        assert_eq!(first.outcome, ReconcileOutcome::Applied);
        assert!(first.success);

        for _ in 0..3 {
            let again = svc.handle_callback(PaymentMethod::VnPay, &params).await.unwrap();
            assert_eq!(again.outcome, ReconcileOutcome::AlreadyProcessed);
        }

        let stored = svc.get(intent.payment.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Captured);
        assert_eq!(stored.provider_txn_no.as_deref(), Some("14000001"));

        let reservation = fx
            .repos
            .reservations()
            .find_by_id(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Completed);
        let spot = fx.repos.stations().find_spot(fx.spots[0].id).await.unwrap().unwrap();
        assert_eq!(spot.status, SpotStatus::Available);
    }

    #[tokio::test]
    async fn simultaneous_duplicate_callbacks_apply_once() {
        let fx = pooled_fixture().await;
        let svc = Arc::new(service(&fx));
        let session = completed_session(&fx, None).await;
        let intent = intent(&svc, &fx, &session).await;
        let params = signed_callback(&intent.payment.order_ref().to_string(), 35_000.0, "00");
        let notified = fx.notifier.count("payment_updated");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            let params = params.clone();
            handles.push(tokio::spawn(async move {
                svc.handle_callback(PaymentMethod::VnPay, &params).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(out) if out.outcome == ReconcileOutcome::Applied => applied += 1,
                Ok(out) => assert_eq!(out.outcome, ReconcileOutcome::AlreadyProcessed),
                Err(e) => assert!(e.is_transient(), "unexpected error: {e}"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(fx.notifier.count("payment_updated"), notified + 1);
        let stored = svc.get(intent.payment.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Captured);
    }

    #[tokio::test]
    async fn tampered_callback_is_rejected() {
        let fx = fixture().await;
        let svc = service(&fx);
        let session = completed_session(&fx, None).await;
        let intent = intent(&svc, &fx, &session).await;

        let mut params = signed_callback(&intent.payment.order_ref().to_string(), 35_000.0, "00");
        params.insert("vnp_Amount".into(), "100".into());
        let err = svc.handle_callback(PaymentMethod::VnPay, &params).await.unwrap_err();
        assert!(matches!(err, DomainError::Signature(_)));

        let stored = svc.get(intent.payment.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn failed_then_captured_upgrades() {
        let fx = fixture().await;
        let svc = service(&fx);
        let session = completed_session(&fx, None).await;
        let intent = intent(&svc, &fx, &session).await;
        let order_ref = intent.payment.order_ref().to_string();

        let failed = svc
            .handle_callback(PaymentMethod::VnPay, &signed_callback(&order_ref, 35_000.0, "24"))
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(svc.get(intent.payment.id).await.unwrap().status, PaymentStatus::Failed);

        svc.handle_callback(PaymentMethod::VnPay, &signed_callback(&order_ref, 35_000.0, "00"))
            .await
            .unwrap();
        assert_eq!(svc.get(intent.payment.id).await.unwrap().status, PaymentStatus::Captured);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let fx = fixture().await;
        let svc = service(&fx);
        let order_ref = OrderRef::Payment(Uuid::new_v4()).to_string();
        let err = svc
            .handle_callback(PaymentMethod::VnPay, &signed_callback(&order_ref, 1_000.0, "00"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn booking_callback_upserts_one_row() {
        let fx = fixture().await;
        let svc = service(&fx);
        let booking = fx
            .repos
            .bookings()
            .create_if_slot_free(
                Booking::new(fx.user_id, fx.vehicle.id, fx.station.id, fx.spots[1].id, at(14), at(15))
                    .unwrap(),
            )
            .await
            .unwrap();
        let params = signed_callback(&booking.order_ref().to_string(), 50_000.0, "00");

        let first = svc.handle_callback(PaymentMethod::VnPay, &params).await.unwrap();
        assert_eq!(first.outcome, ReconcileOutcome::Applied);
        let again = svc.handle_callback(PaymentMethod::VnPay, &params).await.unwrap();
        assert_eq!(again.outcome, ReconcileOutcome::AlreadyProcessed);

        let payments = fx.repos.bookings().payments_for_booking(booking.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, BookingPaymentStatus::Succeeded);
        assert_eq!(payments[0].amount, 50_000.0);
    }

    #[tokio::test]
    async fn cash_confirmation_requires_cash_method() {
        let fx = fixture().await;
        let svc = service(&fx);
        let session = completed_session(&fx, None).await;

        let cash = svc
            .create_intent(CreatePaymentIntent {
                user_id: fx.user_id,
                target: PaymentTarget::Session(session.id),
                amount: 35_000.0,
                method: PaymentMethod::Cash,
                client_ip: "127.0.0.1".into(),
                return_url: None,
            })
            .await
            .unwrap();
        assert!(cash.redirect_url.is_none());

        let confirmed = svc.confirm_cash(cash.payment.id).await.unwrap();
        assert_eq!(confirmed.payment.status, PaymentStatus::Captured);
        assert_eq!(confirmed.outcome, ReconcileOutcome::Applied);
        let replay = svc.confirm_cash(cash.payment.id).await.unwrap();
        assert_eq!(replay.outcome, ReconcileOutcome::AlreadyProcessed);

        let online = intent(&svc, &fx, &session).await;
        assert!(matches!(
            svc.confirm_cash(online.payment.id).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn foreign_target_is_forbidden() {
        let fx = fixture().await;
        let svc = service(&fx);
        let session = completed_session(&fx, None).await;
        let err = svc
            .create_intent(CreatePaymentIntent {
                user_id: fx.other_user_id,
                target: PaymentTarget::Session(session.id),
                amount: 35_000.0,
                method: PaymentMethod::Cash,
                client_ip: "127.0.0.1".into(),
                return_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
