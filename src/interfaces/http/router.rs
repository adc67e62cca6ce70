//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::events::SharedEventBus;
use crate::application::services::{
    AvailabilityService, BookingService, PaymentService, ProgressService, ReservationService,
    SessionService,
};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::ws::{ws_notifications_handler, NotificationState};

use super::modules::{
    bookings, health, metrics, payments, request_id, reservations, sessions, spots,
};

/// Services the HTTP layer dispatches to.
#[derive(Clone)]
pub struct AppServices {
    pub availability: Arc<AvailabilityService>,
    pub reservations: Arc<ReservationService>,
    pub sessions: Arc<SessionService>,
    pub progress: Arc<ProgressService>,
    pub payments: Arc<PaymentService>,
    pub bookings: Arc<BookingService>,
}

/// Unified state for every `/api/v1` route. Handlers keep their own
/// `State<T>` extractor through `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub services: AppServices,
    pub auth: AuthState,
}

impl FromRef<ApiState> for spots::SpotAppState {
    fn from_ref(s: &ApiState) -> Self {
        Self {
            availability: Arc::clone(&s.services.availability),
        }
    }
}

impl FromRef<ApiState> for reservations::ReservationAppState {
    fn from_ref(s: &ApiState) -> Self {
        Self {
            reservations: Arc::clone(&s.services.reservations),
        }
    }
}

impl FromRef<ApiState> for sessions::SessionAppState {
    fn from_ref(s: &ApiState) -> Self {
        Self {
            sessions: Arc::clone(&s.services.sessions),
            progress: Arc::clone(&s.services.progress),
        }
    }
}

impl FromRef<ApiState> for payments::PaymentAppState {
    fn from_ref(s: &ApiState) -> Self {
        Self {
            payments: Arc::clone(&s.services.payments),
        }
    }
}

impl FromRef<ApiState> for bookings::BookingAppState {
    fn from_ref(s: &ApiState) -> Self {
        Self {
            bookings: Arc::clone(&s.services.bookings),
        }
    }
}

impl FromRef<ApiState> for AuthState {
    fn from_ref(s: &ApiState) -> Self {
        s.auth.clone()
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT bearer token; `sub` is the user id"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Spots
        spots::list_station_spots,
        spots::spot_availability,
        // Reservations
        reservations::create_reservation,
        reservations::upcoming_reservations,
        reservations::active_reservations,
        reservations::get_reservation,
        reservations::update_reservation_status,
        reservations::cancel_reservation,
        // Sessions
        sessions::start_session,
        sessions::scan_start_session,
        sessions::get_session,
        sessions::complete_session,
        sessions::update_session_status,
        sessions::report_progress,
        sessions::progress_history,
        sessions::estimate_remaining,
        // Payments
        payments::create_payment,
        payments::get_payment,
        payments::confirm_cash_payment,
        payments::vnpay_return,
        payments::vnpay_ipn,
        payments::momo_return,
        payments::momo_ipn,
        // Bookings
        bookings::create_booking,
        bookings::get_booking,
        bookings::start_booking_session,
        bookings::end_booking_session,
        bookings::create_booking_vnpay_payment,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            spots::SpotDto,
            spots::AvailabilityDto,
            reservations::CreateReservationRequest,
            reservations::UpdateReservationStatusRequest,
            reservations::CancelReservationRequest,
            reservations::CancelReservationResponse,
            reservations::ReservationDto,
            sessions::StartSessionRequest,
            sessions::ScanSessionRequest,
            sessions::CompleteSessionRequest,
            sessions::UpdateSessionStatusRequest,
            sessions::ProgressRequest,
            sessions::SessionDto,
            sessions::ProgressDto,
            sessions::EstimateDto,
            payments::CreatePaymentRequest,
            payments::PaymentDto,
            payments::PaymentIntentDto,
            payments::CallbackDto,
            payments::VnPayIpnResponse,
            bookings::CreateBookingRequest,
            bookings::StartBookingRequest,
            bookings::EndBookingSessionRequest,
            bookings::BookingVnPayRequest,
            bookings::BookingDto,
            bookings::BookingSessionDto,
            bookings::EndBookingSessionResponse,
            bookings::PaymentUrlDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Spots", description = "Spot listing and window availability"),
        (name = "Reservations", description = "Time-window holds on spots"),
        (name = "Sessions", description = "Charging sessions, live progress and estimates"),
        (name = "Payments", description = "Payment intents and cash confirmation"),
        (name = "Payment callbacks", description = "Signed VNPay and MoMo callbacks (no bearer token)"),
        (name = "Bookings", description = "Pay-per-use booking flow"),
    ),
    info(
        title = "EV Charging Reservation & Payment API",
        version = "1.0.0",
        description = "Spot reservations, charging sessions and provider payment reconciliation"
    )
)]
pub struct ApiDoc;

/// Everything the router needs besides the services.
pub struct RouterDeps {
    pub services: AppServices,
    pub db: DatabaseConnection,
    pub jwt_config: JwtConfig,
    pub event_bus: SharedEventBus,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn create_api_router(deps: RouterDeps) -> Router {
    let auth = AuthState {
        jwt_config: deps.jwt_config,
    };
    let api_state = ApiState {
        services: deps.services,
        auth: auth.clone(),
    };

    let protected = Router::new()
        .route("/stations/{station_id}/spots", get(spots::list_station_spots))
        .route("/spots/{spot_id}/availability", get(spots::spot_availability))
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/upcoming", get(reservations::upcoming_reservations))
        .route("/reservations/active", get(reservations::active_reservations))
        .route("/reservations/{reservation_id}", get(reservations::get_reservation))
        .route(
            "/reservations/{reservation_id}/status",
            put(reservations::update_reservation_status),
        )
        .route(
            "/reservations/{reservation_id}/cancel",
            post(reservations::cancel_reservation),
        )
        .route("/sessions", post(sessions::start_session))
        .route("/sessions/scan", post(sessions::scan_start_session))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route("/sessions/{session_id}/complete", post(sessions::complete_session))
        .route("/sessions/{session_id}/status", put(sessions::update_session_status))
        .route(
            "/sessions/{session_id}/progress",
            get(sessions::progress_history).post(sessions::report_progress),
        )
        .route("/sessions/{session_id}/estimate", get(sessions::estimate_remaining))
        .route("/payments", post(payments::create_payment))
        .route("/payments/{payment_id}", get(payments::get_payment))
        .route(
            "/payments/{payment_id}/cash-confirm",
            post(payments::confirm_cash_payment),
        )
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/{booking_id}", get(bookings::get_booking))
        .route("/bookings/{booking_id}/start", post(bookings::start_booking_session))
        .route(
            "/bookings/{booking_id}/payments/vnpay",
            post(bookings::create_booking_vnpay_payment),
        )
        .route(
            "/booking-sessions/{session_id}/end",
            post(bookings::end_booking_session),
        )
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(api_state.clone());

    // Static segments win over `{payment_id}`, so these do not collide.
    let callbacks = Router::new()
        .route("/payments/vnpay/return", get(payments::vnpay_return))
        .route("/payments/vnpay/ipn", get(payments::vnpay_ipn))
        .route("/payments/momo/return", get(payments::momo_return))
        .route("/payments/momo/ipn", post(payments::momo_ipn))
        .with_state(api_state);

    let notifications = Router::new()
        .route("/notifications/ws", get(ws_notifications_handler))
        .with_state(NotificationState {
            event_bus: deps.event_bus,
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db: deps.db,
            started_at: Arc::new(Instant::now()),
        });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(health_routes)
        .nest("/api/v1", protected.merge(callbacks).merge(notifications));

    if let Some(handle) = deps.metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momo_ipn_documents_a_json_body() {
        let doc = ApiDoc::openapi();
        let item = doc.paths.paths.get("/api/v1/payments/momo/ipn").unwrap();
        let post = item.post.as_ref().unwrap();
        assert!(post.request_body.is_some());
    }
}
