//! Booking HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::application::services::{BookingService, CreateBooking};
use crate::interfaces::http::common::{client_ip, ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct BookingAppState {
    pub bookings: Arc<BookingService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Booking created", body = ApiResponse<BookingDto>),
        (status = 400, description = "Invalid window, vehicle or spot"),
        (status = 409, description = "Window overlaps an existing hold")
    )
)]
pub async fn create_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateBookingRequest>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .create(CreateBooking {
            user_id: user.user_id,
            vehicle_id: body.vehicle_id,
            station_id: body.station_id,
            spot_id: body.spot_id,
            start: body.start_time,
            end: body.end_time,
        })
        .await?;
    ok(booking.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<BookingDto> {
    let booking = state.bookings.get(booking_id).await?;
    user.ensure_can_access(booking.user_id)?;
    ok(booking.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/start",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = Uuid, Path, description = "Booking ID")),
    request_body = StartBookingRequest,
    responses(
        (status = 200, description = "Booking session started", body = ApiResponse<BookingSessionDto>),
        (status = 402, description = "Prepayment required"),
        (status = 409, description = "Spot already has an active session"),
        (status = 422, description = "Booking cancelled or spot not available")
    )
)]
pub async fn start_booking_session(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<StartBookingRequest>,
) -> ApiResult<BookingSessionDto> {
    let booking = state.bookings.get(booking_id).await?;
    user.ensure_can_access(booking.user_id)?;
    let session = state
        .bookings
        .start_session(booking_id, body.qr_code.as_deref())
        .await?;
    ok(session.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/booking-sessions/{session_id}/end",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Booking session ID")),
    request_body = EndBookingSessionRequest,
    responses(
        (status = 200, description = "Session state after the call", body = ApiResponse<EndBookingSessionResponse>),
        (status = 404, description = "Session not found")
    )
)]
pub async fn end_booking_session(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<EndBookingSessionRequest>,
) -> ApiResult<EndBookingSessionResponse> {
    let session = state.bookings.find_session(session_id).await?;
    let booking = state.bookings.get(session.booking_id).await?;
    user.ensure_can_access(booking.user_id)?;

    let ended = state.bookings.end_session(session_id, body.energy_kwh).await?;
    let session = state.bookings.find_session(session_id).await?;
    ok(EndBookingSessionResponse {
        ended,
        session: session.into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/payments/vnpay",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = Uuid, Path, description = "Booking ID")),
    request_body = BookingVnPayRequest,
    responses(
        (status = 200, description = "Signed VNPay URL", body = ApiResponse<PaymentUrlDto>),
        (status = 403, description = "Booking belongs to another user"),
        (status = 503, description = "VNPay not configured")
    )
)]
pub async fn create_booking_vnpay_payment(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<BookingVnPayRequest>,
) -> ApiResult<PaymentUrlDto> {
    let payment_url = state
        .bookings
        .create_vnpay_payment(
            booking_id,
            user.user_id,
            body.amount,
            client_ip(&headers),
            body.return_url,
        )
        .await?;
    ok(PaymentUrlDto { payment_url })
}
