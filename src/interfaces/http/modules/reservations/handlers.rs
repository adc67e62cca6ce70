//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::application::services::{CreateReservation, ReservationService};
use crate::domain::reservation::ReservationStatus;
use crate::domain::DomainError;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct ReservationAppState {
    pub reservations: Arc<ReservationService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation created", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid window or vehicle"),
        (status = 404, description = "Spot not found"),
        (status = 409, description = "Window overlaps an existing hold")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<CreateReservationRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservations
        .create(CreateReservation {
            user_id: user.user_id,
            spot_id: body.spot_id,
            vehicle_id: body.vehicle_id,
            start: body.start_time,
            end: body.end_time,
            notes: body.notes,
        })
        .await?;
    ok(reservation.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/upcoming",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservations starting from now, earliest first", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn upcoming_reservations(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
) -> ApiResult<Vec<ReservationDto>> {
    let list = state.reservations.get_upcoming(user.user_id).await?;
    ok(list.into_iter().map(ReservationDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/active",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Live reservations whose window has not ended", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn active_reservations(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
) -> ApiResult<Vec<ReservationDto>> {
    let list = state.reservations.get_active(user.user_id).await?;
    ok(list.into_iter().map(ReservationDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Belongs to another user"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
) -> ApiResult<ReservationDto> {
    let reservation = state.reservations.get(reservation_id).await?;
    user.ensure_can_access(reservation.user_id)?;
    ok(reservation.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{reservation_id}/status",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = Uuid, Path, description = "Reservation ID")),
    request_body = UpdateReservationStatusRequest,
    responses(
        (status = 200, description = "Status overwritten", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation_status(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateReservationStatusRequest>,
) -> ApiResult<ReservationDto> {
    user.require_staff()?;
    let status: ReservationStatus = body.status.parse()?;
    let reservation = state
        .reservations
        .update_status(reservation_id, status, body.notes)
        .await?
        .ok_or_else(|| DomainError::not_found("Reservation", reservation_id))?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{reservation_id}/cancel",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = Uuid, Path, description = "Reservation ID")),
    request_body = CancelReservationRequest,
    responses(
        (status = 200, description = "Whether the reservation was cancelled", body = ApiResponse<CancelReservationResponse>)
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CancelReservationRequest>,
) -> ApiResult<CancelReservationResponse> {
    let cancelled = state
        .reservations
        .cancel(reservation_id, user.user_id, body.reason.as_deref())
        .await?;
    ok(CancelReservationResponse { cancelled })
}
