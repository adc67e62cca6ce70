//! Session HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::application::services::{CompleteSession, ProgressService, SessionService};
use crate::domain::session::{ChargingSession, NewSession, SessionStatus};
use crate::domain::DomainError;
use crate::interfaces::http::common::{ok, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct SessionAppState {
    pub sessions: Arc<SessionService>,
    pub progress: Arc<ProgressService>,
}

impl SessionAppState {
    async fn load_for(
        &self,
        user: &AuthenticatedUser,
        session_id: Uuid,
    ) -> Result<ChargingSession, ApiError> {
        let session = self.sessions.get(session_id).await?;
        user.ensure_can_access(session.user_id)?;
        Ok(session)
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = ApiResponse<SessionDto>),
        (status = 404, description = "Spot or reservation not found"),
        (status = 409, description = "Spot already has a session in progress"),
        (status = 422, description = "Station or spot not available")
    )
)]
pub async fn start_session(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<StartSessionRequest>,
) -> ApiResult<SessionDto> {
    let session = state
        .sessions
        .start_session(NewSession {
            user_id: user.user_id,
            spot_id: body.spot_id,
            vehicle_id: body.vehicle_id,
            reservation_id: body.reservation_id,
            initial_soc: body.initial_soc,
            target_soc: body.target_soc,
            energy_requested_kwh: body.energy_requested_kwh,
        })
        .await?;
    ok(session.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/scan",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    request_body = ScanSessionRequest,
    responses(
        (status = 200, description = "Session started from QR", body = ApiResponse<SessionDto>),
        (status = 400, description = "QR code is not a spot id"),
        (status = 409, description = "Spot already has a session in progress")
    )
)]
pub async fn scan_start_session(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<ScanSessionRequest>,
) -> ApiResult<SessionDto> {
    let session = state
        .sessions
        .start_from_qr(user.user_id, &body.qr_code, body.vehicle_id)
        .await?;
    ok(session.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = ApiResponse<SessionDto>),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionDto> {
    ok(state.load_for(&user, session_id).await?.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/complete",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    request_body = CompleteSessionRequest,
    responses(
        (status = 200, description = "Session completed and billed", body = ApiResponse<SessionDto>),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Session is not in progress")
    )
)]
pub async fn complete_session(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CompleteSessionRequest>,
) -> ApiResult<SessionDto> {
    state.load_for(&user, session_id).await?;
    let session = state
        .sessions
        .complete_session(
            session_id,
            CompleteSession {
                energy_delivered_kwh: body.energy_delivered_kwh,
                cost: body.cost,
                price_per_kwh: body.price_per_kwh,
                notes: body.notes,
            },
        )
        .await?
        .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))?;
    ok(session.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{session_id}/status",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    request_body = UpdateSessionStatusRequest,
    responses(
        (status = 200, description = "Status overwritten", body = ApiResponse<SessionDto>),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn update_session_status(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateSessionStatusRequest>,
) -> ApiResult<SessionDto> {
    user.require_staff()?;
    let status: SessionStatus = body.status.parse()?;
    let session = state
        .sessions
        .update_status(session_id, status, body.notes)
        .await?
        .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))?;
    ok(session.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/progress",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Live values updated", body = ApiResponse<SessionDto>),
        (status = 422, description = "Session is not in progress")
    )
)]
pub async fn report_progress(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ProgressRequest>,
) -> ApiResult<SessionDto> {
    state.load_for(&user, session_id).await?;
    let session = state
        .progress
        .update_progress(session_id, body.into())
        .await?;
    ok(session.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/progress",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Progress history, oldest first", body = ApiResponse<Vec<ProgressDto>>)
    )
)]
pub async fn progress_history(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Vec<ProgressDto>> {
    state.load_for(&user, session_id).await?;
    let history = state.progress.history(session_id).await?;
    ok(history.into_iter().map(ProgressDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/estimate",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    params(("session_id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Minutes to target SOC", body = ApiResponse<EstimateDto>)
    )
)]
pub async fn estimate_remaining(
    State(state): State<SessionAppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<EstimateDto> {
    state.load_for(&user, session_id).await?;
    let estimated_minutes_remaining = state.progress.estimate(session_id).await?;
    ok(EstimateDto {
        session_id,
        estimated_minutes_remaining,
    })
}
