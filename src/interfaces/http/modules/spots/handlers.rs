//! Spot HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use uuid::Uuid;

use crate::application::services::AvailabilityService;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult};

use super::dto::*;

#[derive(Clone)]
pub struct SpotAppState {
    pub availability: Arc<AvailabilityService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stations/{station_id}/spots",
    tag = "Spots",
    security(("bearer_auth" = [])),
    params(("station_id" = Uuid, Path, description = "Station ID")),
    responses(
        (status = 200, description = "Spots of the station", body = ApiResponse<Vec<SpotDto>>),
        (status = 404, description = "Station not found")
    )
)]
pub async fn list_station_spots(
    State(state): State<SpotAppState>,
    Path(station_id): Path<Uuid>,
) -> ApiResult<Vec<SpotDto>> {
    let spots = state.availability.list_spots(station_id).await?;
    ok(spots.into_iter().map(SpotDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/spots/{spot_id}/availability",
    tag = "Spots",
    security(("bearer_auth" = [])),
    params(("spot_id" = Uuid, Path, description = "Spot ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Window availability", body = ApiResponse<AvailabilityDto>),
        (status = 400, description = "End is not after start"),
        (status = 404, description = "Spot not found")
    )
)]
pub async fn spot_availability(
    State(state): State<SpotAppState>,
    Path(spot_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<AvailabilityDto> {
    let available = state
        .availability
        .is_slot_available(spot_id, query.start, query.end)
        .await?;
    let can_start_now = state.availability.can_start_immediately(spot_id).await?;
    ok(AvailabilityDto {
        spot_id,
        start: query.start,
        end: query.end,
        available,
        can_start_now,
    })
}
