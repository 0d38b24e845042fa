//! `/api/rides/*` handlers.
//!
//! Lists are returned as bare JSON arrays and single rides as bare objects;
//! the web client reads `response.data` directly.

use crate::domain::error::{ApiError, ApiResult};
use crate::rest::extract::{ApiJson, AuthUser};
use crate::service::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ridex_core::{CoreError, EstimateRequest, FareEstimate, RideRequest};
use ridex_telemetry::{RIDES_ACCEPTED, RIDES_REQUESTED, RIDE_ACCEPT_CONFLICTS};
use ridex_types::{Ride, RideId, VehicleType};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableQuery {
    pub vehicle_type: Option<String>,
}

fn parse_ride_id(raw: &str) -> Result<RideId, ApiError> {
    RideId::parse(raw).map_err(|_| ApiError::bad_request("Invalid ride id"))
}

pub async fn estimate(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<EstimateRequest>,
) -> ApiResult<Json<FareEstimate>> {
    Ok(Json(state.rides.estimate(&req)?))
}

pub async fn request(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<RideRequest>,
) -> ApiResult<(StatusCode, Json<Ride>)> {
    let ride = state.rides.request(user.id, req).await?;
    RIDES_REQUESTED.inc();
    Ok((StatusCode::CREATED, Json(ride)))
}

pub async fn available(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AvailableQuery>,
) -> ApiResult<Json<Vec<Ride>>> {
    let vehicle_type = match query.vehicle_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<VehicleType>().map_err(CoreError::from)?),
    };
    Ok(Json(state.rides.available(user.id, vehicle_type)?))
}

pub async fn scheduled(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Ride>>> {
    Ok(Json(state.rides.scheduled(user.id)?))
}

pub async fn history(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Ride>>> {
    Ok(Json(state.rides.history(user.id)?))
}

pub async fn get_ride(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ride>> {
    let id = parse_ride_id(&id)?;
    Ok(Json(state.rides.get(user.id, id)?))
}

pub async fn accept(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ride>> {
    let id = parse_ride_id(&id)?;
    match state.rides.accept(user.id, id).await {
        Ok(ride) => {
            RIDES_ACCEPTED.inc();
            Ok(Json(ride))
        }
        Err(e @ CoreError::Conflict(_)) => {
            RIDE_ACCEPT_CONFLICTS.inc();
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ride>> {
    let id = parse_ride_id(&id)?;
    Ok(Json(state.rides.start(user.id, id).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ride>> {
    let id = parse_ride_id(&id)?;
    Ok(Json(state.rides.complete(user.id, id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ride>> {
    let id = parse_ride_id(&id)?;
    Ok(Json(state.rides.cancel(user.id, id).await?))
}
