//! `/api/auth/*` and `/api/users/*` handlers.

use crate::domain::error::ApiResult;
use crate::rest::extract::{ApiJson, AuthUser};
use crate::service::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ridex_core::{
    AuthSession, LocationUpdate, LoginRequest, OnlineStatus, ProfileUpdate, RegisterRequest,
};
use ridex_types::User;
use tracing::info;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    let session = state.accounts.register(req)?;
    info!(user_id = %session.user.id, role = %session.user.role, "User registered");
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    let session = state.accounts.login(&req.email, &req.password)?;
    Ok(Json(session))
}

/// Serves both `PUT /api/auth/update-user` and `PUT /api/users/profile`.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.update_profile(user.id, update)?))
}

pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(update): ApiJson<LocationUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.update_location(user.id, update)?))
}

pub async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(status): ApiJson<OnlineStatus>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.set_online(user.id, status.is_online).await?))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.current_user(user.id)?))
}
