//! Request extractors that reject with `{ message }` bodies.

use crate::domain::error::ApiError;
use crate::service::AppState;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use ridex_core::CoreError;
use ridex_types::{Role, UserId};

/// `axum::Json` whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// The caller identified by a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;
        let claims = state.accounts.authenticate(token)?;

        // A signed token for an account this store no longer holds is stale.
        match state.accounts.current_user(claims.sub) {
            Ok(user) => Ok(Self {
                id: user.id,
                role: user.role,
            }),
            Err(CoreError::NotFound(_)) => Err(ApiError::unauthorized("Token is not valid")),
            Err(e) => Err(e.into()),
        }
    }
}
