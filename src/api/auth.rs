//! Signup, token exchange, and the bearer-token request extractors.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::entities::users;
use crate::models::user::Actor;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse<SignupResponse>>, ApiError> {
    state
        .shared
        .signup
        .signup(&payload.username, &payload.email)
        .await?;

    Ok(Json(ApiResponse::success(SignupResponse {
        username: payload.username,
        email: payload.email,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let token = state
        .shared
        .signup
        .exchange(&payload.username, &payload.confirmation_code)
        .await?;

    Ok(Json(ApiResponse::success(TokenResponse { token })))
}

/// An authenticated request identity. Rejects with 401 when no valid
/// bearer token is present.
pub struct CurrentUser(pub users::Model);

impl CurrentUser {
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

/// Like [`CurrentUser`] but tolerates anonymous requests. A present but
/// invalid token is still rejected.
pub struct MaybeUser(pub Option<users::Model>);

impl MaybeUser {
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Actor::from)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed Authorization header".to_string()))?;

    value.strip_prefix("Bearer ").map(Some).ok_or_else(|| {
        ApiError::Unauthenticated("Authorization header must use the Bearer scheme".to_string())
    })
}

async fn resolve_user(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<Option<users::Model>, ApiError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let claims = state
        .shared
        .tokens
        .verify(token)
        .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".to_string()))?;

    let user = state
        .shared
        .store
        .get_user_by_id(claims.sub)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthenticated("Token subject no longer exists".to_string()))?;

    Ok(Some(user))
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(Self(user)),
            None => Err(ApiError::Unauthenticated(
                "Authentication credentials were not provided".to_string(),
            )),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_user(parts, state).await?))
    }
}
