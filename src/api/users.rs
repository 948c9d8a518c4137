use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{CurrentUser, MaybeUser};
use super::error::require;
use super::{ApiError, ApiResponse, AppState, UserDto, validation};
use crate::auth::{evaluate_user_admin, may_change_role};
use crate::db::UserPatch;
use crate::models::user::Role;

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::parse(raw).ok_or_else(|| ApiError::FieldValidation {
        field: "role",
        message: format!("Unknown role '{raw}'"),
    })
}

impl UpdateUserRequest {
    fn into_patch(self, allow_role: bool) -> Result<UserPatch, ApiError> {
        if let Some(email) = &self.email {
            validation::validate_email(email).map_err(|message| ApiError::FieldValidation {
                field: "email",
                message,
            })?;
        }

        // The role field is silently discarded for actors that may not
        // change it, so self-elevation through the profile endpoint fails
        // quietly rather than erroring.
        let role = if allow_role {
            self.role.as_deref().map(parse_role).transpose()?
        } else {
            None
        };

        Ok(UserPatch {
            email: self.email,
            role,
            bio: self.bio.map(Some),
            first_name: self.first_name.map(Some),
            last_name: self.last_name.map(Some),
        })
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    require(evaluate_user_admin(user.actor().as_ref()))?;

    let users = state
        .shared
        .store
        .list_users(query.search.as_deref())
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require(evaluate_user_admin(user.actor().as_ref()))?;

    validation::validate_username(&payload.username).map_err(|message| {
        ApiError::FieldValidation {
            field: "username",
            message,
        }
    })?;
    validation::validate_email(&payload.email).map_err(|message| ApiError::FieldValidation {
        field: "email",
        message,
    })?;

    let role = payload
        .role
        .as_deref()
        .map(parse_role)
        .transpose()?
        .unwrap_or_default();

    if state
        .shared
        .store
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "User '{}' already exists",
            payload.username
        )));
    }
    if state
        .shared
        .store
        .get_user_by_email(&payload.email)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Email '{}' is already in use",
            payload.email
        )));
    }

    let created = state
        .shared
        .store
        .create_user(&payload.username, &payload.email, role, false)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let patch = UserPatch {
        email: None,
        role: None,
        bio: payload.bio.map(Some),
        first_name: payload.first_name.map(Some),
        last_name: payload.last_name.map(Some),
    };
    let created = state
        .shared
        .store
        .update_user(created, patch)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(created))))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require(evaluate_user_admin(user.actor().as_ref()))?;

    let found = state
        .shared
        .store
        .get_user_by_username(&username)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User", username))?;

    Ok(Json(ApiResponse::success(UserDto::from(found))))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require(evaluate_user_admin(user.actor().as_ref()))?;

    let target = state
        .shared
        .store
        .get_user_by_username(&username)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User", username))?;

    if let Some(email) = &payload.email
        && *email != target.email
        && state
            .shared
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Email '{email}' is already in use"
        )));
    }

    let patch = payload.into_patch(true)?;
    let updated = state
        .shared
        .store
        .update_user(target, patch)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require(evaluate_user_admin(user.actor().as_ref()))?;

    let deleted = state
        .shared
        .store
        .delete_user(&username)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("User", username));
    }

    Ok(Json(ApiResponse::success(())))
}

pub async fn get_me(user: CurrentUser) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user.0)))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let allow_role = may_change_role(&user.actor());

    if let Some(email) = &payload.email
        && *email != user.0.email
        && state
            .shared
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Email '{email}' is already in use"
        )));
    }

    let patch = payload.into_patch(allow_role)?;
    let updated = state
        .shared
        .store
        .update_user(user.0, patch)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}
