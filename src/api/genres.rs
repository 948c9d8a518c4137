use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::MaybeUser;
use super::error::require;
use super::{ApiError, ApiResponse, AppState, GenreDto, validation};
use crate::auth::{Action, evaluate_catalog};

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
    pub slug: String,
}

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<GenreDto>>>, ApiError> {
    let genres = state
        .shared
        .store
        .list_genres()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        genres.into_iter().map(GenreDto::from).collect(),
    )))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<Json<ApiResponse<GenreDto>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Create))?;

    validation::validate_slug(&payload.slug).map_err(|message| ApiError::FieldValidation {
        field: "slug",
        message,
    })?;
    if payload.name.is_empty() {
        return Err(ApiError::FieldValidation {
            field: "name",
            message: "Name cannot be empty".to_string(),
        });
    }

    if state
        .shared
        .store
        .get_genre_by_slug(&payload.slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Genre with slug '{}' already exists",
            payload.slug
        )));
    }

    let genre = state
        .shared
        .store
        .create_genre(&payload.name, &payload.slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(GenreDto::from(genre))))
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Delete))?;

    let deleted = state
        .shared
        .store
        .delete_genre(&slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("Genre", slug));
    }

    Ok(Json(ApiResponse::success(())))
}
