use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::MaybeUser;
use super::error::require;
use super::{ApiError, ApiResponse, AppState, CategoryDto, validation};
use crate::auth::{Action, evaluate_catalog};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let categories = state
        .shared
        .store
        .list_categories()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryDto::from).collect(),
    )))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
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
        .get_category_by_slug(&payload.slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Category with slug '{}' already exists",
            payload.slug
        )));
    }

    let category = state
        .shared
        .store
        .create_category(&payload.name, &payload.slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(CategoryDto::from(category))))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Delete))?;

    let deleted = state
        .shared
        .store
        .delete_category(&slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("Category", slug));
    }

    Ok(Json(ApiResponse::success(())))
}
