use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::MaybeUser;
use super::error::require;
use super::{ApiError, ApiResponse, AppState, TitleDto, validation};
use crate::auth::{Action, evaluate_catalog};
use crate::db::TitleFilter;

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<ApiResponse<Vec<TitleDto>>>, ApiError> {
    let filter = TitleFilter {
        category_slug: query.category,
        genre_slug: query.genre,
        name: query.name,
        year: query.year,
    };

    let records = state
        .shared
        .store
        .list_titles(&filter)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        records.into_iter().map(TitleDto::from).collect(),
    )))
}

pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    let record = state
        .shared
        .store
        .get_title(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::title_not_found(id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(record))))
}

async fn resolve_category(state: &Arc<AppState>, slug: &str) -> Result<i32, ApiError> {
    state
        .shared
        .store
        .get_category_by_slug(slug)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .map(|c| c.id)
        .ok_or_else(|| ApiError::FieldValidation {
            field: "category",
            message: format!("Unknown category slug '{slug}'"),
        })
}

async fn resolve_genres(state: &Arc<AppState>, slugs: &[String]) -> Result<Vec<i32>, ApiError> {
    let genres = state
        .shared
        .store
        .get_genres_by_slugs(slugs)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if genres.len() != slugs.len() {
        let known: Vec<&str> = genres.iter().map(|g| g.slug.as_str()).collect();
        let missing = slugs
            .iter()
            .find(|s| !known.contains(&s.as_str()))
            .map_or_else(String::new, Clone::clone);
        return Err(ApiError::FieldValidation {
            field: "genre",
            message: format!("Unknown genre slug '{missing}'"),
        });
    }

    Ok(genres.into_iter().map(|g| g.id).collect())
}

pub async fn create_title(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Create))?;

    if payload.name.is_empty() {
        return Err(ApiError::FieldValidation {
            field: "name",
            message: "Name cannot be empty".to_string(),
        });
    }
    if let Some(year) = payload.year {
        validation::validate_year(year).map_err(|message| ApiError::FieldValidation {
            field: "year",
            message,
        })?;
    }

    let category_id = resolve_category(&state, &payload.category).await?;
    let genre_ids = resolve_genres(&state, &payload.genre).await?;

    let id = state
        .shared
        .store
        .create_title(
            &payload.name,
            payload.year,
            payload.description,
            category_id,
            &genre_ids,
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let record = state
        .shared
        .store
        .get_title(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::internal("Failed to fetch created title"))?;

    Ok(Json(ApiResponse::success(TitleDto::from(record))))
}

pub async fn update_title(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Update))?;

    let record = state
        .shared
        .store
        .get_title(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::title_not_found(id))?;

    if let Some(year) = payload.year {
        validation::validate_year(year).map_err(|message| ApiError::FieldValidation {
            field: "year",
            message,
        })?;
    }

    let category_id = match &payload.category {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };

    let genre_ids = match &payload.genre {
        Some(slugs) => Some(resolve_genres(&state, slugs).await?),
        None => None,
    };

    state
        .shared
        .store
        .update_title(
            record.title,
            payload.name,
            payload.year.map(Some),
            payload.description.map(Some),
            category_id,
            genre_ids.as_deref(),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let record = state
        .shared
        .store
        .get_title(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::title_not_found(id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(record))))
}

pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require(evaluate_catalog(user.actor().as_ref(), Action::Delete))?;

    let deleted = state
        .shared
        .store
        .delete_title(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !deleted {
        return Err(ApiError::title_not_found(id));
    }

    Ok(Json(ApiResponse::success(())))
}
