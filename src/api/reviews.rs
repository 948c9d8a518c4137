use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{CurrentUser, MaybeUser};
use super::error::require;
use super::{ApiError, ApiResponse, AppState, ReviewDto, validation};
use crate::auth::{Action, evaluate_content};
use crate::db::ReviewInsert;
use crate::entities::reviews;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i32>,
}

async fn require_title(state: &Arc<AppState>, title_id: i32) -> Result<(), ApiError> {
    let exists = state
        .shared
        .store
        .title_exists(title_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::title_not_found(title_id))
    }
}

/// Review lookup scoped to its parent title: a review reached through the
/// wrong title is a 404, not a leak.
async fn find_review(
    state: &Arc<AppState>,
    title_id: i32,
    review_id: i32,
) -> Result<(reviews::Model, Option<crate::entities::users::Model>), ApiError> {
    require_title(state, title_id).await?;

    state
        .shared
        .store
        .get_review(title_id, review_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Review", review_id))
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    require_title(&state, title_id).await?;

    let rows = state
        .shared
        .store
        .list_reviews(title_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        rows.into_iter()
            .map(|(review, author)| ReviewDto::from_row(review, author))
            .collect(),
    )))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let (review, author) = find_review(&state, title_id, review_id).await?;
    Ok(Json(ApiResponse::success(ReviewDto::from_row(
        review, author,
    ))))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(title_id): Path<i32>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    require_title(&state, title_id).await?;

    validation::validate_score(payload.score).map_err(|message| ApiError::FieldValidation {
        field: "score",
        message,
    })?;
    if payload.text.is_empty() {
        return Err(ApiError::FieldValidation {
            field: "text",
            message: "Text cannot be empty".to_string(),
        });
    }

    let inserted = state
        .shared
        .store
        .create_review(title_id, user.0.id, &payload.text, payload.score)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    match inserted {
        ReviewInsert::Created(review) => Ok(Json(ApiResponse::success(ReviewDto::from_row(
            review,
            Some(user.0),
        )))),
        ReviewInsert::Duplicate => Err(ApiError::Conflict(
            "You have already reviewed this title".to_string(),
        )),
    }
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let (review, author) = find_review(&state, title_id, review_id).await?;
    require(evaluate_content(
        user.actor().as_ref(),
        Action::Update,
        review.author_id,
    ))?;

    if let Some(score) = payload.score {
        validation::validate_score(score).map_err(|message| ApiError::FieldValidation {
            field: "score",
            message,
        })?;
    }
    if let Some(text) = &payload.text
        && text.is_empty()
    {
        return Err(ApiError::FieldValidation {
            field: "text",
            message: "Text cannot be empty".to_string(),
        });
    }

    let review = state
        .shared
        .store
        .update_review(review, payload.text, payload.score)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(ReviewDto::from_row(
        review, author,
    ))))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let (review, _) = find_review(&state, title_id, review_id).await?;
    require(evaluate_content(
        user.actor().as_ref(),
        Action::Delete,
        review.author_id,
    ))?;

    state
        .shared
        .store
        .delete_review(review.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(())))
}
