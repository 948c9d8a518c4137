use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{CurrentUser, MaybeUser};
use super::error::require;
use super::{ApiError, ApiResponse, AppState, CommentDto};
use crate::auth::{Action, evaluate_content};
use crate::entities::comments;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// The full parent chain is checked: the review must exist under the
/// given title before any comment under it is visible.
async fn require_review(
    state: &Arc<AppState>,
    title_id: i32,
    review_id: i32,
) -> Result<(), ApiError> {
    let exists = state
        .shared
        .store
        .title_exists(title_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    if !exists {
        return Err(ApiError::title_not_found(title_id));
    }

    state
        .shared
        .store
        .get_review(title_id, review_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;

    Ok(())
}

async fn find_comment(
    state: &Arc<AppState>,
    title_id: i32,
    review_id: i32,
    comment_id: i32,
) -> Result<(comments::Model, Option<crate::entities::users::Model>), ApiError> {
    require_review(state, title_id, review_id).await?;

    state
        .shared
        .store
        .get_comment(review_id, comment_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<Vec<CommentDto>>>, ApiError> {
    require_review(&state, title_id, review_id).await?;

    let rows = state
        .shared
        .store
        .list_comments(review_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        rows.into_iter()
            .map(|(comment, author)| CommentDto::from_row(comment, author))
            .collect(),
    )))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    let (comment, author) = find_comment(&state, title_id, review_id, comment_id).await?;
    Ok(Json(ApiResponse::success(CommentDto::from_row(
        comment, author,
    ))))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    require_review(&state, title_id, review_id).await?;

    if payload.text.is_empty() {
        return Err(ApiError::FieldValidation {
            field: "text",
            message: "Text cannot be empty".to_string(),
        });
    }

    let comment = state
        .shared
        .store
        .create_comment(review_id, user.0.id, &payload.text)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(CommentDto::from_row(
        comment,
        Some(user.0),
    ))))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    let (comment, author) = find_comment(&state, title_id, review_id, comment_id).await?;
    require(evaluate_content(
        user.actor().as_ref(),
        Action::Update,
        comment.author_id,
    ))?;

    if payload.text.is_empty() {
        return Err(ApiError::FieldValidation {
            field: "text",
            message: "Text cannot be empty".to_string(),
        });
    }

    let comment = state
        .shared
        .store
        .update_comment(comment, payload.text)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(CommentDto::from_row(
        comment, author,
    ))))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let (comment, _) = find_comment(&state, title_id, review_id, comment_id).await?;
    require(evaluate_content(
        user.actor().as_ref(),
        Action::Delete,
        comment.author_id,
    ))?;

    state
        .shared
        .store
        .delete_comment(comment.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(())))
}
