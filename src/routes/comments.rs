use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Comment, ReplyComment};
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts/{id}/comments",
            get(list_for_post).post(create),
        )
        .route("/api/comments/{id}/replies", post(reply))
        .route("/api/comments/{id}", delete(delete_one))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

/// POST /api/posts/{id}/comments — authenticated.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Response> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }

    if posts::author(&state.db, post_id)?.is_none() {
        return Err(AppError::NotFound);
    }

    let comment = comments::create(&state.db, &user.id, post_id, content)?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// GET /api/posts/{id}/comments — public; each comment carries its replies.
pub async fn list_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    if posts::author(&state.db, post_id)?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(Json(comments::for_post(&state.db, post_id)?))
}

/// POST /api/comments/{id}/replies — authenticated. One level of nesting
/// only: the parent must be a top-level comment.
pub async fn reply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(parent_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Response> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }

    if comments::author(&state.db, parent_id)?.is_none() {
        return Err(AppError::NotFound);
    }

    let reply: ReplyComment = comments::create_reply(&state.db, &user.id, parent_id, content)?;
    Ok((StatusCode::CREATED, Json(reply)).into_response())
}

/// DELETE /api/comments/{id} — author only.
pub async fn delete_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Response> {
    let author = comments::author(&state.db, comment_id)?.ok_or(AppError::NotFound)?;
    if author != user.id {
        return Err(AppError::Forbidden);
    }

    comments::delete(&state.db, comment_id)?;
    Ok((StatusCode::OK, Json(json!({ "message": "Comment deleted" }))).into_response())
}
