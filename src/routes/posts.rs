use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::Post;
use crate::db::{categories, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list).post(create))
        .route("/api/posts/liked", get(liked))
        .route(
            "/api/posts/{id}",
            get(get_one).put(update).delete(delete_one),
        )
}

#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Pagination {
    fn clamped(&self) -> (u32, u32) {
        (self.page.max(1), self.per_page.clamp(1, MAX_PER_PAGE))
    }
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// POST /api/posts — authenticated. A post must name at least one category;
/// unknown names are created on the fly.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let title = req.title.trim();
    let content = req.content.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if content.is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }

    let names: Vec<String> = req
        .categories
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Err(AppError::Validation(
            "At least one category is required".into(),
        ));
    }

    let category_ids = categories::resolve_or_create(&state.db, &names)?;
    let post = posts::create(
        &state.db,
        &user.id,
        &category_ids,
        title,
        content,
        req.image_url.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// GET /api/posts — public, newest first, offset-paginated.
pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Post>>> {
    let (page, per_page) = pagination.clamped();
    Ok(Json(posts::list(&state.db, page, per_page)?))
}

/// GET /api/posts/liked — posts the current user has liked, most recent
/// like first.
pub async fn liked(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Post>>> {
    let (page, per_page) = pagination.clamped();
    Ok(Json(posts::list_liked_by(
        &state.db, &user.id, page, per_page,
    )?))
}

/// GET /api/posts/{id} — public.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Post>> {
    let post = posts::get(&state.db, id)?.ok_or(AppError::NotFound)?;
    Ok(Json(post))
}

/// PUT /api/posts/{id} — author only.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Response> {
    let title = req.title.trim();
    let content = req.content.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if content.is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }

    require_author(&state, id, &user.id)?;
    posts::update(&state.db, id, title, content)?;

    Ok((StatusCode::OK, Json(json!({ "message": "Post updated" }))).into_response())
}

/// DELETE /api/posts/{id} — author only; associations, comments and
/// reactions cascade away with the post.
pub async fn delete_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    require_author(&state, id, &user.id)?;
    posts::delete(&state.db, id)?;

    Ok((StatusCode::OK, Json(json!({ "message": "Post deleted" }))).into_response())
}

fn require_author(state: &AppState, post_id: i64, user_id: &str) -> AppResult<()> {
    let author = posts::author(&state.db, post_id)?.ok_or(AppError::NotFound)?;
    if author != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
