use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::categories;
use crate::db::models::Category;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/categories", get(list))
}

/// GET /api/categories — public, sorted by name.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(categories::list_all(&state.db)?))
}
