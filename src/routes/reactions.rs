use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::reactions::{self, ReactionKind, Target};
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reactions", get(counts).post(toggle))
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub comment_id: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
pub struct TargetQuery {
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub comment_id: Option<i64>,
}

/// POST /api/reactions — authenticated toggle. Responds with the resulting
/// state and fresh counts for the target.
pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ToggleRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let kind = ReactionKind::parse(&req.kind)
        .ok_or_else(|| AppError::Validation("Reaction type must be 'like' or 'dislike'".into()))?;
    let target = target_from(req.post_id, req.comment_id)?;
    require_target_exists(&state, target)?;

    let reaction_state = reactions::toggle(&state.db, &user.id, target, kind)?;
    let (likes, dislikes) = reactions::counts(&state.db, target)?;

    Ok(Json(json!({
        "state": reaction_state,
        "likes": likes,
        "dislikes": dislikes,
    })))
}

/// GET /api/reactions?post_id=|comment_id= — public counts; an untouched
/// target reports zeroes.
pub async fn counts(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let target = target_from(query.post_id, query.comment_id)?;
    let (likes, dislikes) = reactions::counts(&state.db, target)?;

    Ok(Json(json!({ "likes": likes, "dislikes": dislikes })))
}

fn target_from(post_id: Option<i64>, comment_id: Option<i64>) -> AppResult<Target> {
    match (post_id, comment_id) {
        (Some(post_id), None) => Ok(Target::Post(post_id)),
        (None, Some(comment_id)) => Ok(Target::Comment(comment_id)),
        _ => Err(AppError::Validation(
            "Provide exactly one of post_id or comment_id".into(),
        )),
    }
}

fn require_target_exists(state: &AppState, target: Target) -> AppResult<()> {
    let exists = match target {
        Target::Post(id) => posts::author(&state.db, id)?.is_some(),
        Target::Comment(id) => comments::author(&state.db, id)?.is_some(),
    };
    if !exists {
        return Err(AppError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_requires_exactly_one_side() {
        assert!(matches!(target_from(Some(1), None), Ok(Target::Post(1))));
        assert!(matches!(
            target_from(None, Some(2)),
            Ok(Target::Comment(2))
        ));
        assert!(target_from(None, None).is_err());
        assert!(target_from(Some(1), Some(2)).is_err());
    }
}
