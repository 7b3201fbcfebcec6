use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, session};
use crate::db::models::User;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{self, CurrentUser};
use crate::state::AppState;
use crate::storage::avatars;
use crate::validate;

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours * 3600
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

// -- Handlers --

/// POST /api/register — multipart {username, email, password, avatar?}.
/// Validation runs before any store access; an uploaded avatar is accepted
/// on its content bytes, never its filename.
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut username = String::new();
    let mut email = String::new();
    let mut password_plain = String::new();
    let mut avatar_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Error parsing form data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "username" => {
                username = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Error parsing form data: {}", e)))?;
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Error parsing form data: {}", e)))?;
            }
            "password" => {
                password_plain = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Error parsing form data: {}", e)))?;
            }
            "avatar" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Error reading avatar data: {}", e)))?;
                if !bytes.is_empty() {
                    avatar_bytes = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    if username.is_empty() || email.is_empty() || password_plain.is_empty() {
        return Err(AppError::Validation("Missing required fields".into()));
    }

    let username = validate::username(&username)?;
    let email = validate::email(&email)?;
    validate::password_strength(&password_plain)?;

    let avatar_url = match avatar_bytes {
        Some(bytes) => avatars::save(state.config.uploads_path(), &bytes)?,
        None => avatars::DEFAULT_AVATAR_URL.to_string(),
    };

    let password_hash = password::hash(&password_plain)?;
    users::create(&state.db, &username, &email, &password_hash, &avatar_url)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response())
}

/// POST /api/login — JSON {email|username, password}. Unknown identity and
/// wrong password produce the identical generic 401.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    if req.password.is_empty() {
        return Err(AppError::Validation("Password cannot be empty".into()));
    }
    if req.email.is_empty() && req.username.is_empty() {
        return Err(AppError::Validation("Email or username is required".into()));
    }

    let user = if !req.email.is_empty() {
        let email = validate::email(&req.email)
            .map_err(|_| AppError::Validation("Invalid email format".into()))?;
        users::find_by_email(&state.db, &email)?
    } else {
        let username = validate::username(&req.username)
            .map_err(|_| AppError::Validation("Invalid username format".into()))?;
        users::find_by_username(&state.db, &username)?
    };

    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !password::verify(&req.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    // Single-session policy: clear prior sessions before minting the new
    // one. A failed cleanup is logged and does not abort the login.
    if let Err(e) = session::delete_all_for_user(&state.db, &user.id) {
        tracing::warn!("failed to delete existing sessions for user {}: {}", user.id, e);
    }

    let token = session::create(&state.db, &user.id)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "message": "Logged in" })),
    )
        .into_response())
}

/// POST /api/logout — idempotent: a missing cookie or an already-deleted
/// session still logs out cleanly.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = extractors::session_token(&headers, &state.config.auth.cookie_name) {
        session::delete(&state.db, token)?;
    }

    Ok((
        StatusCode::OK,
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )]),
        Json(json!({ "message": "Logged out" })),
    )
        .into_response())
}

/// GET /api/me — the authenticated user's own profile.
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let user = users::find_by_id(&state.db, &user.id)?.ok_or(AppError::Unauthenticated)?;
    Ok(Json(user))
}

/// GET /api/users/{id} — public profile lookup by user id.
pub async fn profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    if uuid::Uuid::parse_str(&id).is_err() {
        return Err(AppError::Validation("Invalid user ID format".into()));
    }
    let user = users::find_by_id(&state.db, &id)?.ok_or(AppError::NotFound)?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_with_unified_max_age() {
        let cookie = session_cookie("agora_session", "tok123", 24);
        assert!(cookie.starts_with("agora_session=tok123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        // 24h cookie lifetime matches the server-side session lifetime
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("agora_session");
        assert!(cookie.starts_with("agora_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
