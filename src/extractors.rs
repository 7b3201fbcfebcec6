use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use rusqlite::params;

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// The currently authenticated user, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Extractor that requires authentication. Returns 401 when the cookie is
/// missing, unknown, or past the session lifetime.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated)?;

        let user_id = session::resolve(&state.db, token, state.config.auth.session_hours)?
            .ok_or(AppError::Unauthenticated)?;

        let conn = state.db.get()?;
        conn.query_row(
            "SELECT id, username FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .map_err(|_| AppError::Unauthenticated)
    }
}

/// Pull the session token out of the Cookie header(s).
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let headers = headers_with_cookie("theme=dark; agora_session=abc123; lang=en");
        assert_eq!(session_token(&headers, "agora_session"), Some("abc123"));
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(session_token(&headers, "agora_session"), None);
        assert_eq!(session_token(&HeaderMap::new(), "agora_session"), None);
    }

    #[test]
    fn value_may_contain_equals() {
        let headers = headers_with_cookie("agora_session=abc=def");
        assert_eq!(session_token(&headers, "agora_session"), Some("abc=def"));
    }
}
