use chrono::{Duration, Utc};
use rand::RngCore;
use rusqlite::params;

use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session row for a user. Returns the opaque session token.
/// Callers enforcing the single-session policy must call
/// `delete_all_for_user` first.
pub fn create(pool: &DbPool, user_id: &str) -> AppResult<String> {
    let conn = pool.get()?;
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (id, user_id) VALUES (?1, ?2)",
        params![token, user_id],
    )?;

    Ok(token)
}

/// Resolve a session token to its owning user id. An unknown or expired
/// token is `None`, not an error.
pub fn resolve(pool: &DbPool, token: &str, max_age_hours: u64) -> AppResult<Option<String>> {
    let conn = pool.get()?;

    let result = conn.query_row(
        "SELECT user_id FROM sessions WHERE id = ?1 AND datetime(created_at) > datetime(?2)",
        params![token, cutoff(max_age_hours)],
        |row| row.get(0),
    );

    match result {
        Ok(user_id) => Ok(Some(user_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a session by token. Deleting an absent token is not an error.
pub fn delete(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![token])?;
    Ok(())
}

/// Delete every session belonging to a user. Login calls this before
/// creating the new session so only the most recent login persists.
pub fn delete_all_for_user(pool: &DbPool, user_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

/// Delete sessions older than the cutoff, returning how many went. Runs
/// from the background maintenance task, never from request handling.
/// Delete-by-timestamp stays safe under concurrent inserts of newer rows.
pub fn purge_expired(pool: &DbPool, max_age_hours: u64) -> AppResult<usize> {
    let conn = pool.get()?;
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE datetime(created_at) <= datetime(?1)",
        params![cutoff(max_age_hours)],
    )?;
    Ok(deleted)
}

// SQLite's datetime('now') stores UTC, so the cutoff is formatted the same way.
fn cutoff(max_age_hours: u64) -> String {
    (Utc::now() - Duration::hours(max_age_hours as i64))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
