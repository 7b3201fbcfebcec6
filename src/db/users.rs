use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar_url, created_at, updated_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert a new user. Uniqueness collisions on username or email surface as
/// `DuplicateIdentity`; any other storage failure stays a storage error.
pub fn create(
    pool: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
    avatar_url: &str,
) -> AppResult<User> {
    let conn = pool.get()?;
    let id = Uuid::now_v7().to_string();

    conn.query_row(
        &format!(
            "INSERT INTO users (id, username, email, password_hash, avatar_url)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {}",
            USER_COLUMNS
        ),
        params![id, username, email, password_hash, avatar_url],
        row_to_user,
    )
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            AppError::DuplicateIdentity
        } else {
            AppError::from(e)
        }
    })
}

pub fn find_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    find_by(pool, "id", id)
}

pub fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<User>> {
    find_by(pool, "username", username)
}

pub fn find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    find_by(pool, "email", email)
}

fn find_by(pool: &DbPool, column: &str, value: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column),
            params![value],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn sample(pool: &DbPool) -> User {
        create(
            pool,
            "alice",
            "alice@example.com",
            "$2b$12$hash",
            "/static/default-avatar.png",
        )
        .unwrap()
    }

    #[test]
    fn create_returns_full_user() {
        let pool = test_pool();
        let user = sample(&pool);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password_hash, "$2b$12$hash");
        assert!(!user.created_at.is_empty());
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[test]
    fn duplicate_email_is_duplicate_identity() {
        let pool = test_pool();
        sample(&pool);
        let err = create(
            &pool,
            "alice2",
            "alice@example.com",
            "x",
            "/static/default-avatar.png",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity));
    }

    #[test]
    fn duplicate_username_is_duplicate_identity() {
        let pool = test_pool();
        sample(&pool);
        let err = create(
            &pool,
            "alice",
            "other@example.com",
            "x",
            "/static/default-avatar.png",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity));
    }

    #[test]
    fn lookups_find_the_same_user() {
        let pool = test_pool();
        let user = sample(&pool);

        let by_id = find_by_id(&pool, &user.id).unwrap().unwrap();
        let by_name = find_by_username(&pool, "alice").unwrap().unwrap();
        let by_email = find_by_email(&pool, "alice@example.com").unwrap().unwrap();
        assert_eq!(by_id.id, user.id);
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn unknown_lookups_are_none() {
        let pool = test_pool();
        assert!(find_by_id(&pool, "missing").unwrap().is_none());
        assert!(find_by_username(&pool, "missing").unwrap().is_none());
        assert!(find_by_email(&pool, "missing@example.com").unwrap().is_none());
    }
}
