use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::error::AppResult;
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    /// Strict parse: only the literal strings "like" and "dislike" are
    /// reactions; anything else is rejected before any store access.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "like" => Some(ReactionKind::Like),
            "dislike" => Some(ReactionKind::Dislike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }

    fn state(self) -> ReactionState {
        match self {
            ReactionKind::Like => ReactionState::Liked,
            ReactionKind::Dislike => ReactionState::Disliked,
        }
    }
}

/// A reaction lands on exactly one post or one comment; the handler layer
/// rejects both-or-neither before constructing a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Post(i64),
    Comment(i64),
}

impl Target {
    fn column(self) -> &'static str {
        match self {
            Target::Post(_) => "post_id",
            Target::Comment(_) => "comment_id",
        }
    }

    fn id(self) -> i64 {
        match self {
            Target::Post(id) | Target::Comment(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
    None,
    Liked,
    Disliked,
}

/// Toggle state machine per (user, target): an absent row inserts, the same
/// kind again deletes (toggle-off), the other kind updates in place. The
/// read and the write run in one transaction.
pub fn toggle(
    pool: &DbPool,
    user_id: &str,
    target: Target,
    kind: ReactionKind,
) -> AppResult<ReactionState> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let select = format!(
        "SELECT type FROM likes WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    let existing: Option<String> = tx
        .query_row(&select, params![user_id, target.id()], |row| row.get(0))
        .optional()?;

    let state = match existing.as_deref() {
        None => {
            let insert = format!(
                "INSERT INTO likes (user_id, {}, type) VALUES (?1, ?2, ?3)",
                target.column()
            );
            tx.execute(&insert, params![user_id, target.id(), kind.as_str()])?;
            kind.state()
        }
        Some(current) if current == kind.as_str() => {
            let delete = format!(
                "DELETE FROM likes WHERE user_id = ?1 AND {} = ?2",
                target.column()
            );
            tx.execute(&delete, params![user_id, target.id()])?;
            ReactionState::None
        }
        Some(_) => {
            let update = format!(
                "UPDATE likes SET type = ?3 WHERE user_id = ?1 AND {} = ?2",
                target.column()
            );
            tx.execute(&update, params![user_id, target.id(), kind.as_str()])?;
            kind.state()
        }
    };

    tx.commit()?;
    Ok(state)
}

/// Grouped (likes, dislikes) counts for a target. Absent rows count as
/// zero, never an error.
pub fn counts(pool: &DbPool, target: Target) -> AppResult<(i64, i64)> {
    let conn = pool.get()?;

    let sql = format!(
        "SELECT type, COUNT(*) FROM likes WHERE {} = ?1 GROUP BY type",
        target.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![target.id()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let (mut likes, mut dislikes) = (0, 0);
    for row in rows {
        let (kind, count) = row?;
        match kind.as_str() {
            "like" => likes = count,
            "dislike" => dislikes = count,
            _ => {}
        }
    }
    Ok((likes, dislikes))
}
