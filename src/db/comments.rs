use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::{Comment, ReplyComment};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub fn create(pool: &DbPool, user_id: &str, post_id: i64, content: &str) -> AppResult<Comment> {
    let conn = pool.get()?;

    let (id, created_at, updated_at): (i64, String, String) = conn.query_row(
        "INSERT INTO comments (user_id, post_id, content)
         VALUES (?1, ?2, ?3)
         RETURNING id, created_at, updated_at",
        params![user_id, post_id, content],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let (username, avatar_url) = author_display(&conn, user_id)?;

    Ok(Comment {
        id,
        user_id: user_id.to_string(),
        post_id,
        content: content.to_string(),
        username,
        avatar_url,
        created_at,
        updated_at,
        replies: Vec::new(),
    })
}

/// Attach a reply to a top-level comment. Replies cannot be replied to:
/// the parent id is checked against the comments table only.
pub fn create_reply(
    pool: &DbPool,
    user_id: &str,
    parent_comment_id: i64,
    content: &str,
) -> AppResult<ReplyComment> {
    let conn = pool.get()?;

    let (id, created_at, updated_at): (i64, String, String) = conn.query_row(
        "INSERT INTO replycomments (user_id, parent_comment_id, content)
         VALUES (?1, ?2, ?3)
         RETURNING id, created_at, updated_at",
        params![user_id, parent_comment_id, content],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let (username, avatar_url) = author_display(&conn, user_id)?;

    Ok(ReplyComment {
        id,
        user_id: user_id.to_string(),
        parent_comment_id,
        content: content.to_string(),
        username,
        avatar_url,
        created_at,
        updated_at,
    })
}

/// Author user id of a top-level comment, or `None` when it does not exist.
pub fn author(pool: &DbPool, comment_id: i64) -> AppResult<Option<String>> {
    let conn = pool.get()?;
    let author = conn
        .query_row(
            "SELECT user_id FROM comments WHERE id = ?1",
            params![comment_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(author)
}

/// Delete a top-level comment; its replies and reactions cascade.
pub fn delete(pool: &DbPool, comment_id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Comment tree for a post in two passes: top-level comments oldest first,
/// then every reply under the post in one subselect query, appended to its
/// parent in creation order. Never one reply query per comment.
pub fn for_post(pool: &DbPool, post_id: i64) -> AppResult<Vec<Comment>> {
    let conn = pool.get()?;

    let mut stmt = conn.prepare(
        "SELECT c.id, c.user_id, c.post_id, c.content, c.created_at, c.updated_at,
                u.username, u.avatar_url
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC",
    )?;
    let mut comments = stmt
        .query_map(params![post_id], row_to_comment)?
        .collect::<Result<Vec<Comment>, _>>()?;
    drop(stmt);

    let index_by_id: HashMap<i64, usize> = comments
        .iter()
        .enumerate()
        .map(|(index, c)| (c.id, index))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT r.id, r.user_id, r.parent_comment_id, r.content, r.created_at, r.updated_at,
                u.username, u.avatar_url
         FROM replycomments r
         JOIN users u ON u.id = r.user_id
         WHERE r.parent_comment_id IN (SELECT id FROM comments WHERE post_id = ?1)
         ORDER BY r.created_at ASC, r.id ASC",
    )?;
    let replies = stmt.query_map(params![post_id], row_to_reply)?;

    for reply in replies {
        let reply = reply?;
        if let Some(&index) = index_by_id.get(&reply.parent_comment_id) {
            comments[index].replies.push(reply);
        }
    }

    Ok(comments)
}

fn author_display(conn: &rusqlite::Connection, user_id: &str) -> AppResult<(String, String)> {
    Ok(conn.query_row(
        "SELECT username, avatar_url FROM users WHERE id = ?1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}

fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        username: row.get(6)?,
        avatar_url: row.get(7)?,
        replies: Vec::new(),
    })
}

fn row_to_reply(row: &Row) -> rusqlite::Result<ReplyComment> {
    Ok(ReplyComment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        parent_comment_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        username: row.get(6)?,
        avatar_url: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{categories, insert_test_user, posts, test_pool};

    fn make_post(pool: &DbPool, author: &str) -> i64 {
        let ids = categories::resolve_or_create(pool, &["general".to_string()]).unwrap();
        posts::create(pool, author, &ids, "post", "content", None)
            .unwrap()
            .id
    }

    #[test]
    fn create_carries_author_display_fields() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        let post_id = make_post(&pool, &user_id);

        let comment = create(&pool, &user_id, post_id, "first!").unwrap();
        assert_eq!(comment.post_id, post_id);
        assert_eq!(comment.username, "alice");
        assert_eq!(comment.avatar_url, "/static/default-avatar.png");
        assert!(comment.replies.is_empty());
    }

    #[test]
    fn create_against_missing_post_fails() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        assert!(create(&pool, &user_id, 9999, "orphan").is_err());
    }

    #[test]
    fn tree_groups_replies_under_parents_oldest_first() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        let post_id = make_post(&pool, &user_id);

        let c1 = create(&pool, &user_id, post_id, "C1").unwrap();
        let c2 = create(&pool, &user_id, post_id, "C2").unwrap();
        let r1 = create_reply(&pool, &user_id, c1.id, "R1").unwrap();

        let tree = for_post(&pool, post_id).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].content, "C1");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].id, r1.id);
        assert_eq!(tree[0].replies[0].content, "R1");
        assert_eq!(tree[1].content, "C2");
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn tree_excludes_other_posts() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        let post_a = make_post(&pool, &user_id);
        let post_b = make_post(&pool, &user_id);

        create(&pool, &user_id, post_a, "on A").unwrap();
        let on_b = create(&pool, &user_id, post_b, "on B").unwrap();
        create_reply(&pool, &user_id, on_b.id, "reply on B").unwrap();

        let tree = for_post(&pool, post_a).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].content, "on A");
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn delete_cascades_replies() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        let post_id = make_post(&pool, &user_id);

        let comment = create(&pool, &user_id, post_id, "parent").unwrap();
        create_reply(&pool, &user_id, comment.id, "child").unwrap();

        delete(&pool, comment.id).unwrap();

        let conn = pool.get().unwrap();
        let replies: i64 = conn
            .query_row("SELECT COUNT(*) FROM replycomments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(replies, 0);
        drop(conn);

        assert!(matches!(delete(&pool, comment.id), Err(AppError::NotFound)));
    }

    #[test]
    fn author_probe() {
        let pool = test_pool();
        let user_id = insert_test_user(&pool, "alice");
        let post_id = make_post(&pool, &user_id);
        let comment = create(&pool, &user_id, post_id, "mine").unwrap();

        assert_eq!(author(&pool, comment.id).unwrap(), Some(user_id));
        assert_eq!(author(&pool, 9999).unwrap(), None);
    }
}
