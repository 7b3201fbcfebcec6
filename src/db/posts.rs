use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::categories;
use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Insert a post and all of its category associations in one transaction;
/// a failure on any association insert rolls back the whole post.
pub fn create(
    pool: &DbPool,
    author_id: &str,
    category_ids: &[i64],
    title: &str,
    content: &str,
    image_url: Option<&str>,
) -> AppResult<Post> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let (id, created_at, updated_at): (i64, String, String) = tx.query_row(
        "INSERT INTO posts (user_id, title, content, image_url)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, created_at, updated_at",
        params![author_id, title, content, image_url],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    for category_id in category_ids {
        tx.execute(
            "INSERT INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
            params![id, category_id],
        )?;
    }

    let category_names = lookup_names(&tx, id, category_ids);
    tx.commit()?;

    Ok(Post {
        id,
        user_id: author_id.to_string(),
        username: None,
        title: title.to_string(),
        content: content.to_string(),
        image_url: image_url.map(str::to_string),
        category_ids: category_ids.to_vec(),
        category_names,
        created_at,
        updated_at,
    })
}

pub fn get(pool: &DbPool, post_id: i64) -> AppResult<Option<Post>> {
    let conn = pool.get()?;

    let post = conn
        .query_row(
            "SELECT id, user_id, title, content, image_url, created_at, updated_at
             FROM posts WHERE id = ?1",
            params![post_id],
            row_to_post,
        )
        .optional()?;
    let Some(mut post) = post else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT category_id FROM post_categories WHERE post_id = ?1")?;
    post.category_ids = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    post.category_names = lookup_names(&conn, post_id, &post.category_ids);

    Ok(Some(post))
}

/// Author user id of a post, or `None` when the post does not exist. Cheap
/// existence/ownership probe for handlers.
pub fn author(pool: &DbPool, post_id: i64) -> AppResult<Option<String>> {
    let conn = pool.get()?;
    let author = conn
        .query_row(
            "SELECT user_id FROM posts WHERE id = ?1",
            params![post_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(author)
}

/// Page of posts, newest first, with author usernames joined in. Categories
/// for the whole page are fetched with a single batched query instead of
/// one query per post.
pub fn list(pool: &DbPool, page: u32, per_page: u32) -> AppResult<Vec<Post>> {
    let conn = pool.get()?;
    let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

    let mut stmt = conn.prepare(
        "SELECT posts.id, posts.user_id, users.username, posts.title, posts.content,
                posts.image_url, posts.created_at, posts.updated_at
         FROM posts
         JOIN users ON posts.user_id = users.id
         ORDER BY posts.created_at DESC, posts.id DESC
         LIMIT ?1 OFFSET ?2",
    )?;
    let mut posts = stmt
        .query_map(params![per_page, offset], row_to_listed_post)?
        .collect::<Result<Vec<Post>, _>>()?;
    drop(stmt);

    attach_categories(&conn, &mut posts)?;
    Ok(posts)
}

/// Page of posts the user has reacted "like" to, ordered by when the like
/// was given, newest first.
pub fn list_liked_by(
    pool: &DbPool,
    user_id: &str,
    page: u32,
    per_page: u32,
) -> AppResult<Vec<Post>> {
    let conn = pool.get()?;
    let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

    let mut stmt = conn.prepare(
        "SELECT posts.id, posts.user_id, users.username, posts.title, posts.content,
                posts.image_url, posts.created_at, posts.updated_at
         FROM posts
         JOIN users ON posts.user_id = users.id
         JOIN likes ON posts.id = likes.post_id
         WHERE likes.user_id = ?1 AND likes.type = 'like'
         ORDER BY likes.created_at DESC, likes.id DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let mut posts = stmt
        .query_map(params![user_id, per_page, offset], row_to_listed_post)?
        .collect::<Result<Vec<Post>, _>>()?;
    drop(stmt);

    attach_categories(&conn, &mut posts)?;
    Ok(posts)
}

pub fn update(pool: &DbPool, post_id: i64, title: &str, content: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, updated_at = datetime('now') WHERE id = ?3",
        params![title, content, post_id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Delete a post. Category associations, comments and reactions go with it
/// via foreign-key cascades.
pub fn delete(pool: &DbPool, post_id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: None,
        title: row.get(2)?,
        content: row.get(3)?,
        image_url: row.get(4)?,
        category_ids: Vec::new(),
        category_names: Vec::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_listed_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: Some(row.get(2)?),
        title: row.get(3)?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        category_ids: Vec::new(),
        category_names: Vec::new(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Fill in category ids and names for a page of posts with one batched
/// `post_categories` query, preserving the page's order.
fn attach_categories(conn: &Connection, posts: &mut [Post]) -> AppResult<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "SELECT post_id, category_id FROM post_categories WHERE post_id IN ({})",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut by_post: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        let (post_id, category_id) = row?;
        by_post.entry(post_id).or_default().push(category_id);
    }

    for post in posts.iter_mut() {
        post.category_ids = by_post.remove(&post.id).unwrap_or_default();
        post.category_names = lookup_names(conn, post.id, &post.category_ids);
    }

    Ok(())
}

// Category names degrade to an empty list on failure instead of failing the
// whole post: they are display data only.
fn lookup_names(conn: &Connection, post_id: i64, category_ids: &[i64]) -> Vec<String> {
    match categories::names_for_ids(conn, category_ids) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("category name lookup failed for post {}: {}", post_id, e);
            Vec::new()
        }
    }
}
