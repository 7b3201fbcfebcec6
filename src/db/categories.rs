use rusqlite::{params, params_from_iter, Connection};

use crate::db::models::Category;
use crate::error::AppResult;
use crate::state::DbPool;

/// Resolve category names to ids, creating missing categories on first
/// reference. Output order matches input order. The insert tolerates a
/// concurrent creation of the same name: both callers land on the row that
/// won.
pub fn resolve_or_create(pool: &DbPool, names: &[String]) -> AppResult<Vec<i64>> {
    let conn = pool.get()?;
    let mut ids = Vec::with_capacity(names.len());

    for name in names {
        conn.execute(
            "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        ids.push(id);
    }

    Ok(ids)
}

/// Category names for the given ids, sorted lexicographically. Ids without a
/// row are silently absent. Callers treat a failure here as non-fatal: the
/// names are supplementary display data.
pub fn names_for_ids(conn: &Connection, ids: &[i64]) -> AppResult<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "SELECT name FROM categories WHERE id IN ({}) ORDER BY name",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map(params_from_iter(ids.iter()), |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

pub fn list_all(pool: &DbPool) -> AppResult<Vec<Category>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}
