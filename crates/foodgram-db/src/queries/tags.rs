use rusqlite::OptionalExtension;

use super::tag_from_row;
use crate::models::TagRow;
use crate::{Database, Error, Result};

impl Database {
    // -- Tags --

    pub fn list_tags(&self) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, color, slug FROM tags ORDER BY name")?;
            let rows = stmt
                .query_map([], tag_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_tag(&self, id: i64) -> Result<TagRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, color, slug FROM tags WHERE id = ?1",
                [id],
                tag_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound("Tag"))
        })
    }

    /// Insert a tag, returning its id. Returns `None` if a tag with the same
    /// name, color or slug already exists.
    pub fn insert_tag(&self, name: &str, color: &str, slug: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO tags (name, color, slug) VALUES (?1, ?2, ?3)",
                (name, color, slug),
            )?;
            Ok((changed > 0).then(|| conn.last_insert_rowid()))
        })
    }
}
