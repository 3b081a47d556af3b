use rusqlite::{OptionalExtension, Row};

use crate::models::IngredientRow;
use crate::{Database, Error, Result};

fn ingredient_from_row(row: &Row<'_>) -> rusqlite::Result<IngredientRow> {
    Ok(IngredientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        measurement_unit: row.get(2)?,
    })
}

/// Escape LIKE wildcards so user input only matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Database {
    // -- Ingredients --

    /// All ingredients ordered by name and unit. With `search`, only those
    /// whose name contains it (case-insensitive for ASCII), names starting
    /// with it first.
    pub fn list_ingredients(&self, search: Option<&str>) -> Result<Vec<IngredientRow>> {
        self.with_conn(|conn| {
            let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
                Some(needle) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, measurement_unit FROM ingredients
                         WHERE name LIKE '%' || ?1 || '%' ESCAPE '\\'
                         ORDER BY name NOT LIKE ?1 || '%' ESCAPE '\\', name, measurement_unit",
                    )?;
                    let rows = stmt
                        .query_map([escape_like(needle)], ingredient_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, measurement_unit FROM ingredients
                         ORDER BY name, measurement_unit",
                    )?;
                    let rows = stmt
                        .query_map([], ingredient_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn get_ingredient(&self, id: i64) -> Result<IngredientRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?1",
                [id],
                ingredient_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound("Ingredient"))
        })
    }

    /// Insert an ingredient, returning its id, or `None` if the
    /// (name, measurement_unit) pair already exists.
    pub fn insert_ingredient(&self, name: &str, measurement_unit: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES (?1, ?2)",
                (name, measurement_unit),
            )?;
            Ok((changed > 0).then(|| conn.last_insert_rowid()))
        })
    }
}
