use std::collections::{HashMap, HashSet};

use foodgram_types::limits::Limits;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use tracing::info;

use super::{USER_COLUMNS, placeholders, user_from_row};
use crate::error::{Constraint, constraint_violation};
use crate::models::{
    IngredientAmount, NewRecipe, RecipeChanges, RecipeFilter, RecipeIngredientRow, RecipeRow,
    RecipeShortRow, TagRow,
};
use crate::validation;
use crate::{Database, Error, Result};

/// Recipe columns followed by the author's user columns. Viewer id is `?1`.
fn recipe_select() -> String {
    format!(
        "SELECT r.id, r.name, r.text, r.image, r.cooking_time, r.pub_date,
                EXISTS(SELECT 1 FROM favorites f WHERE f.user_id = ?1 AND f.recipe_id = r.id),
                EXISTS(SELECT 1 FROM shopping_cart c WHERE c.user_id = ?1 AND c.recipe_id = r.id),
                {}
         FROM recipes r
         JOIN users u ON u.id = r.author_id",
        USER_COLUMNS
    )
}

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        name: row.get(1)?,
        text: row.get(2)?,
        image: row.get(3)?,
        cooking_time: row.get(4)?,
        pub_date: row.get(5)?,
        is_favorited: row.get(6)?,
        is_in_shopping_cart: row.get(7)?,
        author: user_from_row(row, 8)?,
        tags: Vec::new(),
        ingredients: Vec::new(),
    })
}

fn short_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeShortRow> {
    Ok(RecipeShortRow {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        cooking_time: row.get(3)?,
    })
}

impl Database {
    // -- Recipe composition --

    /// Create a recipe with its tag set and ingredient lines in one
    /// transaction. `author_id` is the authenticated caller.
    pub fn create_recipe(&self, author_id: i64, recipe: &NewRecipe, limits: &Limits) -> Result<i64> {
        validation::validate_new_recipe(recipe, limits)?;

        self.with_tx(|tx| {
            check_references(tx, &recipe.tags, &recipe.ingredients)?;

            tx.execute(
                "INSERT INTO recipes (author_id, name, text, image, cooking_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    author_id,
                    &recipe.name,
                    &recipe.text,
                    &recipe.image,
                    recipe.cooking_time
                ],
            )
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::ForeignKey) => Error::NotFound("User"),
                _ => e.into(),
            })?;
            let recipe_id = tx.last_insert_rowid();

            insert_tags(tx, recipe_id, &recipe.tags)?;
            insert_lines(tx, recipe_id, &recipe.ingredients)?;

            info!(
                "Recipe {} created by user {}: {} tags, {} ingredients",
                recipe_id,
                author_id,
                recipe.tags.len(),
                recipe.ingredients.len()
            );
            Ok(recipe_id)
        })
    }

    /// Apply `changes` to a recipe owned by `caller_id`. The tag set and
    /// ingredient lines are replaced wholesale.
    ///
    /// Returns the previous image path when the image was replaced.
    pub fn update_recipe(
        &self,
        recipe_id: i64,
        caller_id: i64,
        changes: &RecipeChanges,
        limits: &Limits,
    ) -> Result<Option<String>> {
        let previous_image = self.with_tx(|tx| {
            let image = check_owner(tx, recipe_id, caller_id)?;
            validation::validate_changes(changes, limits)?;
            check_references(tx, &changes.tags, &changes.ingredients)?;

            tx.execute(
                "UPDATE recipes SET
                    name = COALESCE(?1, name),
                    text = COALESCE(?2, text),
                    image = COALESCE(?3, image),
                    cooking_time = COALESCE(?4, cooking_time)
                 WHERE id = ?5",
                rusqlite::params![
                    changes.name,
                    changes.text,
                    changes.image,
                    changes.cooking_time,
                    recipe_id
                ],
            )?;

            tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", [recipe_id])?;
            insert_tags(tx, recipe_id, &changes.tags)?;

            tx.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [recipe_id])?;
            insert_lines(tx, recipe_id, &changes.ingredients)?;

            let replaced = match &changes.image {
                Some(new) if *new != image => Some(image),
                _ => None,
            };
            Ok(replaced)
        })?;

        info!("Recipe {} updated by user {}", recipe_id, caller_id);
        Ok(previous_image)
    }

    /// Delete a recipe owned by `caller_id`. Returns its image path.
    pub fn delete_recipe(&self, recipe_id: i64, caller_id: i64) -> Result<String> {
        let image = self.with_tx(|tx| {
            let image = check_owner(tx, recipe_id, caller_id)?;
            tx.execute("DELETE FROM recipes WHERE id = ?1", [recipe_id])?;
            Ok(image)
        })?;

        info!("Recipe {} deleted by user {}", recipe_id, caller_id);
        Ok(image)
    }

    // -- Recipe reads --

    pub fn get_recipe(&self, recipe_id: i64, viewer: Option<i64>) -> Result<RecipeRow> {
        self.with_conn(|conn| {
            let recipe = conn
                .query_row(
                    &format!("{} WHERE r.id = ?2", recipe_select()),
                    rusqlite::params![viewer, recipe_id],
                    recipe_from_row,
                )
                .optional()?
                .ok_or(Error::NotFound("Recipe"))?;

            let mut recipes = vec![recipe];
            attach_details(conn, &mut recipes)?;
            Ok(recipes.remove(0))
        })
    }

    /// One page of recipes, newest first, plus the total number matching
    /// `filter`. The favorite and cart filters are ignored without a viewer.
    pub fn list_recipes(&self, filter: &RecipeFilter, viewer: Option<i64>) -> Result<(Vec<RecipeRow>, i64)> {
        self.with_conn(|conn| {
            let counted = FilterClause::build(filter, viewer, 0);
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM recipes r{}", counted.where_sql()),
                params_from_iter(counted.params.iter()),
                |row| row.get(0),
            )?;

            // ?1 is taken by the viewer in the select list
            let paged = FilterClause::build(filter, viewer, 1);
            let next = 1 + paged.params.len();
            let sql = format!(
                "{}{} ORDER BY r.pub_date DESC, r.id DESC LIMIT ?{} OFFSET ?{}",
                recipe_select(),
                paged.where_sql(),
                next + 1,
                next + 2
            );
            let mut params = Vec::with_capacity(paged.params.len() + 3);
            params.push(viewer.map_or(Value::Null, Value::Integer));
            params.extend(paged.params);
            params.push(Value::Integer(filter.limit));
            params.push(Value::Integer(filter.offset));

            let mut stmt = conn.prepare(&sql)?;
            let mut recipes = stmt
                .query_map(params_from_iter(params.iter()), recipe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_details(conn, &mut recipes)?;
            Ok((recipes, total))
        })
    }

    pub fn get_recipe_short(&self, recipe_id: i64) -> Result<RecipeShortRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, image, cooking_time FROM recipes WHERE id = ?1",
                [recipe_id],
                short_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound("Recipe"))
        })
    }
}

/// WHERE clauses for a recipe listing, numbered after `offset` bound params.
struct FilterClause {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl FilterClause {
    fn build(filter: &RecipeFilter, viewer: Option<i64>, offset: usize) -> Self {
        let mut out = Self {
            clauses: Vec::new(),
            params: Vec::new(),
        };

        if let Some(author) = filter.author {
            out.push("r.author_id = {}", Value::Integer(author), offset);
        }

        if !filter.tags.is_empty() {
            let start = offset + out.params.len();
            out.clauses.push(format!(
                "EXISTS(SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
                        WHERE rt.recipe_id = r.id AND t.slug IN ({}))",
                placeholders(start, filter.tags.len())
            ));
            out.params
                .extend(filter.tags.iter().map(|slug| Value::Text(slug.clone())));
        }

        if let Some(viewer) = viewer {
            if filter.favorited_only {
                out.push(
                    "EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = {})",
                    Value::Integer(viewer),
                    offset,
                );
            }
            if filter.in_cart_only {
                out.push(
                    "EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = {})",
                    Value::Integer(viewer),
                    offset,
                );
            }
        }

        out
    }

    /// Bind `value` as the next parameter, substituted for `{}` in `clause`.
    fn push(&mut self, clause: &str, value: Value, offset: usize) {
        self.params.push(value);
        let index = format!("?{}", offset + self.params.len());
        self.clauses.push(clause.replace("{}", &index));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Returns the recipe's current image path.
fn check_owner(conn: &Connection, recipe_id: i64, caller_id: i64) -> Result<String> {
    let (author_id, image): (i64, String) = conn
        .query_row(
            "SELECT author_id, image FROM recipes WHERE id = ?1",
            [recipe_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or(Error::NotFound("Recipe"))?;

    if author_id != caller_id {
        return Err(Error::Forbidden("Only the author can change this recipe"));
    }
    Ok(image)
}

/// Every referenced tag and ingredient must exist.
fn check_references(conn: &Connection, tags: &[i64], lines: &[IngredientAmount]) -> Result<()> {
    if let Some(missing) = first_missing(conn, "tags", tags)? {
        return Err(Error::Validation(format!("tag {} does not exist", missing)));
    }
    let ingredient_ids: Vec<i64> = lines.iter().map(|l| l.ingredient_id).collect();
    if let Some(missing) = first_missing(conn, "ingredients", &ingredient_ids)? {
        return Err(Error::Validation(format!("ingredient {} does not exist", missing)));
    }
    Ok(())
}

fn first_missing(conn: &Connection, table: &str, ids: &[i64]) -> Result<Option<i64>> {
    if ids.is_empty() {
        return Ok(None);
    }
    let sql = format!("SELECT id FROM {} WHERE id IN ({})", table, placeholders(0, ids.len()));
    let mut stmt = conn.prepare(&sql)?;
    let found = stmt
        .query_map(params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(ids.iter().copied().find(|id| !found.contains(id)))
}

fn insert_tags(conn: &Connection, recipe_id: i64, tags: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tags {
        stmt.execute([recipe_id, *tag_id])?;
    }
    Ok(())
}

fn insert_lines(conn: &Connection, recipe_id: i64, lines: &[IngredientAmount]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?1, ?2, ?3)",
    )?;
    for line in lines {
        stmt.execute([recipe_id, line.ingredient_id, line.amount])?;
    }
    Ok(())
}

/// Batch-load tags and ingredient lines for a set of recipes.
fn attach_details(conn: &Connection, recipes: &mut [RecipeRow]) -> Result<()> {
    if recipes.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

    let mut tags: HashMap<i64, Vec<TagRow>> = HashMap::new();
    {
        let sql = format!(
            "SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
             FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
             WHERE rt.recipe_id IN ({})
             ORDER BY t.name",
            placeholders(0, ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                TagRow {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    color: row.get(3)?,
                    slug: row.get(4)?,
                },
            ))
        })?;
        for row in rows {
            let (recipe_id, tag) = row?;
            tags.entry(recipe_id).or_default().push(tag);
        }
    }

    let mut lines: HashMap<i64, Vec<RecipeIngredientRow>> = HashMap::new();
    {
        let sql = format!(
            "SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
             FROM recipe_ingredients ri JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id IN ({})
             ORDER BY ri.id",
            placeholders(0, ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(RecipeIngredientRow {
                recipe_id: row.get(0)?,
                ingredient_id: row.get(1)?,
                name: row.get(2)?,
                measurement_unit: row.get(3)?,
                amount: row.get(4)?,
            })
        })?;
        for row in rows {
            let line = row?;
            lines.entry(line.recipe_id).or_default().push(line);
        }
    }

    for recipe in recipes.iter_mut() {
        recipe.tags = tags.remove(&recipe.id).unwrap_or_default();
        recipe.ingredients = lines.remove(&recipe.id).unwrap_or_default();
    }
    Ok(())
}

/// Newest recipes by `author_id`, at most `limit` when given.
pub(super) fn author_recipes(conn: &Connection, author_id: i64, limit: Option<i64>) -> Result<Vec<RecipeShortRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, image, cooking_time FROM recipes
         WHERE author_id = ?1
         ORDER BY pub_date DESC, id DESC
         LIMIT ?2",
    )?;
    // LIMIT -1 means no limit in SQLite
    let rows = stmt
        .query_map(rusqlite::params![author_id, limit.unwrap_or(-1)], short_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(super) fn recipe_exists(conn: &Connection, recipe_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = ?1)",
        [recipe_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
