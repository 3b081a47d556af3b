mod ingredients;
mod recipes;
mod relations;
mod shopping;
mod tags;
mod users;

pub use relations::RecipeList;
pub use shopping::{ShoppingList, render};

use rusqlite::Row;

use crate::models::{TagRow, UserRow};

/// `?1, ?2, ..., ?n` starting after `offset` already-bound parameters.
fn placeholders(offset: usize, n: usize) -> String {
    (offset + 1..=offset + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expects `id, email, username, first_name, last_name, is_subscribed`
/// starting at column `start`.
fn user_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(start)?,
        email: row.get(start + 1)?,
        username: row.get(start + 2)?,
        first_name: row.get(start + 3)?,
        last_name: row.get(start + 4)?,
        is_subscribed: row.get(start + 5)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        slug: row.get(3)?,
    })
}

/// Columns selected by [`user_from_row`]. The viewer id is bound as `?1`;
/// binding NULL for anonymous viewers makes `is_subscribed` false.
const USER_COLUMNS: &str = "u.id, u.email, u.username, u.first_name, u.last_name,
     EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = ?1 AND s.author_id = u.id)";
