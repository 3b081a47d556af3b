use tracing::debug;

use super::recipes::{author_recipes, recipe_exists};
use super::users::{query_user, user_exists};
use super::{USER_COLUMNS, user_from_row};
use crate::error::{Constraint, constraint_violation, on_constraint};
use crate::models::SubscriptionRow;
use crate::validation::{self, Intent};
use crate::{Database, Error, Result};

/// Per-user recipe lists. Both have the same (user, recipe) shape and
/// differ only in what the user intends to do with the recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn intent(self) -> Intent {
        match self {
            RecipeList::Favorites => Intent::Favorite,
            RecipeList::ShoppingCart => Intent::ShoppingCart,
        }
    }
}

impl Database {
    // -- Favorites / shopping cart --

    /// ABSENT -> PRESENT. Fails if the recipe is already on the list.
    pub fn add_to_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<()> {
        let intent = list.intent();
        self.with_conn_mut(|conn| {
            if !recipe_exists(conn, recipe_id)? {
                return Err(Error::NotFound("Recipe"));
            }
            // A concurrent duplicate insert surfaces as a UNIQUE violation
            conn.execute(
                &format!("INSERT INTO {} (user_id, recipe_id) VALUES (?1, ?2)", list.table()),
                [user_id, recipe_id],
            )
            .map_err(|e| on_constraint(e, &[Constraint::Unique], intent.already_present()))?;
            Ok(())
        })?;
        debug!("User {} added recipe {} to {}", user_id, recipe_id, list.table());
        Ok(())
    }

    /// PRESENT -> ABSENT. Fails if the recipe is not on the list.
    pub fn remove_from_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<()> {
        let intent = list.intent();
        self.with_conn_mut(|conn| {
            if !recipe_exists(conn, recipe_id)? {
                return Err(Error::NotFound("Recipe"));
            }
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE user_id = ?1 AND recipe_id = ?2", list.table()),
                [user_id, recipe_id],
            )?;
            if removed == 0 {
                return Err(Error::validation(intent.not_present()));
            }
            Ok(())
        })?;
        debug!("User {} removed recipe {} from {}", user_id, recipe_id, list.table());
        Ok(())
    }

    // -- Subscriptions --

    /// Follow `author_id`.
    pub fn subscribe(&self, user_id: i64, author_id: i64) -> Result<()> {
        let intent = Intent::Subscription;
        self.with_conn_mut(|conn| {
            if !user_exists(conn, author_id)? {
                return Err(Error::NotFound("User"));
            }
            validation::check_not_self(user_id, author_id)?;

            conn.execute(
                "INSERT INTO subscriptions (user_id, author_id) VALUES (?1, ?2)",
                [user_id, author_id],
            )
            .map_err(|e| match e {
                e if constraint_violation(&e) == Some(Constraint::Check) => {
                    Error::validation(validation::SELF_SUBSCRIBE)
                }
                e => on_constraint(e, &[Constraint::Unique], intent.already_present()),
            })?;
            Ok(())
        })
    }

    pub fn unsubscribe(&self, user_id: i64, author_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            if !user_exists(conn, author_id)? {
                return Err(Error::NotFound("User"));
            }
            let removed = conn.execute(
                "DELETE FROM subscriptions WHERE user_id = ?1 AND author_id = ?2",
                [user_id, author_id],
            )?;
            if removed == 0 {
                return Err(Error::validation(Intent::Subscription.not_present()));
            }
            Ok(())
        })
    }

    /// Authors `user_id` follows, one page at a time, each with up to
    /// `recipes_limit` of their newest recipes.
    pub fn list_subscriptions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
        recipes_limit: Option<i64>,
    ) -> Result<(Vec<SubscriptionRow>, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;

            let authors = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {},
                            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id)
                     FROM subscriptions sub
                     JOIN users u ON u.id = sub.author_id
                     WHERE sub.user_id = ?1
                     ORDER BY sub.id
                     LIMIT ?2 OFFSET ?3",
                    USER_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![user_id, limit, offset], |row| {
                        Ok((user_from_row(row, 0)?, row.get::<_, i64>(6)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            let mut out = Vec::with_capacity(authors.len());
            for (author, recipes_count) in authors {
                let recipes = author_recipes(conn, author.id, recipes_limit)?;
                out.push(SubscriptionRow {
                    author,
                    recipes,
                    recipes_count,
                });
            }
            Ok((out, total))
        })
    }

    /// A followed author as returned by `subscribe`, with recipe preview.
    pub fn get_subscription(&self, user_id: i64, author_id: i64, recipes_limit: Option<i64>) -> Result<SubscriptionRow> {
        self.with_conn(|conn| {
            let author = query_user(conn, author_id, Some(user_id))?.ok_or(Error::NotFound("User"))?;
            let recipes_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM recipes WHERE author_id = ?1",
                [author_id],
                |row| row.get(0),
            )?;
            let recipes = author_recipes(conn, author_id, recipes_limit)?;
            Ok(SubscriptionRow {
                author,
                recipes,
                recipes_count,
            })
        })
    }
}
