//! Write-time rules checked before anything touches the database.
//!
//! The schema carries matching UNIQUE and CHECK constraints; these functions
//! exist so callers get a readable message instead of a constraint failure.

use std::collections::HashSet;

use foodgram_types::limits::{Bounds, Limits, MAX_NAME_LENGTH};

use crate::models::{IngredientAmount, NewRecipe, RecipeChanges};
use crate::{Error, Result};

/// The (user, target) relations that may hold at most one row per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl Intent {
    pub fn already_present(self) -> &'static str {
        match self {
            Intent::Favorite => "Recipe is already favorited",
            Intent::ShoppingCart => "Recipe is already in the shopping cart",
            Intent::Subscription => "Already subscribed to this author",
        }
    }

    pub fn not_present(self) -> &'static str {
        match self {
            Intent::Favorite => "Recipe is not favorited",
            Intent::ShoppingCart => "Recipe is not in the shopping cart",
            Intent::Subscription => "Not subscribed to this author",
        }
    }
}

pub const SELF_SUBSCRIBE: &str = "You cannot subscribe to yourself";

pub fn check_not_self(user_id: i64, author_id: i64) -> Result<()> {
    if user_id == author_id {
        return Err(Error::validation(SELF_SUBSCRIBE));
    }
    Ok(())
}

pub fn check_bounds(field: &str, value: i64, bounds: Bounds) -> Result<()> {
    if bounds.contains(value) {
        return Ok(());
    }
    if value < bounds.min {
        return Err(Error::Validation(format!("{} must be at least {}", field, bounds.min)));
    }
    Err(Error::Validation(format!("{} must be at most {}", field, bounds.max)))
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn check_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation("text must not be empty"));
    }
    Ok(())
}

/// Non-empty, no repeated ingredient id, every amount in bounds.
pub fn check_ingredients(lines: &[IngredientAmount], limits: &Limits) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation("at least one ingredient is required"));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.ingredient_id) {
            return Err(Error::Validation(format!(
                "duplicate ingredient: {} is listed more than once",
                line.ingredient_id
            )));
        }
        check_bounds("amount", line.amount, limits.amount)?;
    }
    Ok(())
}

/// Non-empty and no repeated tag id.
pub fn check_tags(tags: &[i64]) -> Result<()> {
    if tags.is_empty() {
        return Err(Error::validation("at least one tag is required"));
    }
    let mut seen = HashSet::with_capacity(tags.len());
    for id in tags {
        if !seen.insert(*id) {
            return Err(Error::Validation(format!(
                "duplicate tag: {} is listed more than once",
                id
            )));
        }
    }
    Ok(())
}

pub fn validate_new_recipe(recipe: &NewRecipe, limits: &Limits) -> Result<()> {
    check_name(&recipe.name)?;
    check_text(&recipe.text)?;
    check_bounds("cooking_time", recipe.cooking_time, limits.cooking_time)?;
    check_ingredients(&recipe.ingredients, limits)?;
    check_tags(&recipe.tags)
}

pub fn validate_changes(changes: &RecipeChanges, limits: &Limits) -> Result<()> {
    if let Some(name) = &changes.name {
        check_name(name)?;
    }
    if let Some(text) = &changes.text {
        check_text(text)?;
    }
    if let Some(minutes) = changes.cooking_time {
        check_bounds("cooking_time", minutes, limits.cooking_time)?;
    }
    check_ingredients(&changes.ingredients, limits)?;
    check_tags(&changes.tags)
}

/// `#RGB` or `#RRGGBB`.
pub fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ingredient_id: i64, amount: i64) -> IngredientAmount {
        IngredientAmount { ingredient_id, amount }
    }

    fn recipe() -> NewRecipe {
        NewRecipe {
            name: "Omelette".into(),
            text: "Whisk and fry.".into(),
            image: "recipes/a.png".into(),
            cooking_time: 10,
            tags: vec![1],
            ingredients: vec![line(1, 2)],
        }
    }

    fn message(res: Result<()>) -> String {
        match res {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ingredient_rejected() {
        let mut r = recipe();
        r.ingredients = vec![line(1, 2), line(1, 3)];
        let msg = message(validate_new_recipe(&r, &Limits::default()));
        assert!(msg.contains("duplicate ingredient"), "{}", msg);
    }

    #[test]
    fn test_empty_lists_rejected() {
        let mut r = recipe();
        r.ingredients.clear();
        assert!(message(validate_new_recipe(&r, &Limits::default())).contains("ingredient"));

        let mut r = recipe();
        r.tags.clear();
        assert!(message(validate_new_recipe(&r, &Limits::default())).contains("tag"));
    }

    #[test]
    fn test_bounds_name_offending_limit() {
        let limits = Limits {
            cooking_time: Bounds::new(1, 600),
            amount: Bounds::new(1, 50),
        };

        let mut r = recipe();
        r.cooking_time = 0;
        assert_eq!(
            message(validate_new_recipe(&r, &limits)),
            "cooking_time must be at least 1"
        );

        let mut r = recipe();
        r.ingredients = vec![line(1, 51)];
        assert_eq!(message(validate_new_recipe(&r, &limits)), "amount must be at most 50");

        let mut r = recipe();
        r.cooking_time = 600;
        r.ingredients = vec![line(1, 50)];
        assert!(validate_new_recipe(&r, &limits).is_ok());
    }

    #[test]
    fn test_changes_require_replacement_sets() {
        let changes = RecipeChanges {
            name: Some("New name".into()),
            ..Default::default()
        };
        assert!(validate_changes(&changes, &Limits::default()).is_err());
    }

    #[test]
    fn test_self_subscribe() {
        assert_eq!(message(check_not_self(3, 3)), SELF_SUBSCRIBE);
        assert!(check_not_self(3, 4).is_ok());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#E26C2D"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("E26C2D"));
        assert!(!is_hex_color("#GGGGGG"));
        assert!(!is_hex_color("#12345"));
    }
}
