use std::fmt::Write;

use crate::models::ShoppingItem;
use crate::{Database, Result};

/// Aggregated ingredient totals for one user's shopping cart.
///
/// Consumed once, by iteration.
#[derive(Debug)]
pub struct ShoppingList {
    items: std::vec::IntoIter<ShoppingItem>,
}

impl Iterator for ShoppingList {
    type Item = ShoppingItem;

    fn next(&mut self) -> Option<ShoppingItem> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for ShoppingList {}

impl Database {
    /// Sum every ingredient line reachable through `user_id`'s cart.
    ///
    /// Lines are grouped by the ingredient's name and unit rather than its
    /// id, so two ingredient rows sharing both are merged into one total.
    pub fn shopping_list(&self, user_id: i64) -> Result<ShoppingList> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.name, i.measurement_unit, SUM(ri.amount)
                 FROM shopping_cart c
                 JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
                 JOIN ingredients i ON i.id = ri.ingredient_id
                 WHERE c.user_id = ?1
                 GROUP BY i.name, i.measurement_unit
                 ORDER BY i.name, i.measurement_unit",
            )?;
            let items = stmt
                .query_map([user_id], |row| {
                    Ok(ShoppingItem {
                        name: row.get(0)?,
                        measurement_unit: row.get(1)?,
                        amount: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(ShoppingList {
                items: items.into_iter(),
            })
        })
    }
}

/// Plain-text report, one `name - amount unit` line per item.
pub fn render(items: impl IntoIterator<Item = ShoppingItem>) -> String {
    let mut out = String::new();
    for item in items {
        // writing to a String cannot fail
        let _ = writeln!(out, "{} - {} {}", item.name, item.amount, item.measurement_unit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientAmount, NewRecipe};
    use crate::queries::RecipeList;
    use crate::testutil;
    use foodgram_types::limits::Limits;

    fn recipe(db: &Database, author: i64, tag: i64, lines: Vec<(i64, i64)>) -> i64 {
        db.create_recipe(
            author,
            &NewRecipe {
                name: "Salad".into(),
                text: "Chop.".into(),
                image: "recipes/salad.png".into(),
                cooking_time: 5,
                tags: vec![tag],
                ingredients: lines
                    .into_iter()
                    .map(|(ingredient_id, amount)| IngredientAmount { ingredient_id, amount })
                    .collect(),
            },
            &Limits::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_amounts_summed_across_cart() {
        let db = testutil::open();
        let user = testutil::user(&db, "alice");
        let tag = db.insert_tag("Salads", "#00FF00", "salads").unwrap().unwrap();
        let tomato = db.insert_ingredient("Tomato", "pcs").unwrap().unwrap();
        let oil = db.insert_ingredient("Olive oil", "ml").unwrap().unwrap();

        let a = recipe(&db, user, tag, vec![(tomato, 2)]);
        let b = recipe(&db, user, tag, vec![(tomato, 3), (oil, 15)]);
        let not_in_cart = recipe(&db, user, tag, vec![(tomato, 100)]);
        db.add_to_list(RecipeList::ShoppingCart, user, a).unwrap();
        db.add_to_list(RecipeList::ShoppingCart, user, b).unwrap();
        db.add_to_list(RecipeList::Favorites, user, not_in_cart).unwrap();

        let items: Vec<_> = db.shopping_list(user).unwrap().collect();
        assert_eq!(
            items,
            vec![
                ShoppingItem {
                    name: "Olive oil".into(),
                    amount: 15,
                    measurement_unit: "ml".into()
                },
                ShoppingItem {
                    name: "Tomato".into(),
                    amount: 5,
                    measurement_unit: "pcs".into()
                },
            ]
        );
    }

    #[test]
    fn test_same_name_different_unit_kept_apart() {
        let db = testutil::open();
        let user = testutil::user(&db, "alice");
        let tag = db.insert_tag("Baking", "#AA8800", "baking").unwrap().unwrap();
        let sugar_g = db.insert_ingredient("sugar", "g").unwrap().unwrap();
        let sugar_cup = db.insert_ingredient("sugar", "cup").unwrap().unwrap();

        let id = recipe(&db, user, tag, vec![(sugar_g, 100), (sugar_cup, 1)]);
        db.add_to_list(RecipeList::ShoppingCart, user, id).unwrap();

        assert_eq!(db.shopping_list(user).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_cart_and_idempotence() {
        let db = testutil::open();
        let user = testutil::user(&db, "alice");
        assert_eq!(db.shopping_list(user).unwrap().count(), 0);

        let tag = db.insert_tag("Soup", "#123456", "soup").unwrap().unwrap();
        let leek = db.insert_ingredient("leek", "pcs").unwrap().unwrap();
        let id = recipe(&db, user, tag, vec![(leek, 2)]);
        db.add_to_list(RecipeList::ShoppingCart, user, id).unwrap();

        let first: Vec<_> = db.shopping_list(user).unwrap().collect();
        let second: Vec<_> = db.shopping_list(user).unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render() {
        let items = vec![ShoppingItem {
            name: "Tomato".into(),
            amount: 5,
            measurement_unit: "pcs".into(),
        }];
        assert_eq!(render(items), "Tomato - 5 pcs\n");
        assert_eq!(render(Vec::new()), "");
    }
}
