//! Row to response conversions. Image paths are turned into public URLs here.

use chrono::{DateTime, Utc};
use tracing::warn;

use foodgram_db::models::{
    IngredientRow, RecipeIngredientRow, RecipeRow, RecipeShortRow, SubscriptionRow, TagRow,
    UserRow,
};
use foodgram_types::api::{RecipeResponse, RecipeShortResponse, SubscriptionResponse, UserResponse};
use foodgram_types::models::{Ingredient, RecipeIngredient, Tag};

use crate::images::MediaStore;

pub fn user(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        email: row.email,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        is_subscribed: row.is_subscribed,
    }
}

pub fn tag(row: TagRow) -> Tag {
    Tag {
        id: row.id,
        name: row.name,
        color: row.color,
        slug: row.slug,
    }
}

pub fn ingredient(row: IngredientRow) -> Ingredient {
    Ingredient {
        id: row.id,
        name: row.name,
        measurement_unit: row.measurement_unit,
    }
}

fn recipe_ingredient(row: RecipeIngredientRow) -> RecipeIngredient {
    RecipeIngredient {
        id: row.ingredient_id,
        name: row.name,
        measurement_unit: row.measurement_unit,
        amount: row.amount,
    }
}

pub fn recipe(media: &MediaStore, row: RecipeRow) -> RecipeResponse {
    let pub_date = parse_timestamp(&row.pub_date).unwrap_or_else(|e| {
        warn!("Corrupt pub_date '{}' on recipe {}: {}", row.pub_date, row.id, e);
        DateTime::default()
    });

    RecipeResponse {
        id: row.id,
        tags: row.tags.into_iter().map(tag).collect(),
        author: user(row.author),
        ingredients: row.ingredients.into_iter().map(recipe_ingredient).collect(),
        is_favorited: row.is_favorited,
        is_in_shopping_cart: row.is_in_shopping_cart,
        name: row.name,
        image: media.url(&row.image),
        text: row.text,
        cooking_time: row.cooking_time,
        pub_date,
    }
}

pub fn recipe_short(media: &MediaStore, row: RecipeShortRow) -> RecipeShortResponse {
    RecipeShortResponse {
        id: row.id,
        name: row.name,
        image: media.url(&row.image),
        cooking_time: row.cooking_time,
    }
}

pub fn subscription(media: &MediaStore, row: SubscriptionRow) -> SubscriptionResponse {
    let SubscriptionRow {
        author,
        recipes,
        recipes_count,
    } = row;

    SubscriptionResponse {
        id: author.id,
        email: author.email,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: author.is_subscribed,
        recipes: recipes
            .into_iter()
            .map(|r| recipe_short(media, r))
            .collect(),
        recipes_count,
    }
}

/// SQLite writes `pub_date` as RFC 3339; rows written by hand through the
/// sqlite shell may use `YYYY-MM-DD HH:MM:SS` instead.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-01T12:30:00.123Z").unwrap();
        assert_eq!((rfc.year(), rfc.month(), rfc.day()), (2024, 3, 1));

        let plain = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(plain.hour(), 12);

        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_subscription_flattens_author() {
        let media = MediaStore::new("/tmp/media");
        let row = SubscriptionRow {
            author: UserRow {
                id: 7,
                email: "chef@example.com".into(),
                username: "chef".into(),
                first_name: "Julia".into(),
                last_name: "Child".into(),
                is_subscribed: true,
            },
            recipes: vec![RecipeShortRow {
                id: 1,
                name: "Omelette".into(),
                image: "recipes/a.png".into(),
                cooking_time: 5,
            }],
            recipes_count: 3,
        };

        let resp = subscription(&media, row);
        assert_eq!(resp.id, 7);
        assert!(resp.is_subscribed);
        assert_eq!(resp.recipes[0].image, "/media/recipes/a.png");
        assert_eq!(resp.recipes_count, 3);
    }
}
