/// Database row and input types. These map directly to SQLite rows and are
/// kept distinct from the foodgram-types API models.

pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// A user as seen by a viewer. `is_subscribed` is false for anonymous
/// viewers and for the user looking at themselves.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

pub struct CredentialsRow {
    pub id: i64,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientRow {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// A recipe with everything needed to render it for one viewer.
#[derive(Debug, Clone)]
pub struct RecipeRow {
    pub id: i64,
    pub author: UserRow,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub pub_date: String,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub tags: Vec<TagRow>,
    pub ingredients: Vec<RecipeIngredientRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeShortRow {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// A followed author with a preview of their recipes.
pub struct SubscriptionRow {
    pub author: UserRow,
    pub recipes: Vec<RecipeShortRow>,
    pub recipes_count: i64,
}

// -- Recipe composition inputs --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: i64,
    pub amount: i64,
}

/// A recipe to create. `image` is the stored media path.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// An update to an existing recipe. Scalars change only when `Some`;
/// tags and ingredient lines are always replaced.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<i64>,
    /// Tag slugs; a recipe matches if it carries any of them.
    pub tags: Vec<String>,
    pub favorited_only: bool,
    pub in_cart_only: bool,
    pub limit: i64,
    pub offset: i64,
}

// -- Shopping list --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub amount: i64,
    pub measurement_unit: String,
}
