use serde::{Deserialize, Serialize};

use crate::models::{RecipeIngredient, Tag};

// -- JWT Claims --

/// JWT claims issued on login and checked by the API's auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// An author the caller follows, with a preview of their recipes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: i64,
}

// -- Recipes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAmountRequest {
    pub id: i64,
    pub amount: i64,
}

/// Body of `POST /recipes`. `image` is a base64 data URL.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipeRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountRequest>,
    #[serde(default)]
    pub tags: Vec<i64>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Body of `PATCH /recipes/{id}`.
///
/// Tags and ingredients are always replaced wholesale, so they are required
/// in practice; leaving them out fails validation rather than keeping the
/// old sets.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecipeRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountRequest>,
    #[serde(default)]
    pub tags: Vec<i64>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub pub_date: chrono::DateTime<chrono::Utc>,
}

/// Compact recipe view used by favorites, cart and subscription listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

// -- Pagination --

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
