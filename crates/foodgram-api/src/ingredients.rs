use axum::extract::State;
use serde::Deserialize;

use foodgram_types::models::Ingredient;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

/// GET /ingredients
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let search = query.name.filter(|n| !n.trim().is_empty());
    let rows = blocking(&state, move |s| s.db.list_ingredients(search.as_deref())).await?;
    Ok(Json(rows.into_iter().map(convert::ingredient).collect()))
}

/// GET /ingredients/{id}
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    let row = blocking(&state, move |s| s.db.get_ingredient(ingredient_id)).await?;
    Ok(Json(convert::ingredient(row)))
}
