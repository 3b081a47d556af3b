use axum::{
    extract::{OriginalUri, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use foodgram_db::models::{IngredientAmount, NewRecipe, RecipeChanges, RecipeFilter};
use foodgram_db::queries::{RecipeList, render};
use foodgram_db::validation;
use foodgram_types::api::{
    CreateRecipeRequest, IngredientAmountRequest, Page, RecipeResponse, RecipeShortResponse,
    UpdateRecipeRequest,
};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, MultiQuery, Path};
use crate::middleware::{AuthUser, Viewer};
use crate::pagination::{PageRequest, paginate};
use crate::state::{AppState, blocking};

pub const SHOPPING_LIST_FILENAME: &str = "shopping-list.txt";

/// Recipe listing filters. `tags` may repeat: `?tags=lunch&tags=dinner`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true") | Some("True"))
}

fn ingredient_lines(lines: Vec<IngredientAmountRequest>) -> Vec<IngredientAmount> {
    lines
        .into_iter()
        .map(|line| IngredientAmount {
            ingredient_id: line.id,
            amount: line.amount,
        })
        .collect()
}

/// GET /recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    MultiQuery(query): MultiQuery<RecipeQuery>,
) -> Result<Json<Page<RecipeResponse>>, ApiError> {
    let page = PageRequest::new(query.page, query.limit).validate()?;
    let filter = RecipeFilter {
        author: query.author,
        tags: query.tags,
        favorited_only: flag(query.is_favorited.as_deref()),
        in_cart_only: flag(query.is_in_shopping_cart.as_deref()),
        limit: page.limit(),
        offset: page.offset(),
    };

    let viewer_id = viewer.id();
    let (rows, total) = blocking(&state, move |s| s.db.list_recipes(&filter, viewer_id)).await?;

    let results = rows
        .into_iter()
        .map(|row| convert::recipe(&state.media, row))
        .collect();
    Ok(Json(paginate(results, total, page, &uri)))
}

/// GET /recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(recipe_id): Path<i64>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let viewer_id = viewer.id();
    let row = blocking(&state, move |s| s.db.get_recipe(recipe_id, viewer_id)).await?;
    Ok(Json(convert::recipe(&state.media, row)))
}

/// POST /recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut recipe = NewRecipe {
        name: req.name.trim().to_string(),
        text: req.text,
        image: String::new(),
        cooking_time: req.cooking_time,
        tags: req.tags,
        ingredients: ingredient_lines(req.ingredients),
    };

    // Reject bad input before anything touches the disk
    validation::validate_new_recipe(&recipe, &state.limits)?;
    recipe.image = state.media.save_data_url(&req.image).await?;

    let author_id = caller.id();
    let image = recipe.image.clone();
    let created = blocking(&state, move |s| {
        let id = s.db.create_recipe(author_id, &recipe, &s.limits)?;
        s.db.get_recipe(id, Some(author_id))
    })
    .await;

    match created {
        Ok(row) => Ok((StatusCode::CREATED, Json(convert::recipe(&state.media, row)))),
        Err(e) => {
            state.media.remove(&image).await;
            Err(e)
        }
    }
}

/// PATCH /recipes/{id}
pub async fn update_recipe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let mut changes = RecipeChanges {
        name: req.name.map(|n| n.trim().to_string()),
        text: req.text,
        image: None,
        cooking_time: req.cooking_time,
        tags: req.tags,
        ingredients: ingredient_lines(req.ingredients),
    };
    validation::validate_changes(&changes, &state.limits)?;

    if let Some(data_url) = req.image.as_deref() {
        changes.image = Some(state.media.save_data_url(data_url).await?);
    }

    let caller_id = caller.id();
    let new_image = changes.image.clone();
    let updated = blocking(&state, move |s| {
        let replaced = s.db.update_recipe(recipe_id, caller_id, &changes, &s.limits)?;
        let row = s.db.get_recipe(recipe_id, Some(caller_id))?;
        Ok((replaced, row))
    })
    .await;

    match updated {
        Ok((replaced, row)) => {
            if let Some(old) = replaced {
                state.media.remove(&old).await;
            }
            Ok(Json(convert::recipe(&state.media, row)))
        }
        Err(e) => {
            if let Some(image) = new_image {
                state.media.remove(&image).await;
            }
            Err(e)
        }
    }
}

/// DELETE /recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let caller_id = caller.id();
    let image = blocking(&state, move |s| s.db.delete_recipe(recipe_id, caller_id)).await?;
    state.media.remove(&image).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to(
    state: AppState,
    list: RecipeList,
    user_id: i64,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeShortResponse>), ApiError> {
    let row = blocking(&state, move |s| {
        s.db.add_to_list(list, user_id, recipe_id)?;
        s.db.get_recipe_short(recipe_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(convert::recipe_short(&state.media, row))))
}

async fn remove_from(
    state: AppState,
    list: RecipeList,
    user_id: i64,
    recipe_id: i64,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |s| s.db.remove_from_list(list, user_id, recipe_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/{id}/favorite
pub async fn add_favorite(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    add_to(state, RecipeList::Favorites, caller.id(), recipe_id).await
}

/// DELETE /recipes/{id}/favorite
pub async fn remove_favorite(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    remove_from(state, RecipeList::Favorites, caller.id(), recipe_id).await
}

/// POST /recipes/{id}/shopping_cart
pub async fn add_to_cart(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    add_to(state, RecipeList::ShoppingCart, caller.id(), recipe_id).await
}

/// DELETE /recipes/{id}/shopping_cart
pub async fn remove_from_cart(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    remove_from(state, RecipeList::ShoppingCart, caller.id(), recipe_id).await
}

/// GET /recipes/download_shopping_cart
///
/// Plain-text list, one `name - amount unit` line per distinct ingredient.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller.id();
    let items = blocking(&state, move |s| s.db.shopping_list(user_id)).await?;
    let lines = items.len();
    let body = render(items);

    info!("User {} downloaded a shopping list with {} lines", user_id, lines);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        body,
    ))
}
