use axum::extract::State;

use foodgram_types::models::Tag;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, blocking};

/// GET /tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let rows = blocking(&state, |s| s.db.list_tags()).await?;
    Ok(Json(rows.into_iter().map(convert::tag).collect()))
}

/// GET /tags/{id}
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    let row = blocking(&state, move |s| s.db.get_tag(tag_id)).await?;
    Ok(Json(convert::tag(row)))
}
