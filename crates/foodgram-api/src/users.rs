use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use foodgram_db::models::NewUser;
use foodgram_types::api::{
    Page, RegisterRequest, RegisterResponse, SubscriptionResponse, UserResponse,
};

use crate::auth::{check_password_strength, hash_password};
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::middleware::{AuthUser, Viewer};
use crate::pagination::{PageRequest, paginate};
use crate::state::{AppState, blocking};

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_USER_FIELD_LENGTH: usize = 150;

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();
    validate_registration(&email, &username, &req)?;
    check_password_strength(&req.password)?;

    let user = NewUser {
        email,
        username,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        password_hash: hash_password(&req.password)?,
    };

    let (id, user) = blocking(&state, move |s| {
        let id = s.db.create_user(&user)?;
        Ok((id, user))
    })
    .await?;

    info!("Registered user {} ({})", id, user.username);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

fn validate_registration(email: &str, username: &str, req: &RegisterRequest) -> Result<(), ApiError> {
    if email.len() > MAX_EMAIL_LENGTH || !is_plausible_email(email) {
        return Err(ApiError::validation("Enter a valid email address"));
    }
    if username.is_empty() || username.chars().count() > MAX_USER_FIELD_LENGTH {
        return Err(ApiError::validation(format!(
            "username must be 1 to {} characters",
            MAX_USER_FIELD_LENGTH
        )));
    }
    if username == "me" {
        return Err(ApiError::validation("username 'me' is reserved"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        warn!("Rejected username '{}'", username);
        return Err(ApiError::validation(
            "username may only contain letters, digits and @/./+/-/_",
        ));
    }
    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        let value = value.trim();
        if value.is_empty() || value.chars().count() > MAX_USER_FIELD_LENGTH {
            return Err(ApiError::validation(format!(
                "{} must be 1 to {} characters",
                field, MAX_USER_FIELD_LENGTH
            )));
        }
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let page = page.validate()?;
    let viewer_id = viewer.id();
    let (rows, total) = blocking(&state, move |s| {
        s.db.list_users(viewer_id, page.limit(), page.offset())
    })
    .await?;

    let results = rows.into_iter().map(convert::user).collect();
    Ok(Json(paginate(results, total, page, &uri)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let viewer_id = viewer.id();
    let row = blocking(&state, move |s| s.db.get_user(user_id, viewer_id)).await?;
    Ok(Json(convert::user(row)))
}

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = caller.id();
    let row = blocking(&state, move |s| s.db.get_user(user_id, Some(user_id))).await?;
    Ok(Json(convert::user(row)))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Cap on the recipe preview per author.
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    fn recipes_limit(&self) -> Result<Option<i64>, ApiError> {
        match self.recipes_limit {
            Some(n) if n < 0 => Err(ApiError::validation("recipes_limit must not be negative")),
            other => Ok(other),
        }
    }
}

/// GET /users/subscriptions
pub async fn subscriptions(
    State(state): State<AppState>,
    caller: AuthUser,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionResponse>>, ApiError> {
    let page = PageRequest::new(query.page, query.limit).validate()?;
    let recipes_limit = query.recipes_limit()?;
    let user_id = caller.id();

    let (rows, total) = blocking(&state, move |s| {
        s.db.list_subscriptions(user_id, page.limit(), page.offset(), recipes_limit)
    })
    .await?;

    let results = rows
        .into_iter()
        .map(|row| convert::subscription(&state.media, row))
        .collect();
    Ok(Json(paginate(results, total, page, &uri)))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<i64>,
}

/// POST /users/{id}/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(author_id): Path<i64>,
    Query(query): Query<SubscribeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller.id();
    let recipes_limit = query.recipes_limit.filter(|n| *n >= 0);

    let row = blocking(&state, move |s| {
        s.db.subscribe(user_id, author_id)?;
        s.db.get_subscription(user_id, author_id, recipes_limit)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::subscription(&state.media, row))))
}

/// DELETE /users/{id}/subscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(author_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller.id();
    blocking(&state, move |s| s.db.unsubscribe(user_id, author_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
