use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::authenticate;
use crate::state::AppState;
use crate::{auth, ingredients, recipes, tags, users};

/// Base64 images inflate by a third on the wire.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Build the application router: the JSON API under `/api` and stored
/// images under `/media`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", get(users::list_users).post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/set_password", post(auth::set_password))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/auth/token/login", post(auth::login))
        .route("/tags", get(tags::list_tags))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/ingredients", get(ingredients::list_ingredients))
        .route("/ingredients/{id}", get(ingredients::get_ingredient))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/{id}/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    let media = ServeDir::new(state.media.root());

    Router::new()
        .nest("/api", api)
        .nest_service("/media", media)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use foodgram_db::Database;
    use foodgram_types::limits::Limits;

    use super::*;
    use crate::images::MediaStore;
    use crate::state::AppStateInner;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    struct TestApp {
        state: AppState,
        _dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open(&dir.path().join("test.db")).unwrap();
            let state = Arc::new(AppStateInner {
                db,
                jwt_secret: "test-secret".into(),
                token_ttl: chrono::Duration::days(1),
                limits: Limits::default(),
                media: MediaStore::new(dir.path().join("media")),
            });
            Self { state, _dir: dir }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let body = match body {
                Some(json) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let resp = router(self.state.clone())
                .oneshot(req.body(body).unwrap())
                .await
                .unwrap();
            let status = resp.status();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            (status, bytes.to_vec())
        }

        async fn json(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, bytes) = self.send(method, uri, token, body).await;
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        /// Register and log in; returns (user id, token).
        async fn sign_up(&self, name: &str) -> (i64, String) {
            let email = format!("{}@example.com", name);
            let (status, user) = self
                .json(
                    Method::POST,
                    "/api/users",
                    None,
                    Some(json!({
                        "email": email,
                        "username": name,
                        "first_name": "Test",
                        "last_name": "Cook",
                        "password": "s3cret-pass",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", user);

            let (status, login) = self
                .json(
                    Method::POST,
                    "/api/auth/token/login",
                    None,
                    Some(json!({ "email": email, "password": "s3cret-pass" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            (
                user["id"].as_i64().unwrap(),
                login["auth_token"].as_str().unwrap().to_string(),
            )
        }

        fn seed(&self) -> (i64, i64) {
            let tag = self.state.db.insert_tag("Breakfast", "#E26C2D", "breakfast").unwrap().unwrap();
            let eggs = self.state.db.insert_ingredient("Eggs", "pcs").unwrap().unwrap();
            (tag, eggs)
        }

        async fn create_recipe(&self, token: &str, tag: i64, ingredient: i64, amount: i64) -> Value {
            let (status, recipe) = self
                .json(
                    Method::POST,
                    "/api/recipes",
                    Some(token),
                    Some(json!({
                        "ingredients": [{ "id": ingredient, "amount": amount }],
                        "tags": [tag],
                        "image": PIXEL,
                        "name": "Omelette",
                        "text": "Whisk and fry.",
                        "cooking_time": 10,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", recipe);
            recipe
        }
    }

    #[tokio::test]
    async fn test_create_recipe_requires_auth() {
        let app = TestApp::new();
        let (status, body) = app
            .json(Method::POST, "/api/recipes", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_input_returns_json_errors() {
        let app = TestApp::new();
        let (tag, eggs) = app.seed();
        let (_, token) = app.sign_up("chef").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/recipes",
                Some(&token),
                Some(json!({
                    "ingredients": [{ "id": eggs, "amount": 1 }],
                    "tags": [tag],
                    "image": PIXEL,
                    "name": "No time",
                    "text": "Missing cooking time.",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].as_str().unwrap().contains("cooking_time"));

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/token/login",
                None,
                Some(json!({ "email": "chef@example.com", "password": 12345678 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].is_string());

        for uri in [
            "/api/recipes?page=abc",
            "/api/recipes/notanid",
            "/api/users?limit=many",
            "/api/ingredients/1.5",
        ] {
            let (status, body) = app.json(Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["errors"].is_string(), "{}", uri);
        }

        let (status, body) = app
            .json(Method::GET, &format!("/api/recipes?page={}", i64::MAX), None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].as_str().unwrap().starts_with("page must be at most"));
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::GET, "/api/recipes", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_login() {
        let app = TestApp::new();
        app.sign_up("ann").await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/token/login",
                None,
                Some(json!({ "email": "ann@example.com", "password": "wrong-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unable to log in with provided credentials");
    }

    #[tokio::test]
    async fn test_recipe_lifecycle() {
        let app = TestApp::new();
        let (tag, eggs) = app.seed();
        let (author_id, token) = app.sign_up("chef").await;

        let recipe = app.create_recipe(&token, tag, eggs, 3).await;
        let id = recipe["id"].as_i64().unwrap();
        assert_eq!(recipe["author"]["id"], author_id);
        assert_eq!(recipe["tags"][0]["slug"], "breakfast");
        assert_eq!(recipe["ingredients"][0]["amount"], 3);
        let image = recipe["image"].as_str().unwrap().to_string();
        assert!(image.starts_with("/media/recipes/"));

        // The stored image is served back
        let (status, bytes) = app.send(Method::GET, &image, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!bytes.is_empty());

        // Anonymous readers see it without viewer flags
        let (status, anon) = app
            .json(Method::GET, &format!("/api/recipes/{}", id), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(anon["is_favorited"], false);

        let (status, updated) = app
            .json(
                Method::PATCH,
                &format!("/api/recipes/{}", id),
                Some(&token),
                Some(json!({
                    "ingredients": [{ "id": eggs, "amount": 4 }],
                    "tags": [tag],
                    "cooking_time": 12,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", updated);
        assert_eq!(updated["cooking_time"], 12);
        assert_eq!(updated["name"], "Omelette");
        assert_eq!(updated["ingredients"][0]["amount"], 4);

        let (_, other) = app.sign_up("critic").await;
        let (status, _) = app
            .send(Method::DELETE, &format!("/api/recipes/{}", id), Some(&other), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(Method::DELETE, &format!("/api/recipes/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app
            .json(Method::GET, &format!("/api/recipes/{}", id), None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Recipe not found");
    }

    #[tokio::test]
    async fn test_invalid_recipe_is_rejected() {
        let app = TestApp::new();
        let (tag, eggs) = app.seed();
        let (_, token) = app.sign_up("chef").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/recipes",
                Some(&token),
                Some(json!({
                    "ingredients": [{ "id": eggs, "amount": 1 }, { "id": eggs, "amount": 2 }],
                    "tags": [tag],
                    "image": PIXEL,
                    "name": "Twice",
                    "text": "Eggs, twice.",
                    "cooking_time": 5,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].as_str().unwrap().contains("duplicate ingredient"));
    }

    #[tokio::test]
    async fn test_favorite_twice_and_shopping_list() {
        let app = TestApp::new();
        let (tag, eggs) = app.seed();
        let (_, token) = app.sign_up("chef").await;
        let first = app.create_recipe(&token, tag, eggs, 3).await["id"].as_i64().unwrap();
        let second = app.create_recipe(&token, tag, eggs, 2).await["id"].as_i64().unwrap();

        let favorite = format!("/api/recipes/{}/favorite", first);
        let (status, short) = app.json(Method::POST, &favorite, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(short["id"], first);

        let (status, body) = app.json(Method::POST, &favorite, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"].as_str().unwrap().contains("already favorited"));

        let (status, page) = app
            .json(Method::GET, "/api/recipes?is_favorited=1", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);

        for id in [first, second] {
            let (status, _) = app
                .send(Method::POST, &format!("/api/recipes/{}/shopping_cart", id), Some(&token), None)
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, bytes) = app
            .send(Method::GET, "/api/recipes/download_shopping_cart", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(bytes).unwrap(), "Eggs - 5 pcs\n");

        let (status, _) = app
            .send(Method::DELETE, &favorite, Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.json(Method::DELETE, &favorite, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], "Recipe is not favorited");
    }

    #[tokio::test]
    async fn test_subscriptions() {
        let app = TestApp::new();
        let (tag, eggs) = app.seed();
        let (chef_id, chef) = app.sign_up("chef").await;
        let (fan_id, fan) = app.sign_up("fan").await;
        app.create_recipe(&chef, tag, eggs, 1).await;
        app.create_recipe(&chef, tag, eggs, 2).await;

        let subscribe = format!("/api/users/{}/subscribe?recipes_limit=1", chef_id);
        let (status, author) = app.json(Method::POST, &subscribe, Some(&fan), None).await;
        assert_eq!(status, StatusCode::CREATED, "{}", author);
        assert_eq!(author["is_subscribed"], true);
        assert_eq!(author["recipes"].as_array().unwrap().len(), 1);
        assert_eq!(author["recipes_count"], 2);

        let (status, _) = app.json(Method::POST, &subscribe, Some(&fan), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json(Method::POST, &format!("/api/users/{}/subscribe", fan_id), Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], "You cannot subscribe to yourself");

        let (status, page) = app
            .json(Method::GET, "/api/users/subscriptions", Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["username"], "chef");

        let (_, viewed) = app
            .json(Method::GET, &format!("/api/users/{}", chef_id), Some(&fan), None)
            .await;
        assert_eq!(viewed["is_subscribed"], true);

        let (status, me) = app.json(Method::GET, "/api/users/me", Some(&fan), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], fan_id);
    }

    #[tokio::test]
    async fn test_tags_and_ingredient_search() {
        let app = TestApp::new();
        app.seed();
        app.state.db.insert_ingredient("Eggplant", "g").unwrap();
        app.state.db.insert_ingredient("Flour", "g").unwrap();

        let (status, tags) = app.json(Method::GET, "/api/tags", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags.as_array().unwrap().len(), 1);

        let (status, found) = app
            .json(Method::GET, "/api/ingredients?name=egg", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = found
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Eggplant", "Eggs"]);
    }

    #[tokio::test]
    async fn test_set_password() {
        let app = TestApp::new();
        let (_, token) = app.sign_up("ann").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/users/set_password",
                Some(&token),
                Some(json!({ "new_password": "another-pass", "current_password": "s3cret-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/token/login",
                None,
                Some(json!({ "email": "ann@example.com", "password": "another-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}
