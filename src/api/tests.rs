#![allow(clippy::unwrap_used)]

use super::*;
use crate::{
    entities::{auth_token, user},
    errors::Result,
    media::{EncodedImage, LocalMediaStore},
    test_utils::*,
};
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://testserver";
const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

struct TestApp {
    state: AppState,
    // Kept alive for the duration of the test
    _media_dir: TempDir,
}

impl TestApp {
    async fn new() -> Result<Self> {
        let media_dir = tempfile::tempdir()?;
        let settings = Settings {
            bind_addr: "127.0.0.1:0".to_string(),
            public_url: PUBLIC_URL.to_string(),
            media_root: media_dir.path().to_path_buf(),
            seed_config: PathBuf::from("config.toml"),
        };
        let media = LocalMediaStore::new(
            media_dir.path().to_path_buf(),
            settings.absolute_url("/media"),
        );
        let state = AppState {
            db: Arc::new(setup_test_db().await?),
            settings: Arc::new(settings),
            media: Arc::new(media),
        };
        Ok(Self {
            state,
            _media_dir: media_dir,
        })
    }

    fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Creates a user and a token for them without going through login.
    async fn user_with_token(&self, username: &str) -> Result<(user::Model, String)> {
        let account = create_test_user(self.db(), username).await?;
        let key = format!("{username:0<40}");
        auth_token::ActiveModel {
            key: Set(key.clone()),
            user_id: Set(account.id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.db())
        .await?;
        Ok((account, key))
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        router(self.state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

/// Stores files normally but can never remove them.
struct UndeletableStore(LocalMediaStore);

#[async_trait]
impl MediaStore for UndeletableStore {
    async fn save(&self, folder: &str, image: &EncodedImage) -> Result<String> {
        self.0.save(folder, image).await
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Err(std::io::Error::other("read-only media volume").into())
    }

    fn url(&self, path: &str) -> String {
        self.0.url(path)
    }
}

fn recipe_body(ingredients: Value, tags: Value) -> Value {
    json!({
        "ingredients": ingredients,
        "tags": tags,
        "image": PNG_DATA_URL,
        "name": "Pancakes",
        "text": "Mix and fry.",
        "cooking_time": 15
    })
}

#[tokio::test]
async fn test_register_login_and_me() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, created) = app
        .json(
            Method::POST,
            "/api/users/",
            None,
            Some(json!({
                "email": "ada@example.com",
                "username": "ada",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "password": "correct-horse"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], "ada");
    assert!(created.get("password").is_none());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/token/login/",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("non_field_errors").is_some());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/token/login/",
            None,
            Some(json!({ "email": "ada@example.com", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["auth_token"].as_str().unwrap().to_string();

    let (status, me) = app.json(Method::GET, "/api/users/me/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["is_subscribed"], false);

    let (status, _) = app.json(Method::POST, "/api/auth/token/logout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.json(Method::GET, "/api/users/me/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_missing_and_invalid_credentials() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, _) = app.json(Method::GET, "/api/users/me/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json(Method::GET, "/api/recipes/", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(Method::POST, "/api/recipes/", None, Some(recipe_body(json!([]), json!([]))))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_create_then_get_round_trips() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.user_with_token("chef").await?;
    let flour = create_test_ingredient(app.db(), "flour", "g").await?;
    let sugar = create_test_ingredient(app.db(), "sugar", "g").await?;
    let tag = create_test_tag(app.db(), "Breakfast", "breakfast").await?;

    let (status, created) = app
        .json(
            Method::POST,
            "/api/recipes/",
            Some(&token),
            Some(recipe_body(
                json!([{ "id": sugar.id, "amount": 20 }, { "id": flour.id, "amount": 200 }]),
                json!([tag.id]),
            )),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    let ids: Vec<i64> = created["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![sugar.id, flour.id]);

    let (status, fetched) = app.json(Method::GET, &format!("/api/recipes/{id}/"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Pancakes");
    assert_eq!(fetched["text"], "Mix and fry.");
    assert_eq!(fetched["cooking_time"], 15);
    assert_eq!(
        fetched["ingredients"],
        json!([
            { "id": sugar.id, "name": "sugar", "measurement_unit": "g", "amount": 20 },
            { "id": flour.id, "name": "flour", "measurement_unit": "g", "amount": 200 }
        ])
    );
    assert_eq!(fetched["tags"], json!([{ "id": tag.id, "name": "Breakfast", "slug": "breakfast" }]));
    assert_eq!(fetched["author"]["username"], "chef");

    let image_url = fetched["image"].as_str().unwrap();
    assert!(image_url.starts_with("http://testserver/media/recipes/"));
    let media_path = image_url.trim_start_matches(PUBLIC_URL);
    let response = app.send(Method::GET, media_path, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_bad_payloads() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.user_with_token("chef").await?;
    let tag = create_test_tag(app.db(), "Breakfast", "breakfast").await?;

    let (status, body) = app
        .json(Method::POST, "/api/recipes/", Some(&token), Some(recipe_body(json!([]), json!([tag.id]))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("ingredients").is_some());

    let (status, _) = app
        .json(Method::POST, "/api/recipes/", Some(&token), Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_editing_anothers_recipe_is_forbidden() -> Result<()> {
    let app = TestApp::new().await?;
    let (author, _) = app.user_with_token("chef").await?;
    let (_, stranger_token) = app.user_with_token("stranger").await?;
    let recipe = create_test_recipe(app.db(), author.id, "Soup").await?;
    let tag = create_test_tag(app.db(), "Dinner", "dinner").await?;
    let flour = create_test_ingredient(app.db(), "flour", "g").await?;

    let (status, _) = app
        .json(
            Method::PATCH,
            &format!("/api/recipes/{}/", recipe.id),
            Some(&stranger_token),
            Some(json!({
                "ingredients": [{ "id": flour.id, "amount": 1 }],
                "tags": [tag.id],
                "name": "Mine now"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(Method::DELETE, &format!("/api/recipes/{}/", recipe.id), Some(&stranger_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_favorite_toggle() -> Result<()> {
    let app = TestApp::new().await?;
    let (author, token) = app.user_with_token("chef").await?;
    let recipe = create_test_recipe(app.db(), author.id, "Soup").await?;
    let uri = format!("/api/recipes/{}/favorite/", recipe.id);

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("errors").is_some());

    let (status, body) = app.json(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], recipe.id);
    assert_eq!(body["name"], "Soup");
    assert_eq!(body["cooking_time"], 10);

    let (status, _) = app.json(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = app
        .json(Method::GET, "/api/recipes/?is_favorited=1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["results"][0]["is_favorited"], true);

    let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::POST, "/api/recipes/9999/favorite/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_download_shopping_cart_sums_amounts() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.user_with_token("shopper").await?;
    let flour = create_test_ingredient(app.db(), "flour", "g").await?;
    let tag = create_test_tag(app.db(), "Baking", "baking").await?;

    for amount in [100, 50] {
        let (status, created) = app
            .json(
                Method::POST,
                "/api/recipes/",
                Some(&token),
                Some(recipe_body(json!([{ "id": flour.id, "amount": amount }]), json!([tag.id]))),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/recipes/{}/shopping_cart/", created["id"]);
        let (status, _) = app.json(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = app
        .send(Method::GET, "/api/recipes/download_shopping_cart/", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"shopping_cart.txt\""
    );
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "flour (g) — 150\n");
    Ok(())
}

#[tokio::test]
async fn test_short_link_is_stable_and_redirects() -> Result<()> {
    let app = TestApp::new().await?;
    let (author, _) = app.user_with_token("chef").await?;
    let recipe = create_test_recipe(app.db(), author.id, "Soup").await?;
    let uri = format!("/api/recipes/{}/get-link/", recipe.id);

    let (status, first) = app.json(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.json(Method::GET, &uri, None, None).await;
    assert_eq!(first["short-link"], second["short-link"]);

    let link = first["short-link"].as_str().unwrap();
    assert!(link.starts_with("http://testserver/s/"));
    let response = app
        .send(Method::GET, link.trim_start_matches(PUBLIC_URL), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("http://testserver/api/recipes/{}/", recipe.id).as_str()
    );

    let response = app.send(Method::GET, "/s/zzzzzz/", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_subscriptions() -> Result<()> {
    let app = TestApp::new().await?;
    let (ada, token) = app.user_with_token("ada").await?;
    let (bob, _) = app.user_with_token("bob").await?;
    for name in ["One", "Two", "Three"] {
        create_test_recipe(app.db(), bob.id, name).await?;
    }

    let (status, body) = app
        .json(Method::POST, &format!("/api/users/{}/subscribe/", ada.id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("errors").is_some());

    let subscribe = format!("/api/users/{}/subscribe/?recipes_limit=2", bob.id);
    let (status, body) = app.json(Method::POST, &subscribe, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);
    assert_eq!(body["recipes_count"], 3);

    let (status, _) = app.json(Method::POST, &subscribe, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .json(Method::GET, "/api/users/subscriptions/?recipes_limit=1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["recipes"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .json(Method::GET, "/api/users/subscriptions/?recipes_limit=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("recipes_limit").is_some());

    let (status, profile) = app
        .json(Method::GET, &format!("/api/users/{}/", bob.id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["is_subscribed"], true);
    Ok(())
}

#[tokio::test]
async fn test_ingredient_prefix_search_and_tags() -> Result<()> {
    let app = TestApp::new().await?;
    for name in ["apple", "apricot", "banana", "grape apple"] {
        create_test_ingredient(app.db(), name, "g").await?;
    }
    let (status, body) = app.json(Method::GET, "/api/ingredients/?name=ap", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["apple", "apricot"]);

    let (status, body) = app.json(Method::GET, "/api/ingredients/?name=_p", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let tag = create_test_tag(app.db(), "Lunch", "lunch").await?;
    let (status, body) = app.json(Method::GET, &format!("/api/tags/{}/", tag.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "lunch");
    let (status, _) = app.json(Method::GET, "/api/tags/9999/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_recipe_pagination_links() -> Result<()> {
    let app = TestApp::new().await?;
    let (author, _) = app.user_with_token("chef").await?;
    for name in ["One", "Two", "Three"] {
        create_test_recipe(app.db(), author.id, name).await?;
    }

    let (status, page) = app
        .json(Method::GET, "/api/recipes/?limit=2&tags=test", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["results"][0]["name"], "Three");
    assert_eq!(page["next"], "http://testserver/api/recipes/?limit=2&tags=test&page=2");
    assert_eq!(page["previous"], Value::Null);

    let (status, _) = app.json(Method::GET, "/api/recipes/?page=5", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .json(Method::GET, "/api/recipes/?tags=test&tags=nope", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["tags"][0].as_str().unwrap().contains("nope"));
    Ok(())
}

#[tokio::test]
async fn test_avatar_put_and_delete() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.user_with_token("ada").await?;

    let (status, _) = app.json(Method::DELETE, "/api/users/me/avatar/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .json(Method::PUT, "/api/users/me/avatar/", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("avatar").is_some());

    let (status, body) = app
        .json(Method::PUT, "/api/users/me/avatar/", Some(&token), Some(json!({ "avatar": PNG_DATA_URL })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["avatar"].as_str().unwrap().starts_with("http://testserver/media/users/"));

    let (status, _) = app.json(Method::DELETE, "/api/users/me/avatar/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_non_numeric_ids_are_json_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, token) = app.user_with_token("chef").await?;

    let response = app.send(Method::GET, "/api/recipes/abc/", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let (status, body) = app.json(Method::GET, "/api/recipes/abc/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("abc"));

    for uri in ["/api/users/x1/", "/api/tags/one/", "/api/ingredients/1.5/"] {
        let (status, body) = app.json(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.get("detail").is_some(), "{uri}");
    }

    let (status, _) = app
        .json(Method::POST, "/api/recipes/abc/favorite/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_failed_cleanup_keeps_the_original_error() -> Result<()> {
    let mut app = TestApp::new().await?;
    let store = LocalMediaStore::new(app._media_dir.path().to_path_buf(), format!("{PUBLIC_URL}/media"));
    app.state.media = Arc::new(UndeletableStore(store));
    let (_, token) = app.user_with_token("chef").await?;
    let tag = create_test_tag(app.db(), "Breakfast", "breakfast").await?;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/recipes/",
            Some(&token),
            Some(recipe_body(json!([{ "id": 9999, "amount": 1 }]), json!([tag.id]))),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("ingredients").is_some());

    // Replacing an avatar still succeeds when the old file cannot be removed
    for _ in 0..2 {
        let (status, _) = app
            .json(Method::PUT, "/api/users/me/avatar/", Some(&token), Some(json!({ "avatar": PNG_DATA_URL })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    Ok(())
}
