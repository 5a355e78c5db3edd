#![allow(dead_code)]

use std::sync::Arc;

use printpdf::BuiltinFont;
use serde_json::{json, Value};
use tempfile::TempDir;
use warp::http::StatusCode;

use foodgram::{
    document::FontSource,
    jwt::SessionKeys,
    media::MediaStorage,
    memory::MemoryStore,
    routes::routes,
    schema::{NewIngredient, UserRole},
    state::State,
    store::Store,
    views::catalog,
};

pub const GIF: &str = "data:image/gif;base64,R0lGODlhAQABAAAAACH5BAEKAAEALAAAAAABAAEAAAICTAEAOw==";

pub const FLOUR: i64 = 1;
pub const SUGAR: i64 = 2;
pub const APPLE: i64 = 3;
pub const GRAPE: i64 = 4;
pub const MILK: i64 = 5;

pub const BREAKFAST: i64 = 1;
pub const LUNCH: i64 = 2;
pub const DINNER: i64 = 3;

pub struct TestApp {
    pub state: State,
    pub store: Arc<MemoryStore>,
    pub media: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: warp::http::HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

pub async fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    catalog::load_tags(store.as_ref()).await.unwrap();

    let ingredients = [
        ("Flour", "g"),
        ("Sugar", "g"),
        ("Apple", "pcs"),
        ("Grape", "g"),
        ("Milk", "ml"),
    ]
    .into_iter()
    .map(|(name, unit)| NewIngredient {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    })
    .collect();
    catalog::load_ingredients(store.as_ref(), ingredients)
        .await
        .unwrap();

    let media = tempfile::tempdir().unwrap();
    let shared: Arc<dyn Store> = store.clone();
    let state = State::new(
        shared,
        MediaStorage::new(media.path(), "/media/"),
        SessionKeys::new(b"integration-secret", 1).unwrap(),
        FontSource::Builtin(BuiltinFont::Helvetica),
    );

    TestApp {
        state,
        store,
        media,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let api = routes(self.state.clone());

        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Token {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.reply(&api).await;
        Response {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.body().to_vec(),
        }
    }

    /// Registers `username` and returns its id and a session token.
    pub async fn user(&self, username: &str) -> (i64, String) {
        let registered = self
            .request(
                "POST",
                "/users/",
                None,
                Some(json!({
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "first_name": "Test",
                    "last_name": "User",
                    "password": "correct horse",
                })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.json());
        let id = registered.json()["id"].as_i64().unwrap();

        (id, self.login(username).await)
    }

    pub async fn login(&self, username: &str) -> String {
        let login = self
            .request(
                "POST",
                "/auth/token/login/",
                None,
                Some(json!({
                    "email": format!("{username}@example.com"),
                    "password": "correct horse",
                })),
            )
            .await;
        assert_eq!(login.status, StatusCode::CREATED);
        login.json()["auth_token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self, username: &str) -> (i64, String) {
        let (id, _) = self.user(username).await;
        self.store
            .set_role(id as i32, UserRole::Admin)
            .await
            .unwrap();
        (id, self.login(username).await)
    }

    pub async fn create_recipe(&self, token: &str, name: &str, ingredients: Value) -> Value {
        let response = self
            .request(
                "POST",
                "/recipes/",
                Some(token),
                Some(recipe_body(name, json!([LUNCH]), ingredients)),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        response.json()
    }

    pub fn media_files(&self) -> usize {
        std::fs::read_dir(self.media.path().join("recipes"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn recipe_body(name: &str, tags: Value, ingredients: Value) -> Value {
    json!({
        "name": name,
        "text": "Mix and bake.",
        "image": GIF,
        "cooking_time": 30,
        "tags": tags,
        "ingredients": ingredients,
    })
}

/// `(id, amount)` pairs of a recipe representation, in listed order.
pub fn amounts(recipe: &Value) -> Vec<(i64, i64)> {
    recipe["ingredients"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .map(|part| {
                    (
                        part["id"].as_i64().unwrap_or_default(),
                        part["amount"].as_i64().unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
