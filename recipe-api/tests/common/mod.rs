//! Common test utilities for integration tests
//!
//! Provides shared infrastructure:
//! - Database connection and migrations (needs `DATABASE_URL`)
//! - A uniquely named user with a live token
//! - A temporary media root
//! - Request helpers that drive the router with `oneshot`
//!
//! Every helper here is used by some test binaries and not others.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use recipe_api::app::{build_router, AppState};
use recipe_api::config::Config;
use recipe_shared::db::migrations::run_migrations;
use recipe_shared::models::auth_token::AuthToken;
use recipe_shared::models::user::{create_user, User, UserExtra};
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub media_dir: TempDir,
    pub user: User,
    pub token: String,
}

/// A user and their plaintext token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh user and media directory
    pub async fn new() -> anyhow::Result<Self> {
        let mut config = Config::from_env()?;

        let media_dir = tempfile::tempdir()?;
        config.media.root = media_dir.path().to_path_buf();

        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let TestUser { user, token } = create_test_user(&db).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            media_dir,
            user,
            token,
        })
    }

    /// Registers another user on the same database
    pub async fn other_user(&self) -> anyhow::Result<TestUser> {
        create_test_user(&self.db).await
    }

    /// Sends a request as the context's user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_json(&self.app, method, uri, Some(&self.token), body).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Creates a tag for the context's user and returns its id
    pub async fn create_tag(&self, name: &str) -> i64 {
        let (status, body) = self.post("/recipe/tags", serde_json::json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Creates an ingredient for the context's user and returns its id
    pub async fn create_ingredient(&self, name: &str) -> i64 {
        let (status, body) = self
            .post("/recipe/ingredients", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Creates a recipe with default fields merged with `overrides`
    pub async fn create_recipe(&self, overrides: Value) -> Value {
        let mut payload = serde_json::json!({
            "title": "Sample recipe",
            "time_minutes": 10,
            "price": "5.00",
        });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), overrides.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }

        let (status, body) = self.post("/recipe/recipes", payload).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    /// Cleans up test data
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        // Cascades to tokens, tags, ingredients and recipes
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Creates an active user with a unique email and issues a token
pub async fn create_test_user(db: &PgPool) -> anyhow::Result<TestUser> {
    let user = create_user(
        db,
        &unique_email(),
        TEST_PASSWORD,
        UserExtra {
            name: "Test User".to_string(),
            ..Default::default()
        },
    )
    .await?;

    let (_, token) = AuthToken::issue(db, user.id).await?;

    Ok(TestUser { user, token })
}

pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

/// Sends a JSON request and decodes the JSON response (Null if empty)
pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

/// Drives one request through the router
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, body)
}

/// Builds a `multipart/form-data` body with one file field
///
/// Returns the content type (with boundary) and the encoded body.
pub fn multipart_file(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("----recipe-test-{}", Uuid::new_v4().simple());

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// A small valid PNG
pub fn png_bytes() -> Vec<u8> {
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(10, 10, Rgb([10, 200, 10]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
