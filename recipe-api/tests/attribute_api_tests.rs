/// Integration tests for the tag and ingredient endpoints
///
/// Both families share handlers, so most cases run against both paths.

mod common;

use axum::http::{Method, StatusCode};
use common::{send_json, TestContext};
use serde_json::{json, Value};

const PATHS: [&str; 2] = ["/recipe/tags", "/recipe/ingredients"];

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_login_required() {
    let ctx = TestContext::new().await.unwrap();

    for path in PATHS {
        let (status, _) = send_json(&ctx.app, Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");

        let (status, _) =
            send_json(&ctx.app, Method::POST, path, None, Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_retrieve_sorted_by_name_descending() {
    let ctx = TestContext::new().await.unwrap();

    for path in PATHS {
        for name in ["Dessert", "Vegan", "Breakfast"] {
            let (status, _) = ctx.post(path, json!({ "name": name })).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = ctx.get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Vegan", "Dessert", "Breakfast"]);
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_limited_to_user() {
    let ctx = TestContext::new().await.unwrap();
    let other = ctx.other_user().await.unwrap();

    for path in PATHS {
        let (status, _) = send_json(
            &ctx.app,
            Method::POST,
            path,
            Some(&other.token),
            Some(json!({ "name": "Fruity" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = if path.ends_with("tags") {
            ctx.create_tag("Comfort Food").await
        } else {
            ctx.create_ingredient("Salt").await
        };

        let (status, body) = ctx.get(path).await;
        assert_eq!(status, StatusCode::OK);

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], id);
    }

    recipe_shared::models::user::User::delete(&ctx.db, other.user.id)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_create_successful() {
    let ctx = TestContext::new().await.unwrap();

    for path in PATHS {
        let (status, body) = ctx.post(path, json!({ "name": "Cabbage" })).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Cabbage");
        assert!(body["id"].is_i64());
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_create_invalid() {
    let ctx = TestContext::new().await.unwrap();

    for path in PATHS {
        let (status, body) = ctx.post(path, json!({ "name": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");

        let (status, body) = ctx.post(path, json!({ "name": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");

        let (status, _) = ctx.post(path, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = ctx.get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_rename_and_delete() {
    let ctx = TestContext::new().await.unwrap();

    let tag = ctx.create_tag("Old").await;
    let recipe = ctx.create_recipe(json!({ "tags": [tag] })).await;

    let (status, body) = ctx
        .patch(&format!("/recipe/tags/{}", tag), json!({ "name": "New" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": tag, "name": "New" }));

    let (status, _) = ctx
        .patch(&format!("/recipe/tags/{}", tag), json!({ "name": " \t " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.delete(&format!("/recipe/tags/{}", tag)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Recipe survives without the tag
    let (status, body) = ctx.get(&format!("/recipe/recipes/{}", recipe["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!([]));

    let (status, _) = ctx.delete(&format!("/recipe/tags/{}", tag)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_cannot_touch_other_users_records() {
    let ctx = TestContext::new().await.unwrap();
    let other = ctx.other_user().await.unwrap();

    let (_, body) = send_json(
        &ctx.app,
        Method::POST,
        "/recipe/ingredients",
        Some(&other.token),
        Some(json!({ "name": "Theirs" })),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let (status, _) = ctx
        .patch(&format!("/recipe/ingredients/{}", id), json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.delete(&format!("/recipe/ingredients/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send_json(
        &ctx.app,
        Method::GET,
        "/recipe/ingredients",
        Some(&other.token),
        None,
    )
    .await;
    assert_eq!(names(&body), vec!["Theirs"]);

    recipe_shared::models::user::User::delete(&ctx.db, other.user.id)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_filter_assigned_only() {
    let ctx = TestContext::new().await.unwrap();

    let breakfast = ctx.create_tag("Breakfast").await;
    ctx.create_tag("Lunch").await;
    let eggs = ctx.create_ingredient("Eggs").await;
    ctx.create_ingredient("Turkey").await;

    ctx.create_recipe(json!({
        "title": "Coriander eggs on toast",
        "tags": [breakfast],
        "ingredients": [eggs],
    }))
    .await;

    let (status, body) = ctx.get("/recipe/tags?assigned_only=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Breakfast"]);

    let (_, body) = ctx.get("/recipe/ingredients?assigned_only=1").await;
    assert_eq!(names(&body), vec!["Eggs"]);

    let (_, body) = ctx.get("/recipe/tags?assigned_only=0").await;
    assert_eq!(names(&body), vec!["Lunch", "Breakfast"]);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_filter_assigned_unique() {
    let ctx = TestContext::new().await.unwrap();

    let breakfast = ctx.create_tag("Breakfast").await;
    ctx.create_tag("Lunch").await;

    ctx.create_recipe(json!({ "title": "Pancakes", "tags": [breakfast] }))
        .await;
    ctx.create_recipe(json!({ "title": "Porridge", "tags": [breakfast] }))
        .await;

    let (_, body) = ctx.get("/recipe/tags?assigned_only=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_assigned_only_rejects_other_values() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.get("/recipe/tags?assigned_only=yes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}
