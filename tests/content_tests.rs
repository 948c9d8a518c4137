use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use critiq::api::AppState;
use critiq::config::Config;
use critiq::models::user::Role;
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.token_secret = "integration-test-secret".to_string();

    let state = critiq::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    (critiq::api::router(state.clone()).await, state)
}

async fn seed_user(state: &Arc<AppState>, username: &str, role: Role) -> String {
    let user = state
        .shared
        .store
        .create_user(username, &format!("{username}@example.com"), role, false)
        .await
        .unwrap();
    state.shared.tokens.mint(&user).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Admin-side fixture: one category, one genre, one title. Returns the
/// title id.
async fn seed_title(app: &Router, admin: &str) -> i32 {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/categories",
            Some(admin),
            Some(serde_json::json!({"name": "Movies", "slug": "movies"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/genres",
            Some(admin),
            Some(serde_json::json!({"name": "Drama", "slug": "drama"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles",
            Some(admin),
            Some(serde_json::json!({
                "name": "The Green Mile",
                "year": 1999,
                "category": "movies",
                "genre": ["drama"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn test_catalog_reads_are_public() {
    let (app, _) = spawn_app().await;

    for uri in ["/api/v1/categories", "/api/v1/genres", "/api/v1/titles"] {
        let response = app
            .clone()
            .oneshot(request("GET", uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_catalog_writes_are_admin_only() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "plain", Role::User).await;
    let moderator = seed_user(&state, "mod", Role::Moderator).await;

    let payload = serde_json::json!({"name": "Books", "slug": "books"});

    let response = app
        .clone()
        .oneshot(request("POST", "/api/v1/categories", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for token in [&user, &moderator] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/v1/categories",
                Some(token),
                Some(payload.clone()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_title_lifecycle() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;

    let title_id = seed_title(&app, &admin).await;

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "The Green Mile");
    assert_eq!(json["data"]["rating"], serde_json::Value::Null);
    assert_eq!(json["data"]["category"]["slug"], "movies");
    assert_eq!(json["data"]["genre"][0]["slug"], "drama");

    // Filter by category slug.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/titles?category=movies", None, None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/titles?category=books", None, None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    // Future year rejected.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/api/v1/titles/{title_id}"),
            Some(&admin),
            Some(serde_json::json!({"year": 3000})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_uniqueness_and_rating() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;

    let reviewers = [
        (seed_user(&state, "r1", Role::User).await, 8),
        (seed_user(&state, "r2", Role::User).await, 6),
        (seed_user(&state, "r3", Role::User).await, 10),
    ];

    for (token, score) in &reviewers {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/v1/titles/{title_id}/reviews"),
                Some(token),
                Some(serde_json::json!({"text": "watched it", "score": score})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Second review from the same author is a conflict.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&reviewers[0].0),
            Some(serde_json::json!({"text": "again", "score": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    let rating = json["data"]["rating"].as_f64().unwrap();
    assert!((rating - 8.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_review_score_bounds() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;
    let user = seed_user(&state, "r1", Role::User).await;

    for score in [0, 11] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/v1/titles/{title_id}/reviews"),
                Some(&user),
                Some(serde_json::json!({"text": "x", "score": score})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["field"], "score");
    }
}

#[tokio::test]
async fn test_review_mutation_rights() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;

    let author = seed_user(&state, "author", Role::User).await;
    let stranger = seed_user(&state, "stranger", Role::User).await;
    let moderator = seed_user(&state, "mod", Role::Moderator).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&author),
            Some(serde_json::json!({"text": "original", "score": 5})),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    let review_id = json["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}");

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &uri,
            Some(&stranger),
            Some(serde_json::json!({"text": "hijacked"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &uri,
            Some(&author),
            Some(serde_json::json!({"text": "edited", "score": 7})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["text"], "edited");
    assert_eq!(json["data"]["score"], 7);

    let response = app
        .clone()
        .oneshot(request("DELETE", &uri, Some(&moderator), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_parent_is_not_found() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;
    let author = seed_user(&state, "author", Role::User).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&author),
            Some(serde_json::json!({"text": "hello", "score": 9})),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    let review_id = json["data"]["id"].as_i64().unwrap();

    // The review exists, but not under this title.
    let wrong_title = title_id + 100;
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{wrong_title}/reviews/{review_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Same shape one level down: comment fetched through the wrong review.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments"),
            Some(&author),
            Some(serde_json::json!({"text": "a comment"})),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    let comment_id = json["data"]["id"].as_i64().unwrap();

    let wrong_review = review_id + 100;
    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews/{wrong_review}/comments/{comment_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;
    let author = seed_user(&state, "author", Role::User).await;
    let commenter = seed_user(&state, "commenter", Role::User).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&author),
            Some(serde_json::json!({"text": "great", "score": 10})),
        ))
        .await
        .unwrap();
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let comments_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments");

    // Anonymous creation is rejected, reads are open.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &comments_uri,
            None,
            Some(serde_json::json!({"text": "anon"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &comments_uri,
            Some(&commenter),
            Some(serde_json::json!({"text": "agreed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["author"], "commenter");

    let response = app
        .clone()
        .oneshot(request("GET", &comments_uri, None, None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Deleting the review takes its comments with it.
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            Some(&author),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", &comments_uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_delete_cascades_reviews_and_comments() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;
    let author = seed_user(&state, "author", Role::User).await;
    let commenter = seed_user(&state, "commenter", Role::User).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&author),
            Some(serde_json::json!({"text": "memorable", "score": 9})),
        ))
        .await
        .unwrap();
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap() as i32;

    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments"),
            Some(&commenter),
            Some(serde_json::json!({"text": "well put"})),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/titles/{title_id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The nested routes 404 with their parent gone.
    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // And the rows themselves are gone, not just unreachable.
    let reviews = state.shared.store.list_reviews(title_id).await.unwrap();
    assert!(reviews.is_empty());
    let comments = state.shared.store.list_comments(review_id).await.unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn test_category_delete_detaches_titles() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let title_id = seed_title(&app, &admin).await;

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/v1/categories/movies",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The title survives without a category.
    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["category"], serde_json::Value::Null);
}
