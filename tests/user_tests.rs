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

#[tokio::test]
async fn test_user_admin_endpoints_are_gated() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "plain", Role::User).await;
    let moderator = seed_user(&state, "mod", Role::Moderator).await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/users", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for token in [&user, &moderator] {
        let response = app
            .clone()
            .oneshot(request("GET", "/api/v1/users", Some(token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_admin_user_crud() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/users",
            Some(&admin),
            Some(serde_json::json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "bio": "hello"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "user");
    assert_eq!(json["data"]["bio"], "hello");

    // Duplicate username conflicts.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/users",
            Some(&admin),
            Some(serde_json::json!({
                "username": "newbie",
                "email": "elsewhere@example.com"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Promote to moderator.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/v1/users/newbie",
            Some(&admin),
            Some(serde_json::json!({"role": "moderator"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "moderator");

    // Unknown role is a field error.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/v1/users/newbie",
            Some(&admin),
            Some(serde_json::json!({"role": "emperor"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["field"], "role");

    // Search filter.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/users?search=new", Some(&admin), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/api/v1/users/newbie", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", "/api/v1/users/newbie", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update_discards_role_for_non_admins() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "plain", Role::User).await;

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/v1/users/me",
            Some(&user),
            Some(serde_json::json!({"role": "admin", "bio": "just me"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    // The bio change lands, the attempted elevation does not.
    assert_eq!(json["data"]["bio"], "just me");
    assert_eq!(json["data"]["role"], "user");
}

#[tokio::test]
async fn test_profile_email_conflict() {
    let (app, state) = spawn_app().await;
    let alice = seed_user(&state, "alice", Role::User).await;
    seed_user(&state, "bob", Role::User).await;

    let response = app
        .oneshot(request(
            "PATCH",
            "/api/v1/users/me",
            Some(&alice),
            Some(serde_json::json!({"email": "bob@example.com"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_user_delete_cascades_content() {
    let (app, state) = spawn_app().await;
    let admin = seed_user(&state, "admin", Role::Admin).await;
    let author = seed_user(&state, "author", Role::User).await;
    let commenter = seed_user(&state, "commenter", Role::User).await;

    // Build a title with a review by `author` and a comment by `commenter`.
    app.clone()
        .oneshot(request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            Some(serde_json::json!({"name": "Movies", "slug": "movies"})),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles",
            Some(&admin),
            Some(serde_json::json!({"name": "Alien", "year": 1979, "category": "movies"})),
        ))
        .await
        .unwrap();
    let title_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews"),
            Some(&author),
            Some(serde_json::json!({"text": "classic", "score": 10})),
        ))
        .await
        .unwrap();
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments"),
            Some(&commenter),
            Some(serde_json::json!({"text": "seconded"})),
        ))
        .await
        .unwrap();

    // Removing the review author removes the review and everything under it.
    let response = app
        .clone()
        .oneshot(request("DELETE", "/api/v1/users/author", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews"),
            None,
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    // The title itself is untouched.
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
}
