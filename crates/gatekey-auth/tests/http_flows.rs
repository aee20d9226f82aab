//! HTTP flows through the auth router.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use gatekey_auth::config::AuthConfig;
use gatekey_auth::mail::Outbox;
use gatekey_auth::password::hash_password;
use gatekey_auth::token::{SigningAlgorithm, SigningKey};
use gatekey_auth::{
    AuthService, AuthState, AuthStores, KeyRing, MemoryStore, Principal, router,
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"http-flow-secret-at-least-32-bytes";

fn app() -> (Router, Arc<MemoryStore>, Arc<Outbox>) {
    let config = AuthConfig::default();
    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(Outbox::new());

    store.grant_routes("admin", ["GetAllUsers", "GetUser"]);
    store.grant_routes("user", ["GetUser"]);

    let key = SigningKey::from_secret("primary", SigningAlgorithm::HS256, SECRET).unwrap();
    let stores = AuthStores {
        users: store.clone(),
        refresh_tokens: store.clone(),
        codes: store.clone(),
        permissions: store.clone(),
    };
    let service = AuthService::new(&config, Arc::new(KeyRing::new(key, 3)), stores, outbox.clone());

    (router(AuthState::new(service)), store, outbox)
}

fn add_user(store: &MemoryStore, username: &str, role: &str) {
    let now = OffsetDateTime::now_utc();
    store.insert_principal(Principal {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@x.com"),
        role: role.to_string(),
        is_verified: true,
        password_hash: hash_password("correct-horse").unwrap(),
        token_hash: "initial".to_string(),
        created_at: now,
        updated_at: now,
    });
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/auth/login",
            json!({"username": username, "password": "correct-horse"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_then_list_users_as_admin() {
    let (app, store, _) = app();
    add_user(&store, "root", "admin");
    add_user(&store, "bob", "user");

    let token = login(&app, "root").await;
    let (status, body) = send(&app, get("/api/users", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn user_role_is_denied_unlisted_routes() {
    let (app, store, _) = app();
    add_user(&store, "bob", "user");

    let token = login(&app, "bob").await;
    let (status, body) = send(&app, get("/api/users", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], false);

    let (status, body) = send(&app, get("/api/users/bob", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "bob");
}

#[tokio::test]
async fn protected_route_without_token_is_challenged() {
    let (app, _, _) = app();

    let response = app.oneshot(get("/api/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, store, _) = app();
    add_user(&store, "bob", "user");

    let (status, body) = send(
        &app,
        post_json("/auth/login", json!({"username": "bob", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");
}

#[tokio::test]
async fn verify_endpoint_reports_authorization() {
    let (app, store, _) = app();
    add_user(&store, "root", "admin");
    let token = login(&app, "root").await;

    let (status, body) = send(
        &app,
        get(&format!("/auth/verify?token={token}&routeName=GetAllUsers"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_authorized"], true);

    let (status, _) = send(
        &app,
        get(&format!("/auth/verify?token={token}&routeName=DropTables"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verify_without_token_is_denied() {
    let (app, _, _) = app();

    let (status, body) = send(&app, get("/auth/verify?routeName=GetUser", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], false);
    assert_eq!(body["error"], "access_denied");
    assert_eq!(body["message"], "malformed token");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let (app, _, _) = app();

    let (status, body) = send(&app, post_json("/auth/login", json!({"username": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
    assert_eq!(body["error"], "invalid_request");

    let request = Request::post("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, body) = send(&app, get("/auth/verify-email?email=alice@x.com", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn refresh_before_expiry_is_rejected() {
    let (app, store, _) = app();
    add_user(&store, "root", "admin");

    let (_, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"username": "root", "password": "correct-horse"}),
        ),
    )
    .await;
    let (status, body) = send(&app, post_json("/auth/refresh", body["data"].clone())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "cannot refresh before expiry");
}

#[tokio::test]
async fn register_and_confirm_email() {
    let (app, _, outbox) = app();

    let (status, body) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"username": "alice", "email": "alice@x.com", "password": "wonderland"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_verified"], false);

    let code = outbox.last_to("alice@x.com").unwrap().code;

    let (status, body) = send(
        &app,
        get("/auth/verify-email?email=alice@x.com&code=000000x", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["error"], "code_mismatch");

    let (status, _) = send(
        &app,
        get(&format!("/auth/verify-email?email=alice@x.com&code={code}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        get(&format!("/auth/verify-email?email=alice@x.com&code={code}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn password_reset_round() {
    let (app, store, outbox) = app();
    add_user(&store, "bob", "user");

    let (status, _) = send(
        &app,
        post_json("/auth/password-reset", json!({"email": "bob@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = outbox.last_to("bob@x.com").unwrap().code;

    let (status, _) = send(
        &app,
        get(&format!("/auth/password-reset?email=bob@x.com&code={code}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json(
            "/auth/password-reset/confirm",
            json!({
                "email": "bob@x.com",
                "code": code,
                "password": "fresh-password",
                "confirm_password": "fresh-password",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"username": "bob", "password": "fresh-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_for_unknown_email_is_not_found() {
    let (app, _, _) = app();

    let (status, body) = send(
        &app,
        post_json("/auth/password-reset", json!({"email": "ghost@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);
}
