//! Router-level tests: requests go through the full middleware stack.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::auth::{create_user, SESSION_COOKIE};
use super::create_router;
use crate::config::Config;
use crate::db::{init_memory, RegisterRequest};
use crate::{AppState, DbPool};

const PASSWORD: &str = "shop-admin-2024";

async fn test_app(config: Config) -> (Router, DbPool) {
    let db = init_memory().await.unwrap();
    let state = Arc::new(AppState::new(config, db.clone()));
    (create_router(state), db)
}

async fn add_admin(db: &DbPool) {
    create_user(
        db,
        &RegisterRequest {
            username: "owner".to_string(),
            email: "owner@example.com".to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .await
    .unwrap();
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

/// `name=value` pair of the session cookie set by a response
fn session_cookie(headers: &HeaderMap) -> String {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

async fn login(app: &Router) -> String {
    let (status, headers, body) = send(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "owner", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "owner");
    assert!(body.get("passwordHash").is_none());
    session_cookie(&headers)
}

#[tokio::test]
async fn test_health() {
    let (app, _db) = test_app(Config::default()).await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_require_a_session() {
    let (app, _db) = test_app(Config::default()).await;

    let (status, _, body) = send(&app, "GET", "/api/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some("storefront_session=forged"),
        Some(json!({"name": "X", "slug": "x", "price": "1.00", "sku": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, "GET", "/api/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;

    for (username, password) in [("owner", "wrong-password-1"), ("nobody", PASSWORD)] {
        let (status, headers, body) = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid username or password");
        assert!(headers.get(header::SET_COOKIE).is_none());
    }
}

#[tokio::test]
async fn test_login_then_logout_invalidates_session() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;

    let (status, _, body) = send(&app, "GET", "/api/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "owner@example.com");

    let (status, _, _) = send(&app, "GET", "/api/admin/stats", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "POST", "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/api/admin/stats", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;
    let token = cookie.trim_start_matches(&format!("{}=", SESSION_COOKIE));

    let request = Request::get("/api/admin/stats")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_only_for_first_user_by_default() {
    let (app, _db) = test_app(Config::default()).await;

    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "owner", "email": "owner@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");

    // Registration logs the new user in
    let cookie = session_cookie(&headers);
    let (status, _, _) = send(&app, "GET", "/api/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "second", "email": "second@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_rejects_duplicates_when_open() {
    let mut config = Config::default();
    config.auth.allow_registration = true;
    let (app, db) = test_app(config).await;
    add_admin(&db).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "owner", "email": "other@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Username already exists");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "other", "email": "owner@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Email already exists");
}

#[tokio::test]
async fn test_catalog_scenario_over_http() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;

    let (_, _, before) = send(&app, "GET", "/api/admin/stats", Some(&cookie), None).await;

    let (status, _, category) = send(
        &app,
        "POST",
        "/api/admin/categories",
        Some(&cookie),
        Some(json!({"name": "Laptops", "slug": "laptops"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_i64().unwrap();

    let (status, _, product) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(&cookie),
        Some(json!({
            "name": "Acme X1",
            "slug": "acme-x1",
            "price": "45999.00",
            "sku": "AX1",
            "categoryId": category_id,
            "stockStatus": "in-stock",
            "specifications": "{\"ram\": \"16GB\"}"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["specifications"], json!({"ram": "16GB"}));
    assert_eq!(product["category"]["slug"], "laptops");
    let product_id = product["id"].as_i64().unwrap();

    let (_, _, by_category) = send(&app, "GET", "/api/products?category=laptops", None, None).await;
    assert_eq!(by_category.as_array().unwrap().len(), 1);
    assert_eq!(by_category[0]["slug"], "acme-x1");

    let (_, _, by_search) = send(&app, "GET", "/api/products?search=acme", None, None).await;
    assert_eq!(by_search.as_array().unwrap().len(), 1);

    let (_, _, after) = send(&app, "GET", "/api/admin/stats", Some(&cookie), None).await;
    assert_eq!(
        after["totalProducts"].as_i64().unwrap(),
        before["totalProducts"].as_i64().unwrap() + 1
    );
    assert_eq!(
        after["activeCategories"].as_i64().unwrap(),
        before["activeCategories"].as_i64().unwrap() + 1
    );
    assert_eq!(after["monthlyViews"], 0);

    let (status, _, by_slug) = send(&app, "GET", "/api/products/acme-x1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, by_id) =
        send(&app, "GET", &format!("/api/products/{}", product_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug, by_id);

    let uri = format!("/api/admin/products/{}", product_id);
    let (status, _, _) = send(&app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, _, remaining) = send(&app, "GET", "/api/products?category=laptops", None, None).await;
    assert!(remaining.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_product_update_over_http() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;

    let (_, _, product) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(&cookie),
        Some(json!({
            "name": "Dome Camera",
            "slug": "dome-camera",
            "shortDescription": "4K night vision",
            "price": "120.00",
            "sku": "DC4K"
        })),
    )
    .await;
    let uri = format!("/api/admin/products/{}", product["id"]);

    let (status, _, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(&cookie),
        Some(json!({"price": "99.99", "shortDescription": null, "stockStatus": "limited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "99.99");
    assert_eq!(updated["shortDescription"], Value::Null);
    assert_eq!(updated["stockStatus"], "limited");
    assert_eq!(updated["name"], "Dome Camera");
    assert!(updated["updatedAt"].as_str().unwrap() > product["updatedAt"].as_str().unwrap());

    let (status, _, _) = send(
        &app,
        "PUT",
        "/api/admin/products/9999",
        Some(&cookie),
        Some(json!({"price": "1.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_validation_errors() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(&cookie),
        Some(json!({
            "name": "Acme X1",
            "slug": "acme-x1",
            "price": "45999.00",
            "sku": "AX1",
            "specifications": "{not json"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Specifications must be valid JSON format."
    );

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(&cookie),
        Some(json!({
            "name": "Acme X1",
            "slug": "acme-x1",
            "price": "45999.00",
            "sku": "AX1",
            "categoryId": 42
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["categoryId"][0], "Category does not exist");

    let valid = json!({"name": "Acme X1", "slug": "acme-x1", "price": "1.00", "sku": "AX1"});
    let (status, _, _) = send(&app, "POST", "/api/admin/products", Some(&cookie), Some(valid.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, body) = send(&app, "POST", "/api/admin/products", Some(&cookie), Some(valid)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_public_category_lookup() {
    let (app, db) = test_app(Config::default()).await;
    add_admin(&db).await;
    let cookie = login(&app).await;

    let (status, _, created) = send(
        &app,
        "POST",
        "/api/admin/categories",
        Some(&cookie),
        Some(json!({"name": "CCTV Systems", "slug": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "cctv-systems");

    let (status, _, found) = send(&app, "GET", "/api/categories/cctv-systems", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, created);

    let (status, _, _) = send(&app, "GET", "/api/categories/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/admin/categories/{}", created["id"]);
    let (status, _, _) = send(&app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, _, list) = send(&app, "GET", "/api/categories", None, None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_rejects_negative_paging() {
    let (app, _db) = test_app(Config::default()).await;
    let (status, _, body) = send(&app, "GET", "/api/products?limit=-1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (app, _db) = test_app(Config::default()).await;
    let (status, _, _) = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_api_path_is_a_json_404() {
    let (app, _db) = test_app(Config::default()).await;
    // Same shape as the binary: API router first, static files as fallback
    let app = Router::new()
        .merge(app)
        .fallback(|| async { "<html>storefront</html>" });

    let (status, _, body) = send(&app, "GET", "/api/does-not-exist", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _, _) = send(&app, "GET", "/products/acme-x1", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
