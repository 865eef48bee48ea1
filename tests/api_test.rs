//! End-to-end tests over the full router, backed by the in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use catalog::{
    app::build_app,
    auth::claims::{Claims, TokenKind},
    config::AppConfig,
    state::AppState,
};

fn spawn_app() -> Router {
    build_app(AppState::fake())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, method, uri, token, None, body).await;
    (status, body)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
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
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}

/// Registers and logs in a user, returning the access token.
async fn login_as(app: &Router, email: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/register",
        None,
        Some(json!({ "name": "Ann", "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({ "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = spawn_app();
    let (status, body) = send(&app, "GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errors": "Not found" }));
}

#[tokio::test]
async fn register_returns_public_user_and_rejects_duplicates() {
    let app = spawn_app();
    let payload = json!({ "name": "Ann", "email": "  Ann@X.com ", "password": "secret1" });

    let (status, body) = send(&app, "POST", "/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "data": { "name": "Ann", "email": "ann@x.com" } }));

    let (status, body) = send(&app, "POST", "/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "errors": "Email already exists" }));
}

#[tokio::test]
async fn register_reports_every_invalid_field() {
    let app = spawn_app();
    let (status, body) = send(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let errors = body["errors"].as_array().unwrap();
    let fields: Vec<_> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["email", "name", "password"]);
    assert!(errors.iter().all(|e| e["message"].is_string()));
}

#[tokio::test]
async fn malformed_json_is_a_body_error() {
    let app = spawn_app();
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn login_sets_refresh_cookie_and_refresh_issues_access_token() {
    let app = spawn_app();
    send(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "name": "Ann", "email": "ann@x.com", "password": "secret1" })),
    )
    .await;

    let (status, headers, body) = send_raw(
        &app,
        "POST",
        "/login",
        None,
        None,
        Some(json!({ "email": "ann@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ann");
    assert_eq!(body["data"]["email"], "ann@x.com");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let set_cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("refreshToken="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Max-Age=604800"));

    let pair = set_cookie.split(';').next().unwrap();
    let (status, _, body) = send_raw(&app, "POST", "/refresh", None, Some(pair), None).await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["accessToken"].as_str().unwrap();

    let (status, _) = send(&app, "GET", "/categories", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = spawn_app();
    login_as(&app, "ann@x.com").await;

    for payload in [
        json!({ "email": "ann@x.com", "password": "wrong-pass" }),
        json!({ "email": "bob@x.com", "password": "secret1" }),
    ] {
        let (status, body) = send(&app, "POST", "/login", None, Some(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "errors": "Invalid email or password" }));
    }
}

#[tokio::test]
async fn refresh_without_or_with_unknown_cookie_is_401() {
    let app = spawn_app();
    let (status, _, body) = send_raw(&app, "POST", "/refresh", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "errors": "No refresh token provided" }));

    let (status, _, body) =
        send_raw(&app, "POST", "/refresh", None, Some("refreshToken=bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "errors": "Invalid refresh token" }));
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = spawn_app();

    let (status, body) = send(&app, "GET", "/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "errors": "Access token is required" }));

    let (status, body) = send(&app, "GET", "/products", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "errors": "Invalid access token" }));

    let request = Request::builder()
        .uri("/products")
        .header(header::AUTHORIZATION, "Basic abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn category_crud_round_trip() {
    let app = spawn_app();
    let token = login_as(&app, "ann@x.com").await;
    let token = Some(token.as_str());

    let (status, body) =
        send(&app, "POST", "/categories", token, Some(json!({ "name": " Drinks " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Drinks");
    assert!(body["data"]["created_by"].is_string());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) =
        send(&app, "POST", "/categories", token, Some(json!({ "name": "Drinks" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "errors": "Category name already exists" }));

    let (status, body) =
        send(&app, "POST", "/categories", token, Some(json!({ "name": "D" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "name");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/categories/{id}"),
        token,
        Some(json!({ "name": "Beverages" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Beverages");
    assert!(body["data"]["modified_at"].is_string());

    let (status, body) = send(&app, "GET", "/categories?category=bev", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 10);

    let (status, body) = send(&app, "DELETE", &format!("/categories/{id}"), token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Category deleted successfully" }));

    let (status, body) = send(&app, "GET", &format!("/categories/{id}"), token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errors": "Category not found" }));

    let (status, _) = send(&app, "GET", "/categories/not-a-uuid", token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_crud_round_trip() {
    let app = spawn_app();
    let token = login_as(&app, "ann@x.com").await;
    let token = Some(token.as_str());

    let (_, body) =
        send(&app, "POST", "/categories", token, Some(json!({ "name": "Drinks" }))).await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        token,
        Some(json!({ "name": "Tea", "price": 4.5, "categoryId": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "errors": "Category not found" }));

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        token,
        Some(json!({ "name": "Tea", "price": 4.5, "categoryId": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stock"], 0);
    assert_eq!(body["data"]["price"], 4.5);
    assert_eq!(body["data"]["categoryId"], category_id.as_str());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/products/{id}"),
        token,
        Some(json!({ "stock": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 12);
    assert_eq!(body["data"]["name"], "Tea");

    let (status, body) = send(&app, "GET", &format!("/products/{id}"), token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["category"],
        json!({ "id": category_id, "name": "Drinks" })
    );

    let (status, body) = send(&app, "GET", "/products?page=abc&limit=500", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 100);

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        token,
        Some(json!({ "name": "T", "price": -1, "stock": -2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 4);

    let (status, body) = send(&app, "DELETE", &format!("/products/{id}"), token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Product deleted successfully" }));

    let (status, body) = send(&app, "DELETE", &format!("/products/{id}"), token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errors": "Product not found" }));
}

#[tokio::test]
async fn expired_access_token_is_403() {
    let app = spawn_app();
    let config = AppConfig::for_tests();
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: uuid::Uuid::new_v4(),
        email: "ann@x.com".into(),
        iat: (now - 7200) as usize,
        exp: (now - 3600) as usize,
        iss: config.jwt.issuer.clone(),
        aud: config.jwt.audience.clone(),
        kind: TokenKind::Access,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(config.jwt.access_secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(&app, "GET", "/categories", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "errors": "Access token expired" }));
}

#[tokio::test]
async fn enormous_page_number_returns_an_empty_page() {
    let app = spawn_app();
    let token = login_as(&app, "ann@x.com").await;
    send(&app, "POST", "/categories", Some(&token), Some(json!({ "name": "Drinks" }))).await;

    for uri in [
        "/categories?page=9223372036854775807&limit=10",
        "/products?page=9223372036854775807&limit=100",
    ] {
        let (status, body) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let key = if uri.starts_with("/categories") { "categories" } else { "products" };
        assert_eq!(body["data"][key], json!([]));
    }
}

#[tokio::test]
async fn mistyped_field_is_reported_alongside_other_violations() {
    let app = spawn_app();
    let token = login_as(&app, "ann@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        Some(&token),
        Some(json!({ "name": "T", "price": "abc", "stock": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let errors = body["errors"].as_array().unwrap();
    let fields: Vec<_> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"price"));
    assert!(fields.contains(&"stock"));
    assert!(!fields.contains(&"body"));
    let price = errors.iter().find(|e| e["field"] == "price").unwrap();
    assert!(price["message"].as_str().unwrap().contains("invalid type"));
}

#[tokio::test]
async fn price_too_large_for_the_column_is_400() {
    let app = spawn_app();
    let token = login_as(&app, "ann@x.com").await;
    let (_, body) =
        send(&app, "POST", "/categories", Some(&token), Some(json!({ "name": "Drinks" }))).await;
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/products",
        Some(&token),
        Some(json!({ "name": "Tea", "price": 1e12, "categoryId": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "price");
}
