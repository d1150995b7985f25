mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use estate_ledger::api::router::create_router;
use estate_ledger::auth::Role;
use estate_ledger::AppState;

fn build_app(pool: sqlx::PgPool) -> axum::Router {
    let metrics_handle = estate_ledger::metrics::init_metrics();
    create_router(AppState::new(pool, common::test_config(), metrics_handle))
}

/// Router over a pool that never connects; only for requests rejected
/// before storage is touched.
fn build_offline_app() -> axum::Router {
    build_app(common::lazy_pool())
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Boundary checks (no database)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = build_offline_app();

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/investments/me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = build_offline_app();

    let (status, _) = send(&app, get("/order-book/me", "Bearer not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_investor_cannot_declare_dividend() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, json) = send(
        &app,
        post_json(
            "/dividends",
            Some(&auth),
            json!({ "propertyTokenId": Uuid::new_v4(), "amount": "100.00" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_investor_cannot_create_property() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, _) = send(
        &app,
        post_json("/properties", Some(&auth), json!({ "title": "Loft", "valuation": "100000" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_positive_price_is_bad_request() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, json) = send(
        &app,
        post_json(
            "/order-book",
            Some(&auth),
            json!({
                "propertyTokenId": Uuid::new_v4(),
                "side": "buy",
                "price": "0",
                "tokenAmount": 10
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_price_beyond_stored_precision_is_bad_request() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let cases = [
        ("10.123456789", 10),
        ("1000000000000", 1),
        ("100000000000", 1_000_000_000),
    ];
    for (price, amount) in cases {
        let (status, json) = send(
            &app,
            post_json(
                "/order-book",
                Some(&auth),
                json!({
                    "propertyTokenId": Uuid::new_v4(),
                    "side": "buy",
                    "price": price,
                    "tokenAmount": amount
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "price {price} x {amount}");
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, json) = send(
        &app,
        post_json("/order-book", Some(&auth), json!({ "side": "sideways" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_book_requires_token_query() {
    let app = build_offline_app();
    let auth = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, _) = send(&app, get("/order-book", &auth)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_offline_app();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("investments_recorded_total"));
}

// ---------------------------------------------------------------------------
// End to end (database)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = build_app(pool);

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_property_to_investment_flow() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = build_app(pool);
    let manager = common::bearer(Uuid::new_v4(), Role::PropertyManager);
    let investor = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, json) = send(
        &app,
        post_json(
            "/properties",
            Some(&manager),
            json!({ "title": "Harbour Flats", "location": "Porto", "valuation": "250000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "draft");
    let property_id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        post_json(
            &format!("/properties/{property_id}/tokenize"),
            Some(&manager),
            json!({ "totalSupply": 100, "tokenPrice": "2500", "minInvestment": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token_id = json["data"]["token"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        post_json(
            "/investments",
            Some(&investor),
            json!({ "propertyTokenId": token_id, "tokenAmount": 60 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tokenAmount"], 60);
    assert_eq!(json["data"]["status"], "active");

    // Below the minimum
    let (status, _) = send(
        &app,
        post_json(
            "/investments",
            Some(&investor),
            json!({ "propertyTokenId": token_id, "tokenAmount": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Oversell
    let (status, json) = send(
        &app,
        post_json(
            "/investments",
            Some(&investor),
            json!({ "propertyTokenId": token_id, "tokenAmount": 41 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);

    let (status, json) = send(&app, get(&format!("/property-tokens/{token_id}"), &investor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["availableSupply"], 40);

    let (status, json) = send(&app, get("/investments/me/holdings", &investor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["tokenAmount"], 60);
}

#[tokio::test]
async fn test_investment_price_other_than_issue_price_is_rejected() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = common::test_ledger(&pool);
    let token = common::seed_token(&ledger, 100, rust_decimal::Decimal::from(2_500), 1).await;
    let app = build_app(pool);
    let investor = common::bearer(Uuid::new_v4(), Role::Investor);

    let (status, json) = send(
        &app,
        post_json(
            "/investments",
            Some(&investor),
            json!({ "propertyTokenId": token.id, "tokenAmount": 10, "pricePerToken": "0.01" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = send(&app, get(&format!("/property-tokens/{}", token.id), &investor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["availableSupply"], 100);

    let (status, json) = send(
        &app,
        post_json(
            "/investments",
            Some(&investor),
            json!({ "propertyTokenId": token.id, "tokenAmount": 10, "pricePerToken": "2500.00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tokenAmount"], 10);
}

#[tokio::test]
async fn test_other_users_order_cannot_be_cancelled() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = common::test_ledger(&pool);
    let token = common::seed_token(&ledger, 100, rust_decimal::Decimal::from(10), 1).await;
    let app = build_app(pool);

    let owner = Uuid::new_v4();
    let (status, json) = send(
        &app,
        post_json(
            "/order-book",
            Some(&common::bearer(owner, Role::Investor)),
            json!({
                "propertyTokenId": token.id,
                "side": "buy",
                "price": "10",
                "tokenAmount": 5
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = json["data"]["order"]["id"].as_str().unwrap().to_string();

    let stranger = common::bearer(Uuid::new_v4(), Role::Investor);
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/order-book/{order_id}"))
                .header("authorization", stranger)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let admin = common::bearer(Uuid::new_v4(), Role::Admin);
    let resp = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/order-book/{order_id}"))
                .header("authorization", admin)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
