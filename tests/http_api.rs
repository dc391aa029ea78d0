mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use common::{admin, customer, harness, seller};
use serde_json::{Value, json};
use storefront_orders::{
    middleware::auth::{AuthUser, USER_ID_HEADER, USER_ROLE_HEADER},
    routes::{create_api_router, health::health_check},
    state::AppState,
};
use tower::ServiceExt;

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", create_api_router())
        .with_state(state)
}

fn request(method: Method, uri: &str, user: Option<&AuthUser>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder
            .header(USER_ID_HEADER, user.user_id.to_string())
            .header(USER_ROLE_HEADER, user.role.as_str());
    }
    builder
}

fn json_request(method: Method, uri: &str, user: &AuthUser, body: Value) -> Request<Body> {
    request(method, uri, Some(user))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_route_reports_ok() {
    let h = harness();
    let app = app(h.state.clone());

    let (status, body) = send(
        &app,
        request(Method::GET, "/health", None)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn identity_headers_are_required() {
    let h = harness();
    let app = app(h.state.clone());

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/orders", None)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["retryable"], false);

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/orders", None)
            .header(USER_ID_HEADER, "not-a-uuid")
            .header(USER_ROLE_HEADER, "customer")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wallet_order_from_cart_to_approval() {
    let h = harness();
    let app = app(h.state.clone());
    let shop = seller();
    let buyer = customer();
    let reviewer = admin();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/cart",
            &buyer,
            json!({ "product_id": bowl.id, "quantity": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subtotal"], 100_000);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/orders/checkout",
            &buyer,
            json!({
                "shipping_address": "Ward 4, Pulchowk",
                "shipping_city": "Lalitpur",
                "payment_method": "esewa"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["total_amount"], 110_000);
    assert_eq!(body["data"]["payment"]["status"], "pending");
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();
    let payment_id = body["data"]["payment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/orders/{order_id}/payment-evidence?transaction_id=ESW-99120"),
            Some(&buyer),
        )
        .header(header::CONTENT_TYPE, "image/webp")
        .body(Body::from(&b"RIFF\x00\x00WEBPVP8 "[..]))
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending_verification");
    assert_eq!(body["data"]["transaction_id"], "ESW-99120");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/reviews/payments", Some(&reviewer))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["id"], payment_id.as_str());

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/reviews/payments/{payment_id}/approve"),
            Some(&reviewer),
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/orders/{order_id}"), Some(&buyer))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["status"], "processing");
    assert_eq!(body["data"]["payment"]["status"], "paid");

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/reviews/payments/{payment_id}/reject"),
            &reviewer,
            json!({ "reason": "second thoughts" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn out_of_stock_checkout_is_a_retryable_conflict() {
    let h = harness();
    let app = app(h.state.clone());
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 1).await;
    h.add_to_cart(&buyer, bowl.id, 5).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/orders/checkout",
            &buyer,
            json!({
                "shipping_address": "Lakeside",
                "shipping_city": "Pokhara",
                "payment_method": "cod"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["retryable"], true);
    assert_eq!(h.cart_len(&buyer).await, 1);
}

#[tokio::test]
async fn fulfillment_status_route_and_rejection_reason() {
    let h = harness();
    let app = app(h.state.clone());
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let cod = h.order(&buyer, &bowl, 1, "cod").await;
    let (_, payment) = h.order_with_evidence(&buyer, &bowl, 2).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/api/reviews/orders/{}/status", cod.order.id),
            &shop,
            json!({ "status": "processing" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "processing");

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/reviews/payments/{}/reject", payment.id),
            &shop,
            json!({ "reason": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/reviews/payments/{}/reject", payment.id),
            &shop,
            json!({ "reason": "Screenshot is cropped" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rejection_reason"], "Screenshot is cropped");
    assert_eq!(h.stock_of(bowl.id).await, 9);
}
