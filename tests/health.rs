mod common;

use axum::{extract::State, http::StatusCode};
use storefront_orders::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_reachable_store() {
    let h = common::harness();
    let (code, response) = health_check(State(h.state.clone())).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert!(data.storage_reachable);
    assert_eq!(data.version, env!("CARGO_PKG_VERSION"));
}
