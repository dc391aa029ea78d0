use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    error::AppResult,
    evidence::EvidenceUpload,
    middleware::auth::AuthUser,
    models::{Order, Payment},
    response::ApiResponse,
    routes::params::{EvidenceQuery, OrderListQuery},
    services::{checkout_service, order_service, payment_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/payment-evidence", post(upload_payment_evidence))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders of the current customer", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status filter"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty cart, unknown payment method or missing address"),
        (status = 409, description = "Insufficient stock; retry after adjusting the cart"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = checkout_service::place_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items and payment", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled and stock released", body = ApiResponse<Order>),
        (status = 403, description = "Order belongs to another customer"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order already shipped or closed"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment-evidence",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        EvidenceQuery
    ),
    request_body(content = Vec<u8>, content_type = "image/png", description = "PNG, JPEG or WebP screenshot of the wallet payment"),
    responses(
        (status = 200, description = "Evidence stored; payment awaits verification", body = ApiResponse<Payment>),
        (status = 400, description = "Unsupported or oversized file, or cash-on-delivery order"),
        (status = 403, description = "Order belongs to another customer"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Payment already decided"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Orders"
)]
pub async fn upload_payment_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<EvidenceQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let upload = EvidenceUpload {
        content_type,
        bytes: body.to_vec(),
        transaction_id: query.transaction_id,
    };
    let resp = payment_service::submit_payment_evidence(&state, &user, id, upload).await?;
    Ok(Json(resp))
}
