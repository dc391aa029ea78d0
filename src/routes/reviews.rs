use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{PaymentList, RejectPaymentRequest, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Payment},
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_pending_payments))
        .route("/payments/{id}/approve", post(approve_payment))
        .route("/payments/{id}/reject", post(reject_payment))
        .route("/orders/{id}/status", patch(update_order_status))
}

#[utoipa::path(
    get,
    path = "/api/reviews/payments",
    responses(
        (status = 200, description = "Payments awaiting verification visible to the reviewer", body = ApiResponse<PaymentList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Reviews"
)]
pub async fn list_pending_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = review_service::list_pending_verifications(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reviews/payments/{id}/approve",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment marked paid; order moves to processing", body = ApiResponse<Payment>),
        (status = 403, description = "Reviewer does not sell any product of the order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Payment is not awaiting verification"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Reviews"
)]
pub async fn approve_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = review_service::approve_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reviews/payments/{id}/reject",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = RejectPaymentRequest,
    responses(
        (status = 200, description = "Payment rejected; order cancelled and stock restored", body = ApiResponse<Payment>),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Payment is not awaiting verification"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Reviews"
)]
pub async fn reject_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = review_service::reject_payment(&state, &user, id, &payload.reason).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/reviews/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order advanced one fulfillment step", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Reviews"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = review_service::advance_order_status(&state, &user, id, &payload.status).await?;
    Ok(Json(resp))
}
