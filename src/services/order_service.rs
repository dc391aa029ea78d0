use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::release_order_stock,
    state::AppState,
    store::{OrderFilter, PaymentUpdate},
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let filter = OrderFilter {
        customer_id: user.user_id,
        status,
        newest_first: matches!(query.sort_order.unwrap_or(SortOrder::Desc), SortOrder::Desc),
        limit: limit as u64,
        offset: offset as u64,
    };
    let (orders, total) = state.store.list_orders(&filter).await?;

    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let order = state.store.find_order(id).await?;
    let order = match order {
        Some(o) if o.customer_id == user.user_id => o,
        _ => return Err(AppError::NotFound),
    };

    let items = state.store.order_items(order.id).await?;
    let payment = state
        .store
        .find_payment_by_order(order.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order,
            items,
            payment,
        },
        Some(Meta::empty()),
    ))
}

/// Customer withdrawal of a `pending` or `processing` order. Reserved stock
/// is released in the same transaction, and a wallet payment that was never
/// decided is marked `failed` so it leaves the review queue.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_customer(user)?;
    let now = Utc::now();
    let mut txn = state.store.begin().await?;

    let mut order = txn.find_order(id).await?.ok_or(AppError::NotFound)?;
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if !order.status.is_cancellable() {
        return Err(AppError::InvalidState(format!(
            "order is {}; only pending or processing orders can be cancelled",
            order.status
        )));
    }

    let payment = txn
        .find_payment_by_order(order.id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !txn
        .transition_order(order.id, order.status, OrderStatus::Cancelled, now)
        .await?
    {
        return Err(AppError::InvalidState("order changed concurrently".into()));
    }
    release_order_stock(txn.as_mut(), order.id).await?;

    if payment.method.requires_evidence() {
        if let Ok(abandoned) = payment.status.abandon() {
            let update = PaymentUpdate::from_payment(&payment, abandoned, now);
            if !txn.update_payment(payment.id, payment.status, update).await? {
                return Err(AppError::InvalidState("payment changed concurrently".into()));
            }
        }
    }
    txn.commit().await?;

    order.status = OrderStatus::Cancelled;
    order.updated_at = now;
    tracing::info!(order_id = %order.id, customer_id = %user.user_id, "order cancelled by customer");

    Ok(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    ))
}
