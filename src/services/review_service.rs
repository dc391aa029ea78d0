use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::PaymentList,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_reviewer},
    models::{Order, OrderStatus, Payment, PaymentMethod, PaymentStatus, Role, Verdict},
    response::{ApiResponse, Meta},
    services::release_order_stock,
    state::AppState,
    store::PaymentUpdate,
};

/// Payments waiting for a reviewer. Sellers only see orders that contain one
/// of their products.
pub async fn list_pending_verifications(
    state: &AppState,
    reviewer: &AuthUser,
) -> AppResult<ApiResponse<PaymentList>> {
    ensure_reviewer(reviewer)?;
    let seller = match reviewer.role {
        Role::Seller => Some(reviewer.user_id),
        Role::Admin | Role::Customer => None,
    };

    let items = state
        .store
        .list_payments(PaymentStatus::PendingVerification, seller)
        .await?;
    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success(
        "Payments awaiting verification",
        PaymentList { items },
        Some(meta),
    ))
}

pub async fn approve_payment(
    state: &AppState,
    reviewer: &AuthUser,
    payment_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    decide_payment(state, reviewer, payment_id, Verdict::Approve, None).await
}

/// Rejecting abandons the order, so the stock it reserved goes back to the catalog.
pub async fn reject_payment(
    state: &AppState,
    reviewer: &AuthUser,
    payment_id: Uuid,
    reason: &str,
) -> AppResult<ApiResponse<Payment>> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("rejection reason is required".into()));
    }
    decide_payment(
        state,
        reviewer,
        payment_id,
        Verdict::Reject,
        Some(reason.to_string()),
    )
    .await
}

async fn decide_payment(
    state: &AppState,
    reviewer: &AuthUser,
    payment_id: Uuid,
    verdict: Verdict,
    reason: Option<String>,
) -> AppResult<ApiResponse<Payment>> {
    ensure_reviewer(reviewer)?;
    let order_id = state
        .store
        .find_payment(payment_id)
        .await?
        .ok_or(AppError::NotFound)?
        .order_id;
    if !state
        .authorizer
        .is_authorized_reviewer(reviewer, order_id)
        .await?
    {
        return Err(AppError::Forbidden);
    }

    let now = Utc::now();
    let mut txn = state.store.begin().await?;

    // order row first, then payment: every writer takes the locks in this order
    let order = txn.find_order(order_id).await?.ok_or(AppError::NotFound)?;
    let mut payment = txn
        .find_payment(payment_id)
        .await?
        .filter(|payment| payment.order_id == order.id)
        .ok_or(AppError::NotFound)?;
    let next = payment.status.verify(verdict)?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "order is {}; only pending orders can settle a payment review",
            order.status
        )));
    }
    let order_next = match verdict {
        Verdict::Approve => OrderStatus::Processing,
        Verdict::Reject => OrderStatus::Cancelled,
    };

    let mut update = PaymentUpdate::from_payment(&payment, next, now);
    update.verified_by = Some(reviewer.user_id);
    update.verified_at = Some(now);
    update.rejection_reason = reason;

    if !txn
        .update_payment(payment.id, payment.status, update.clone())
        .await?
    {
        return Err(AppError::InvalidState("payment was decided concurrently".into()));
    }
    if !txn
        .transition_order(order.id, OrderStatus::Pending, order_next, now)
        .await?
    {
        return Err(AppError::InvalidState("order changed during review".into()));
    }
    if verdict == Verdict::Reject {
        release_order_stock(txn.as_mut(), order.id).await?;
    }

    txn.commit().await?;

    update.apply(&mut payment);
    tracing::info!(
        payment_id = %payment.id,
        order_id = %order.id,
        reviewer_id = %reviewer.user_id,
        status = %payment.status,
        "payment reviewed"
    );

    let message = match verdict {
        Verdict::Approve => "Payment approved",
        Verdict::Reject => "Payment rejected",
    };
    Ok(ApiResponse::success(message, payment, Some(Meta::empty())))
}

/// Moves an order one fulfillment step forward.
///
/// Wallet orders leave `pending` only through payment approval. Delivering a
/// cash-on-delivery order settles its payment; a return puts the items back
/// into stock.
pub async fn advance_order_status(
    state: &AppState,
    reviewer: &AuthUser,
    order_id: Uuid,
    requested: &str,
) -> AppResult<ApiResponse<Order>> {
    ensure_reviewer(reviewer)?;
    let next = requested
        .trim()
        .parse::<OrderStatus>()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    if !state
        .authorizer
        .is_authorized_reviewer(reviewer, order_id)
        .await?
    {
        return Err(AppError::Forbidden);
    }

    let now = Utc::now();
    let mut txn = state.store.begin().await?;

    let mut order = txn.find_order(order_id).await?.ok_or(AppError::NotFound)?;
    if order.status.fulfillment_successor() != Some(next) {
        return Err(AppError::InvalidState(format!(
            "order cannot move from {} to {}",
            order.status, next
        )));
    }

    let payment = txn
        .find_payment_by_order(order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.status == OrderStatus::Pending && payment.method != PaymentMethod::Cod {
        return Err(AppError::InvalidState(
            "wallet orders start processing when their payment is approved".into(),
        ));
    }

    if !txn.transition_order(order.id, order.status, next, now).await? {
        return Err(AppError::InvalidState("order changed concurrently".into()));
    }

    match next {
        OrderStatus::Delivered if payment.method == PaymentMethod::Cod => {
            let collected = payment.status.collect_on_delivery()?;
            let mut update = PaymentUpdate::from_payment(&payment, collected, now);
            update.verified_by = Some(reviewer.user_id);
            update.verified_at = Some(now);
            if !txn.update_payment(payment.id, payment.status, update).await? {
                return Err(AppError::InvalidState("payment changed concurrently".into()));
            }
        }
        OrderStatus::Returned => release_order_stock(txn.as_mut(), order.id).await?,
        _ => {}
    }

    txn.commit().await?;

    order.status = next;
    order.updated_at = now;
    tracing::info!(
        order_id = %order.id,
        reviewer_id = %reviewer.user_id,
        status = %order.status,
        "order status advanced"
    );

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}
