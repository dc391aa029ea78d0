use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    state::AppState,
    store::{StockAdjustment, StockChange},
};

/// Turns the customer's cart into a pending order.
///
/// Prices and stock are re-read inside the transaction, so the cart only
/// contributes product ids and quantities. Order, items, stock reservations
/// and the payment row commit together or not at all; on failure the cart
/// is left as it was so the customer can retry.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;

    let method = payload
        .payment_method
        .trim()
        .parse::<PaymentMethod>()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let shipping_address = payload.shipping_address.trim().to_string();
    let shipping_city = payload.shipping_city.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::Validation("shipping address is required".into()));
    }
    if shipping_city.is_empty() {
        return Err(AppError::Validation("shipping city is required".into()));
    }

    let cart = state.carts.read_cart(user.user_id).await?;
    if cart.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }
    if let Some((product_id, _)) = cart.entries.iter().find(|(_, quantity)| **quantity <= 0) {
        return Err(AppError::Validation(format!(
            "Cart has invalid quantity for product {product_id}"
        )));
    }

    let shipping_cost = state.shipping.shipping_cost(&shipping_city);
    let now = Utc::now();
    let order_id = Uuid::new_v4();

    let mut txn = state.store.begin().await?;

    // entries are ordered by product id, so concurrent checkouts touch rows in the same order
    let mut items = Vec::with_capacity(cart.len());
    let mut subtotal: i64 = 0;
    for (&product_id, &quantity) in &cart.entries {
        let product = txn
            .find_product(product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or_else(|| {
                AppError::Validation(format!("Product {product_id} is no longer available"))
            })?;
        if product.stock < quantity {
            return Err(AppError::InsufficientStock { product_id });
        }

        let line_total = product
            .price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| AppError::Validation("Order amount is too large".into()))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| AppError::Validation("Order amount is too large".into()))?;

        items.push(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            unit_price: product.price,
            created_at: now,
        });
    }

    let total_amount = subtotal
        .checked_add(shipping_cost)
        .ok_or_else(|| AppError::Validation("Order amount is too large".into()))?;

    let order = Order {
        id: order_id,
        customer_id: user.user_id,
        subtotal,
        shipping_cost,
        total_amount,
        status: OrderStatus::Pending,
        shipping_address,
        shipping_city,
        created_at: now,
        updated_at: now,
    };
    txn.insert_order(&order).await?;

    for item in &items {
        txn.insert_order_item(item).await?;
        match txn
            .adjust_stock(item.product_id, StockChange::Reserve(item.quantity))
            .await?
        {
            StockAdjustment::Applied => {}
            StockAdjustment::Insufficient => {
                return Err(AppError::InsufficientStock {
                    product_id: item.product_id,
                });
            }
        }
    }

    let payment = Payment {
        id: Uuid::new_v4(),
        order_id,
        method,
        status: PaymentStatus::Pending,
        amount: total_amount,
        screenshot_ref: None,
        transaction_id: None,
        rejection_reason: None,
        verified_by: None,
        verified_at: None,
        created_at: now,
        updated_at: now,
    };
    txn.insert_payment(&payment).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        customer_id = %user.user_id,
        total_amount = order.total_amount,
        method = %method,
        "order placed"
    );

    if let Err(err) = state.carts.remove_ordered(user.user_id, &cart.entries).await {
        tracing::warn!(error = %err, customer_id = %user.user_id, "cart clear failed after checkout");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order,
            items,
            payment,
        },
        Some(Meta::empty()),
    ))
}
