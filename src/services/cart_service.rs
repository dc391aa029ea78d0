use crate::{
    dto::cart::{CartLine, CartView, SetCartQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Current cart priced at today's catalog prices. Lines whose product has
/// disappeared from the catalog are skipped.
pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = state.carts.read_cart(user.user_id).await?;

    let mut items = Vec::with_capacity(cart.len());
    for (product_id, quantity) in cart.entries {
        let Some(product) = state.store.find_product(product_id).await? else {
            continue;
        };
        items.push(CartLine {
            product_id,
            name: product.name,
            unit_price: product.price,
            quantity,
            line_total: product.price.saturating_mul(i64::from(quantity)),
            in_stock: product.is_active && product.stock >= quantity,
        });
    }
    let subtotal = items.iter().map(|line| line.line_total).sum();

    Ok(ApiResponse::success(
        "OK",
        CartView { items, subtotal },
        Some(Meta::empty()),
    ))
}

pub async fn set_cart_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: SetCartQuantityRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    if payload.quantity < 0 {
        return Err(AppError::Validation(
            "quantity must not be negative".to_string(),
        ));
    }

    if payload.quantity > 0 {
        let product = state.store.find_product(payload.product_id).await?;
        match product {
            Some(p) if p.is_active => {}
            _ => return Err(AppError::Validation("product not found".to_string())),
        }
    }

    state
        .carts
        .set_quantity(user.user_id, payload.product_id, payload.quantity)
        .await?;

    view_cart(state, user).await
}
