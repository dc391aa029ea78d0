use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use crate::{
    dto::cart::{CartView, SetCartQuantityRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(view_cart).put(set_cart_quantity))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines priced at current catalog prices", body = ApiResponse<CartView>)
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart",
    request_body = SetCartQuantityRequest,
    responses(
        (status = 200, description = "Quantity set; zero removes the line", body = ApiResponse<CartView>),
        (status = 400, description = "Unknown product or negative quantity"),
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "Cart"
)]
pub async fn set_cart_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SetCartQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::set_cart_quantity(&state, &user, payload).await?;
    Ok(Json(resp))
}
