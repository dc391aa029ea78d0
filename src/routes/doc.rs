use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{CartLine, CartView, SetCartQuantityRequest},
        orders::{
            CheckoutRequest, OrderList, OrderWithItems, PaymentList, RejectPaymentRequest,
            UpdateOrderStatusRequest,
        },
    },
    middleware::auth::{USER_ID_HEADER, USER_ROLE_HEADER},
    models::{Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus, Role},
    response::{ApiResponse, ErrorBody, Meta},
    routes::{cart, health::{self, HealthData}, orders, params, reviews},
};

struct GatewayIdentityAddon;

impl Modify for GatewayIdentityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
        );
        components.add_security_scheme(
            "user_role",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ROLE_HEADER))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::view_cart,
        cart::set_cart_quantity,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::upload_payment_evidence,
        reviews::list_pending_payments,
        reviews::approve_payment,
        reviews::reject_payment,
        reviews::update_order_status
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            Payment,
            PaymentMethod,
            PaymentStatus,
            Role,
            HealthData,
            CartLine,
            CartView,
            SetCartQuantityRequest,
            CheckoutRequest,
            RejectPaymentRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            PaymentList,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ErrorBody,
            ApiResponse<ErrorBody>,
            ApiResponse<CartView>,
            ApiResponse<Order>,
            ApiResponse<Payment>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentList>
        )
    ),
    modifiers(&GatewayIdentityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Checkout, order history, cancellation and payment evidence"),
        (name = "Reviews", description = "Seller and admin payment verification and fulfillment"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
