#![allow(dead_code)]

pub mod postgres;

use std::sync::Arc;

use storefront_orders::{
    dto::orders::{CheckoutRequest, OrderWithItems},
    evidence::{EvidenceUpload, InMemoryEvidenceStore},
    middleware::auth::AuthUser,
    models::{Payment, Product},
    services::{checkout_service, payment_service},
    shipping::MetroRateTable,
    state::AppState,
    store::{CartStore, InMemoryCartStore, InMemoryStore, OrderStore},
};
use uuid::Uuid;

pub const MAX_EVIDENCE_BYTES: usize = 64 * 1024;

pub struct Harness {
    pub state: AppState,
    pub store: InMemoryStore,
    pub carts: InMemoryCartStore,
    pub evidence: InMemoryEvidenceStore,
}

pub fn harness() -> Harness {
    let store = InMemoryStore::new();
    let carts = InMemoryCartStore::new();
    let evidence = InMemoryEvidenceStore::new();
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(carts.clone()),
        Arc::new(evidence.clone()),
        Arc::new(MetroRateTable::new(
            ["Kathmandu", "Lalitpur", "Bhaktapur"],
            10_000,
            15_000,
        )),
        MAX_EVIDENCE_BYTES,
    );
    Harness {
        state,
        store,
        carts,
        evidence,
    }
}

impl Harness {
    pub async fn product(&self, seller_id: Uuid, name: &str, price: i64, stock: i32) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            seller_id,
            name: name.to_string(),
            price,
            stock,
            is_active: true,
        };
        self.store.put_product(product.clone()).await;
        product
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.store
            .find_product(product_id)
            .await
            .unwrap()
            .expect("product exists")
            .stock
    }

    pub async fn add_to_cart(&self, customer: &AuthUser, product_id: Uuid, quantity: i32) {
        self.carts
            .set_quantity(customer.user_id, product_id, quantity)
            .await
            .unwrap();
    }

    pub async fn cart_len(&self, customer: &AuthUser) -> usize {
        self.carts.read_cart(customer.user_id).await.unwrap().len()
    }

    pub async fn payment_of(&self, order_id: Uuid) -> Payment {
        self.store
            .find_payment_by_order(order_id)
            .await
            .unwrap()
            .expect("payment exists")
    }

    /// Adds `quantity` of `product` to the cart and checks out.
    pub async fn order(
        &self,
        customer: &AuthUser,
        product: &Product,
        quantity: i32,
        method: &str,
    ) -> OrderWithItems {
        self.add_to_cart(customer, product.id, quantity).await;
        checkout_service::place_order(&self.state, customer, checkout("Kathmandu", method))
            .await
            .expect("checkout succeeds")
            .data
            .expect("order data")
    }

    /// Places a wallet order and uploads a screenshot for it.
    pub async fn order_with_evidence(
        &self,
        customer: &AuthUser,
        product: &Product,
        quantity: i32,
    ) -> (OrderWithItems, Payment) {
        let placed = self.order(customer, product, quantity, "esewa").await;
        let payment = payment_service::submit_payment_evidence(
            &self.state,
            customer,
            placed.order.id,
            png_upload(Some("ESW-20251019-001")),
        )
        .await
        .expect("evidence accepted")
        .data
        .expect("payment data");
        (placed, payment)
    }
}

pub fn checkout(city: &str, method: &str) -> CheckoutRequest {
    CheckoutRequest {
        shipping_address: "House 12, Jhamsikhel Marg".to_string(),
        shipping_city: city.to_string(),
        payment_method: method.to_string(),
    }
}

pub fn png_upload(transaction_id: Option<&str>) -> EvidenceUpload {
    EvidenceUpload {
        content_type: "image/png".to_string(),
        bytes: b"\x89PNG\r\n\x1a\nreceipt".to_vec(),
        transaction_id: transaction_id.map(str::to_string),
    }
}

pub fn customer() -> AuthUser {
    AuthUser::customer(Uuid::new_v4())
}

pub fn seller() -> AuthUser {
    AuthUser::seller(Uuid::new_v4())
}

pub fn admin() -> AuthUser {
    AuthUser::admin(Uuid::new_v4())
}
