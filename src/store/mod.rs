//! Persistence boundary of the order workflow.
//!
//! Services talk to storage only through these traits so the same workflow
//! runs against PostgreSQL in production and the in-memory backend in tests.
//! Every multi-step mutation goes through a [`StoreTxn`]: dropping it without
//! calling [`StoreTxn::commit`] rolls everything back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Cart, Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{FailPoint, InMemoryCartStore, InMemoryStore};
pub use postgres::{PostgresCartStore, PostgresStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("injected failure at {0:?}")]
    Injected(FailPoint),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stock movement against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Decrement, applied only if the resulting stock stays non-negative.
    Reserve(i32),
    /// Increment, returning previously reserved units.
    Release(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Applied,
    Insufficient,
}

/// Filter for customer order listings.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub customer_id: Uuid,
    pub status: Option<OrderStatus>,
    pub newest_first: bool,
    pub limit: u64,
    pub offset: u64,
}

/// Fields written when a payment changes state.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub screenshot_ref: Option<String>,
    pub transaction_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentUpdate {
    /// Starts from the payment's current values so callers only set what changes.
    pub fn from_payment(payment: &Payment, status: PaymentStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            screenshot_ref: payment.screenshot_ref.clone(),
            transaction_id: payment.transaction_id.clone(),
            rejection_reason: payment.rejection_reason.clone(),
            verified_by: payment.verified_by,
            verified_at: payment.verified_at,
            updated_at: now,
        }
    }

    pub fn apply(self, payment: &mut Payment) {
        payment.status = self.status;
        payment.screenshot_ref = self.screenshot_ref;
        payment.transaction_id = self.transaction_id;
        payment.rejection_reason = self.rejection_reason;
        payment.verified_by = self.verified_by;
        payment.verified_at = self.verified_at;
        payment.updated_at = self.updated_at;
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Opens a storage transaction. Do not call the read methods below while
    /// holding one: the in-memory backend serializes on a single lock.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTxn>>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)>;
    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;
    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;
    async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>>;

    /// Payments in `status`, optionally restricted to orders that contain at
    /// least one product of `seller_id`. Oldest first.
    async fn list_payments(
        &self,
        status: PaymentStatus,
        seller_id: Option<Uuid>,
    ) -> StoreResult<Vec<Payment>>;

    async fn order_has_seller_product(&self, order_id: Uuid, seller_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait StoreTxn: Send {
    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        change: StockChange,
    ) -> StoreResult<StockAdjustment>;

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()>;
    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn order_items(&mut self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;
    async fn find_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>>;
    async fn find_payment_by_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>>;

    /// Moves the order to `next` only if it is still in `expected`.
    /// Returns `false` when another writer got there first.
    async fn transition_order(
        &mut self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Writes `update` only if the payment is still in `expected`.
    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Per-customer cart held outside the order tables.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn read_cart(&self, customer_id: Uuid) -> StoreResult<Cart>;
    /// Sets the quantity for one product; zero removes the line.
    async fn set_quantity(&self, customer_id: Uuid, product_id: Uuid, quantity: i32)
    -> StoreResult<()>;
    /// Drops the lines that were just ordered. A line whose quantity changed
    /// since it was read stays in the cart.
    async fn remove_ordered(
        &self,
        customer_id: Uuid,
        ordered: &BTreeMap<Uuid, i32>,
    ) -> StoreResult<()>;
}
