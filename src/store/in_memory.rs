use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex as StdMutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    CartStore, OrderFilter, OrderStore, PaymentUpdate, StockAdjustment, StockChange, StoreError,
    StoreResult, StoreTxn,
};
use crate::models::{Cart, Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product};

/// Points where the in-memory backend can be told to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItem,
    AdjustStock,
    InsertPayment,
    UpdatePayment,
    Commit,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: Vec<OrderItem>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn payment_of(&self, order_id: Uuid) -> Option<Payment> {
        self.payments
            .values()
            .find(|payment| payment.order_id == order_id)
            .cloned()
    }

    fn order_has_seller_product(&self, order_id: Uuid, seller_id: Uuid) -> bool {
        self.order_items.iter().any(|item| {
            item.order_id == order_id
                && self
                    .products
                    .get(&item.product_id)
                    .is_some_and(|product| product.seller_id == seller_id)
        })
    }
}

type Faults = Arc<StdMutex<HashSet<FailPoint>>>;

fn trip(faults: &Faults, point: FailPoint) -> StoreResult<()> {
    let mut armed = faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if armed.remove(&point) {
        return Err(StoreError::Injected(point));
    }
    Ok(())
}

/// Order store kept in process memory.
///
/// A transaction takes the single table lock for its whole lifetime and
/// works on a copy of the tables, which is written back on commit. That
/// gives serializable isolation, enough to exercise the stock races and
/// rollbacks of the workflow without a database.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Faults,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a catalog product.
    pub async fn put_product(&self, product: Product) {
        let mut tables = self.tables.lock().await;
        tables.products.insert(product.id, product);
    }

    /// Arms a one-shot failure at `point` for the next transaction reaching it.
    pub fn fail_once(&self, point: FailPoint) {
        let mut armed = self
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        armed.insert(point);
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.tables.lock().await.payments.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTxn>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTxn {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.customer_id == filter.customer_id)
            .filter(|order| filter.status.is_none_or(|status| order.status == status))
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.created_at);
        if filter.newest_first {
            orders.reverse();
        }
        let total = orders.len() as u64;
        let page = orders
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        Ok(self.tables.lock().await.items_of(order_id))
    }

    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().await.payments.get(&id).cloned())
    }

    async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().await.payment_of(order_id))
    }

    async fn list_payments(
        &self,
        status: PaymentStatus,
        seller_id: Option<Uuid>,
    ) -> StoreResult<Vec<Payment>> {
        let tables = self.tables.lock().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| payment.status == status)
            .filter(|payment| {
                seller_id.is_none_or(|seller| tables.order_has_seller_product(payment.order_id, seller))
            })
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.created_at);
        Ok(payments)
    }

    async fn order_has_seller_product(&self, order_id: Uuid, seller_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .order_has_seller_product(order_id, seller_id))
    }
}

struct InMemoryTxn {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Faults,
}

#[async_trait]
impl StoreTxn for InMemoryTxn {
    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        change: StockChange,
    ) -> StoreResult<StockAdjustment> {
        trip(&self.faults, FailPoint::AdjustStock)?;
        let Some(product) = self.working.products.get_mut(&product_id) else {
            return Ok(StockAdjustment::Insufficient);
        };
        match change {
            StockChange::Reserve(quantity) => {
                if product.stock < quantity {
                    return Ok(StockAdjustment::Insufficient);
                }
                product.stock -= quantity;
            }
            StockChange::Release(quantity) => product.stock += quantity,
        }
        Ok(StockAdjustment::Applied)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        trip(&self.faults, FailPoint::InsertOrder)?;
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        trip(&self.faults, FailPoint::InsertOrderItem)?;
        self.working.order_items.push(item.clone());
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        trip(&self.faults, FailPoint::InsertPayment)?;
        if self.working.payment_of(payment.order_id).is_some() {
            return Err(StoreError::Corrupt(format!(
                "order {} already has a payment",
                payment.order_id
            )));
        }
        self.working.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn order_items(&mut self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        Ok(self.working.items_of(order_id))
    }

    async fn find_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn find_payment_by_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.working.payment_of(order_id))
    }

    async fn transition_order(
        &mut self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.working.orders.get_mut(&order_id) {
            Some(order) if order.status == expected => {
                order.status = next;
                order.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> StoreResult<bool> {
        trip(&self.faults, FailPoint::UpdatePayment)?;
        match self.working.payments.get_mut(&payment_id) {
            Some(payment) if payment.status == expected => {
                update.apply(payment);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        trip(&self.faults, FailPoint::Commit)?;
        let InMemoryTxn {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

/// Carts keyed by customer, held in process memory.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<Uuid, BTreeMap<Uuid, i32>>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn read_cart(&self, customer_id: Uuid) -> StoreResult<Cart> {
        let carts = self.carts.read().await;
        Ok(Cart {
            customer_id,
            entries: carts.get(&customer_id).cloned().unwrap_or_default(),
        })
    }

    async fn set_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<()> {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(customer_id).or_default();
        if quantity <= 0 {
            cart.remove(&product_id);
        } else {
            cart.insert(product_id, quantity);
        }
        Ok(())
    }

    async fn remove_ordered(
        &self,
        customer_id: Uuid,
        ordered: &BTreeMap<Uuid, i32>,
    ) -> StoreResult<()> {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.get_mut(&customer_id) {
            cart.retain(|product_id, quantity| ordered.get(product_id) != Some(quantity));
            if cart.is_empty() {
                carts.remove(&customer_id);
            }
        }
        Ok(())
    }
}
