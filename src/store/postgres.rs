use std::{collections::BTreeMap, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{
    CartStore, OrderFilter, OrderStore, PaymentUpdate, StockAdjustment, StockChange, StoreError,
    StoreResult, StoreTxn,
};
use crate::{
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        order_items::{
            self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    models::{
        Cart, Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product, UnknownVariant,
    },
};

/// Order store backed by PostgreSQL through sea-orm.
#[derive(Clone)]
pub struct PostgresStore {
    conn: DatabaseConnection,
}

impl PostgresStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTxn>> {
        let txn = self.conn.begin().await?;
        Ok(Box::new(PostgresTxn { txn }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let product = Products::find_by_id(id).one(&self.conn).await?;
        Ok(product.map(product_from_entity))
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let mut finder = Orders::find().filter(OrderCol::CustomerId.eq(filter.customer_id));
        if let Some(status) = filter.status {
            finder = finder.filter(OrderCol::Status.eq(status.as_str()));
        }
        finder = if filter.newest_first {
            finder.order_by_desc(OrderCol::CreatedAt)
        } else {
            finder.order_by_asc(OrderCol::CreatedAt)
        };

        let total = finder.clone().count(&self.conn).await?;
        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((orders, total))
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::ProductId)
            .all(&self.conn)
            .await?;
        Ok(items.into_iter().map(order_item_from_entity).collect())
    }

    async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Payments::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>> {
        Payments::find()
            .filter(PaymentCol::OrderId.eq(order_id))
            .one(&self.conn)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn list_payments(
        &self,
        status: PaymentStatus,
        seller_id: Option<Uuid>,
    ) -> StoreResult<Vec<Payment>> {
        let mut finder = Payments::find()
            .filter(PaymentCol::Status.eq(status.as_str()))
            .order_by_asc(PaymentCol::CreatedAt);

        if let Some(seller_id) = seller_id {
            let seller_orders = OrderItems::find()
                .select_only()
                .column(OrderItemCol::OrderId)
                .join(JoinType::InnerJoin, order_items::Relation::Products.def())
                .filter(ProdCol::SellerId.eq(seller_id))
                .into_query();
            finder = finder.filter(PaymentCol::OrderId.in_subquery(seller_orders));
        }

        finder
            .all(&self.conn)
            .await?
            .into_iter()
            .map(payment_from_entity)
            .collect()
    }

    async fn order_has_seller_product(&self, order_id: Uuid, seller_id: Uuid) -> StoreResult<bool> {
        let matches = OrderItems::find()
            .join(JoinType::InnerJoin, order_items::Relation::Products.def())
            .filter(OrderItemCol::OrderId.eq(order_id))
            .filter(ProdCol::SellerId.eq(seller_id))
            .count(&self.conn)
            .await?;
        Ok(matches > 0)
    }
}

struct PostgresTxn {
    txn: DatabaseTransaction,
}

#[async_trait]
impl StoreTxn for PostgresTxn {
    async fn find_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
        let product = Products::find_by_id(id).one(&self.txn).await?;
        Ok(product.map(product_from_entity))
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        change: StockChange,
    ) -> StoreResult<StockAdjustment> {
        let update = Products::update_many().filter(ProdCol::Id.eq(product_id));
        let update = match change {
            // floor check and decrement in one statement so racing checkouts cannot oversell
            StockChange::Reserve(quantity) => update
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
                .filter(ProdCol::Stock.gte(quantity)),
            StockChange::Release(quantity) => {
                update.col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
            }
        };

        let result = update.exec(&self.txn).await?;
        if result.rows_affected == 0 {
            Ok(StockAdjustment::Insufficient)
        } else {
            Ok(StockAdjustment::Applied)
        }
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        OrderActive {
            id: Set(order.id),
            customer_id: Set(order.customer_id),
            subtotal: Set(order.subtotal),
            shipping_cost: Set(order.shipping_cost),
            total_amount: Set(order.total_amount),
            status: Set(order.status.as_str().to_string()),
            shipping_address: Set(order.shipping_address.clone()),
            shipping_city: Set(order.shipping_city.clone()),
            created_at: Set(order.created_at.into()),
            updated_at: Set(order.updated_at.into()),
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        OrderItemActive {
            id: Set(item.id),
            order_id: Set(item.order_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            created_at: Set(item.created_at.into()),
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        PaymentActive {
            id: Set(payment.id),
            order_id: Set(payment.order_id),
            method: Set(payment.method.as_str().to_string()),
            status: Set(payment.status.as_str().to_string()),
            amount: Set(payment.amount),
            screenshot_ref: Set(payment.screenshot_ref.clone()),
            transaction_id: Set(payment.transaction_id.clone()),
            rejection_reason: Set(payment.rejection_reason.clone()),
            verified_by: Set(payment.verified_by),
            verified_at: Set(payment.verified_at.map(Into::into)),
            created_at: Set(payment.created_at.into()),
            updated_at: Set(payment.updated_at.into()),
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
        Orders::find_by_id(id)
            .lock(LockType::Update)
            .one(&self.txn)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn order_items(&mut self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::ProductId)
            .all(&self.txn)
            .await?;
        Ok(items.into_iter().map(order_item_from_entity).collect())
    }

    async fn find_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
        Payments::find_by_id(id)
            .lock(LockType::Update)
            .one(&self.txn)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn find_payment_by_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>> {
        Payments::find()
            .filter(PaymentCol::OrderId.eq(order_id))
            .lock(LockType::Update)
            .one(&self.txn)
            .await?
            .map(payment_from_entity)
            .transpose()
    }

    async fn transition_order(
        &mut self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(next.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(at))
            .filter(OrderCol::Id.eq(order_id))
            .filter(OrderCol::Status.eq(expected.as_str()))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> StoreResult<bool> {
        let result = Payments::update_many()
            .col_expr(PaymentCol::Status, Expr::value(update.status.as_str()))
            .col_expr(PaymentCol::ScreenshotRef, Expr::value(update.screenshot_ref))
            .col_expr(PaymentCol::TransactionId, Expr::value(update.transaction_id))
            .col_expr(PaymentCol::RejectionReason, Expr::value(update.rejection_reason))
            .col_expr(PaymentCol::VerifiedBy, Expr::value(update.verified_by))
            .col_expr(PaymentCol::VerifiedAt, Expr::value(update.verified_at))
            .col_expr(PaymentCol::UpdatedAt, Expr::value(update.updated_at))
            .filter(PaymentCol::Id.eq(payment_id))
            .filter(PaymentCol::Status.eq(expected.as_str()))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit().await?;
        Ok(())
    }
}

/// Cart lines kept in the `cart_items` table.
#[derive(Clone)]
pub struct PostgresCartStore {
    conn: DatabaseConnection,
}

impl PostgresCartStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn read_cart(&self, customer_id: Uuid) -> StoreResult<Cart> {
        let rows = CartItems::find()
            .filter(CartCol::CustomerId.eq(customer_id))
            .all(&self.conn)
            .await?;
        Ok(Cart {
            customer_id,
            entries: rows
                .into_iter()
                .map(|row| (row.product_id, row.quantity))
                .collect(),
        })
    }

    async fn set_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<()> {
        if quantity <= 0 {
            CartItems::delete_many()
                .filter(CartCol::CustomerId.eq(customer_id))
                .filter(CartCol::ProductId.eq(product_id))
                .exec(&self.conn)
                .await?;
            return Ok(());
        }

        let line = CartActive {
            customer_id: Set(customer_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            updated_at: Set(Utc::now().into()),
        };
        CartItems::insert(line)
            .on_conflict(
                OnConflict::columns([CartCol::CustomerId, CartCol::ProductId])
                    .update_columns([CartCol::Quantity, CartCol::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn remove_ordered(
        &self,
        customer_id: Uuid,
        ordered: &BTreeMap<Uuid, i32>,
    ) -> StoreResult<()> {
        if ordered.is_empty() {
            return Ok(());
        }
        let lines = ordered
            .iter()
            .fold(Condition::any(), |lines, (&product_id, &quantity)| {
                lines.add(
                    Condition::all()
                        .add(CartCol::ProductId.eq(product_id))
                        .add(CartCol::Quantity.eq(quantity)),
                )
            });
        CartItems::delete_many()
            .filter(CartCol::CustomerId.eq(customer_id))
            .filter(lines)
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}

fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|err: UnknownVariant| StoreError::Corrupt(err.to_string()))
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        seller_id: model.seller_id,
        name: model.name,
        price: model.price,
        stock: model.stock,
        is_active: model.is_active,
    }
}

fn order_from_entity(model: OrderModel) -> StoreResult<Order> {
    Ok(Order {
        id: model.id,
        customer_id: model.customer_id,
        subtotal: model.subtotal,
        shipping_cost: model.shipping_cost,
        total_amount: model.total_amount,
        status: parse_column(&model.status)?,
        shipping_address: model.shipping_address,
        shipping_city: model.shipping_city,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn payment_from_entity(model: PaymentModel) -> StoreResult<Payment> {
    Ok(Payment {
        id: model.id,
        order_id: model.order_id,
        method: parse_column(&model.method)?,
        status: parse_column(&model.status)?,
        amount: model.amount,
        screenshot_ref: model.screenshot_ref,
        transaction_id: model.transaction_id,
        rejection_reason: model.rejection_reason,
        verified_by: model.verified_by,
        verified_at: model.verified_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
