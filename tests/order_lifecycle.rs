mod common;

use std::time::Duration;

use common::{admin, customer, harness, seller};
use storefront_orders::{
    dto::cart::SetCartQuantityRequest,
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, order_service, review_service},
    store::OrderStore,
};
use uuid::Uuid;

#[tokio::test]
async fn customers_list_only_their_orders() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let neighbour = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 50).await;

    let first = h.order(&buyer, &bowl, 1, "cod").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.order(&buyer, &bowl, 2, "esewa").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = h.order(&buyer, &bowl, 3, "cod").await;
    h.order(&neighbour, &bowl, 1, "cod").await;
    order_service::cancel_order(&h.state, &buyer, second.order.id)
        .await
        .unwrap();

    let newest_first = order_service::list_orders(&h.state, &buyer, OrderListQuery::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = newest_first
        .data
        .unwrap()
        .items
        .iter()
        .map(|order| order.id)
        .collect();
    assert_eq!(ids, vec![third.order.id, second.order.id, first.order.id]);
    assert_eq!(newest_first.meta.unwrap().total, Some(3));

    let page = order_service::list_orders(
        &h.state,
        &buyer,
        OrderListQuery {
            page: Some(2),
            per_page: Some(2),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let items = page.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, third.order.id);

    let cancelled = order_service::list_orders(
        &h.state,
        &buyer,
        OrderListQuery {
            status: Some("cancelled".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .data
    .unwrap()
    .items;
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, second.order.id);

    let err = order_service::list_orders(
        &h.state,
        &buyer,
        OrderListQuery {
            status: Some("lost".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn order_detail_is_private_to_its_customer() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let placed = h.order(&buyer, &bowl, 2, "khalti").await;

    let detail = order_service::get_order(&h.state, &buyer, placed.order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(detail.order, placed.order);
    assert_eq!(detail.items, placed.items);
    assert_eq!(detail.payment, placed.payment);

    let err = order_service::get_order(&h.state, &customer(), placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn cash_on_delivery_cancellation_releases_stock_and_keeps_payment() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let placed = h.order(&buyer, &bowl, 4, "cod").await;
    assert_eq!(h.stock_of(bowl.id).await, 6);

    let err = order_service::cancel_order(&h.state, &customer(), placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let cancelled = order_service::cancel_order(&h.state, &buyer, placed.order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.stock_of(bowl.id).await, 10);
    assert_eq!(h.payment_of(placed.order.id).await.status, PaymentStatus::Pending);

    let err = order_service::cancel_order(&h.state, &buyer, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(h.stock_of(bowl.id).await, 10);
}

#[tokio::test]
async fn cash_on_delivery_fulfillment_settles_payment() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let placed = h.order(&buyer, &bowl, 2, "cod").await;
    let order_id = placed.order.id;

    let err = review_service::advance_order_status(&h.state, &shop, order_id, "shipped")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    for step in ["processing", "shipped"] {
        let order = review_service::advance_order_status(&h.state, &shop, order_id, step)
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(order.status.as_str(), step);
    }
    assert_eq!(h.payment_of(order_id).await.status, PaymentStatus::Pending);

    let err = order_service::cancel_order(&h.state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    review_service::advance_order_status(&h.state, &shop, order_id, "delivered")
        .await
        .unwrap();
    let payment = h.payment_of(order_id).await;
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.verified_by, Some(shop.user_id));
    assert_eq!(h.stock_of(bowl.id).await, 8);

    review_service::advance_order_status(&h.state, &admin(), order_id, "returned")
        .await
        .unwrap();
    let order = h.store.find_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Returned);
    assert_eq!(h.stock_of(bowl.id).await, 10);

    let err = review_service::advance_order_status(&h.state, &admin(), order_id, "processing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn wallet_orders_wait_for_payment_approval() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let reviewer = admin();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let (placed, payment) = h.order_with_evidence(&buyer, &bowl, 1).await;

    let err = review_service::advance_order_status(&h.state, &reviewer, placed.order.id, "processing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    review_service::approve_payment(&h.state, &reviewer, payment.id)
        .await
        .unwrap();
    let shipped = review_service::advance_order_status(&h.state, &reviewer, placed.order.id, "shipped")
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    review_service::advance_order_status(&h.state, &reviewer, placed.order.id, "delivered")
        .await
        .unwrap();
    assert_eq!(h.payment_of(placed.order.id).await.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn status_updates_validate_input_and_reviewer() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 10).await;
    let placed = h.order(&buyer, &bowl, 1, "cod").await;

    let err = review_service::advance_order_status(&h.state, &shop, placed.order.id, "teleported")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = review_service::advance_order_status(&h.state, &seller(), placed.order.id, "processing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = review_service::advance_order_status(&h.state, &buyer, placed.order.id, "processing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn cart_quantities_and_pricing() {
    let h = harness();
    let shop = seller();
    let buyer = customer();
    let bowl = h.product(shop.user_id, "Singing Bowl", 50_000, 2).await;
    let tea = h.product(shop.user_id, "Ilam Green Tea", 90_000, 10).await;

    cart_service::set_cart_quantity(
        &h.state,
        &buyer,
        SetCartQuantityRequest {
            product_id: bowl.id,
            quantity: 3,
        },
    )
    .await
    .unwrap();
    let view = cart_service::set_cart_quantity(
        &h.state,
        &buyer,
        SetCartQuantityRequest {
            product_id: tea.id,
            quantity: 1,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();

    assert_eq!(view.items.len(), 2);
    assert_eq!(view.subtotal, 240_000);
    let bowl_line = view
        .items
        .iter()
        .find(|line| line.product_id == bowl.id)
        .unwrap();
    assert!(!bowl_line.in_stock);

    let view = cart_service::set_cart_quantity(
        &h.state,
        &buyer,
        SetCartQuantityRequest {
            product_id: bowl.id,
            quantity: 0,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.subtotal, 90_000);

    let err = cart_service::set_cart_quantity(
        &h.state,
        &buyer,
        SetCartQuantityRequest {
            product_id: tea.id,
            quantity: -1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = cart_service::set_cart_quantity(
        &h.state,
        &buyer,
        SetCartQuantityRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
