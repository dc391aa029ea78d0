use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::{StockAdjustment, StockChange, StoreTxn},
};

pub mod cart_service;
pub mod checkout_service;
pub mod order_service;
pub mod payment_service;
pub mod review_service;

/// Compensating step for abandoned orders: every item's quantity goes back
/// into its product's stock, inside the caller's transaction.
pub(crate) async fn release_order_stock(txn: &mut dyn StoreTxn, order_id: Uuid) -> AppResult<()> {
    for item in txn.order_items(order_id).await? {
        match txn
            .adjust_stock(item.product_id, StockChange::Release(item.quantity))
            .await?
        {
            StockAdjustment::Applied => {}
            StockAdjustment::Insufficient => {
                return Err(AppError::InvalidState(format!(
                    "product {} of order {order_id} no longer exists",
                    item.product_id
                )));
            }
        }
    }
    Ok(())
}
