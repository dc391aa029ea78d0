use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    evidence::EvidenceUpload,
    middleware::auth::{AuthUser, ensure_customer},
    models::{OrderStatus, Payment},
    response::{ApiResponse, Meta},
    state::AppState,
    store::PaymentUpdate,
};

/// Validates and stores an evidence blob, then attaches it to the order's payment.
pub async fn submit_payment_evidence(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    upload: EvidenceUpload,
) -> AppResult<ApiResponse<Payment>> {
    ensure_customer(user)?;
    let extension = upload.validate(state.max_evidence_bytes)?;

    // fail fast before writing a blob nobody will reference
    let order = state.store.find_order(order_id).await?.ok_or(AppError::NotFound)?;
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    let payment = state
        .store
        .find_payment_by_order(order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !payment.method.requires_evidence() {
        return Err(AppError::Validation(format!(
            "{} payments do not take evidence",
            payment.method
        )));
    }
    payment.status.submit_evidence()?;

    let reference = state
        .evidence
        .put(order_id, extension, &upload.bytes)
        .await?;

    match record_payment_evidence(state, user, order_id, reference.clone(), upload.transaction_id)
        .await
    {
        Ok(response) => Ok(response),
        Err(err) => {
            if let Err(cleanup) = state.evidence.remove(&reference).await {
                tracing::warn!(
                    error = %cleanup,
                    order_id = %order_id,
                    evidence_ref = %reference,
                    "orphaned evidence blob could not be removed"
                );
            }
            Err(err)
        }
    }
}

/// Points the order's wallet payment at an already stored evidence blob and
/// queues it for review. Re-uploads overwrite the previous reference. The
/// order itself stays `pending` until a reviewer decides.
pub async fn record_payment_evidence(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    evidence_ref: String,
    transaction_id: Option<String>,
) -> AppResult<ApiResponse<Payment>> {
    ensure_customer(user)?;
    if evidence_ref.trim().is_empty() {
        return Err(AppError::Validation("evidence reference is required".into()));
    }
    let transaction_id = transaction_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let mut txn = state.store.begin().await?;

    let order = txn.find_order(order_id).await?.ok_or(AppError::NotFound)?;
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "order is {}; evidence is only accepted while it is pending",
            order.status
        )));
    }

    let mut payment = txn
        .find_payment_by_order(order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !payment.method.requires_evidence() {
        return Err(AppError::Validation(format!(
            "{} payments do not take evidence",
            payment.method
        )));
    }

    let next = payment.status.submit_evidence()?;
    let mut update = PaymentUpdate::from_payment(&payment, next, Utc::now());
    update.screenshot_ref = Some(evidence_ref);
    if transaction_id.is_some() {
        update.transaction_id = transaction_id;
    }

    if !txn
        .update_payment(payment.id, payment.status, update.clone())
        .await?
    {
        return Err(AppError::InvalidState(
            "payment changed while evidence was being recorded".into(),
        ));
    }
    txn.commit().await?;

    update.apply(&mut payment);
    tracing::info!(
        order_id = %order_id,
        payment_id = %payment.id,
        "payment evidence recorded"
    );

    Ok(ApiResponse::success(
        "Payment evidence received",
        payment,
        Some(Meta::empty()),
    ))
}
