use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::Role,
    store::{OrderStore, StoreResult},
};

/// Identity header set by the upstream gateway after authentication.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn seller(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Seller,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_customer(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Customer)
}

/// Sellers and admins may review payments and move orders through fulfillment.
pub fn ensure_reviewer(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        Role::Seller | Role::Admin => Ok(()),
        Role::Customer => Err(AppError::Forbidden),
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header_value(parts, USER_ID_HEADER)?.trim())
            .map_err(|_| AppError::Validation("Invalid user id header".into()))?;
        let role = header_value(parts, USER_ROLE_HEADER)?
            .trim()
            .parse::<Role>()
            .map_err(|err| AppError::Validation(err.to_string()))?;

        Ok(AuthUser { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Validation(format!("Missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Validation(format!("Invalid {name} header")))
}

/// Decides whether a reviewer may act on a given order.
#[async_trait]
pub trait ReviewerAuthorizer: Send + Sync {
    async fn is_authorized_reviewer(&self, reviewer: &AuthUser, order_id: Uuid) -> StoreResult<bool>;
}

/// Admins review everything; a seller reviews orders holding at least one of
/// their own products.
#[derive(Clone)]
pub struct CatalogReviewerAuthorizer {
    store: Arc<dyn OrderStore>,
}

impl CatalogReviewerAuthorizer {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReviewerAuthorizer for CatalogReviewerAuthorizer {
    async fn is_authorized_reviewer(&self, reviewer: &AuthUser, order_id: Uuid) -> StoreResult<bool> {
        match reviewer.role {
            Role::Admin => Ok(true),
            Role::Seller => {
                self.store
                    .order_has_seller_product(order_id, reviewer.user_id)
                    .await
            }
            Role::Customer => Ok(false),
        }
    }
}
