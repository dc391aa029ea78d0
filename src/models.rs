use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Error returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Returned => "returned",
});

impl OrderStatus {
    /// Customers may withdraw an order until it leaves the warehouse.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Forward fulfillment step a reviewer may apply from this status.
    pub fn fulfillment_successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::Returned),
            OrderStatus::Cancelled | OrderStatus::Returned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Esewa,
    Khalti,
}

string_enum!(PaymentMethod, "payment method", {
    Cod => "cod",
    Esewa => "esewa",
    Khalti => "khalti",
});

impl PaymentMethod {
    /// Wallet methods settle out of band and need reviewer verification.
    pub fn requires_evidence(&self) -> bool {
        match self {
            PaymentMethod::Cod => false,
            PaymentMethod::Esewa | PaymentMethod::Khalti => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PendingVerification,
    Paid,
    Rejected,
    Failed,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    PendingVerification => "pending_verification",
    Paid => "paid",
    Rejected => "rejected",
    Failed => "failed",
});

/// Reviewer verdict on submitted payment evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// A transition the payment state machine refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payment in status `{from}` cannot {action}")]
pub struct InvalidTransition {
    pub from: PaymentStatus,
    pub action: &'static str,
}

impl PaymentStatus {
    /// Status after (re)submitting evidence. Only open payments accept evidence.
    pub fn submit_evidence(self) -> Result<PaymentStatus, InvalidTransition> {
        match self {
            PaymentStatus::Pending | PaymentStatus::PendingVerification => {
                Ok(PaymentStatus::PendingVerification)
            }
            PaymentStatus::Paid | PaymentStatus::Rejected | PaymentStatus::Failed => {
                Err(InvalidTransition {
                    from: self,
                    action: "accept evidence",
                })
            }
        }
    }

    /// Status after a reviewer verdict. `paid` and `rejected` are terminal.
    pub fn verify(self, verdict: Verdict) -> Result<PaymentStatus, InvalidTransition> {
        match (self, verdict) {
            (PaymentStatus::PendingVerification, Verdict::Approve) => Ok(PaymentStatus::Paid),
            (PaymentStatus::PendingVerification, Verdict::Reject) => Ok(PaymentStatus::Rejected),
            (
                PaymentStatus::Pending
                | PaymentStatus::Paid
                | PaymentStatus::Rejected
                | PaymentStatus::Failed,
                verdict,
            ) => Err(InvalidTransition {
                from: self,
                action: match verdict {
                    Verdict::Approve => "be approved",
                    Verdict::Reject => "be rejected",
                },
            }),
        }
    }

    /// Cash collected by the courier settles a pending COD payment.
    pub fn collect_on_delivery(self) -> Result<PaymentStatus, InvalidTransition> {
        match self {
            PaymentStatus::Pending => Ok(PaymentStatus::Paid),
            PaymentStatus::PendingVerification
            | PaymentStatus::Paid
            | PaymentStatus::Rejected
            | PaymentStatus::Failed => Err(InvalidTransition {
                from: self,
                action: "be collected on delivery",
            }),
        }
    }

    /// Status of a still-open payment whose order was withdrawn.
    pub fn abandon(self) -> Result<PaymentStatus, InvalidTransition> {
        match self {
            PaymentStatus::Pending | PaymentStatus::PendingVerification => {
                Ok(PaymentStatus::Failed)
            }
            PaymentStatus::Paid | PaymentStatus::Rejected | PaymentStatus::Failed => {
                Err(InvalidTransition {
                    from: self,
                    action: "be abandoned",
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

string_enum!(Role, "role", {
    Customer => "customer",
    Seller => "seller",
    Admin => "admin",
});

/// Catalog view of a product as the workflow needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub is_active: bool,
}

/// Session cart: product id to requested quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cart {
    pub customer_id: Uuid,
    pub entries: BTreeMap<Uuid, i32>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub shipping_city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: i64,
    pub screenshot_ref: Option<String>,
    pub transaction_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::PendingVerification,
            PaymentStatus::Paid,
            PaymentStatus::Rejected,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>(), Ok(status));
        }
        assert_eq!("pending_verification".parse(), Ok(PaymentStatus::PendingVerification));
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.kind, "payment method");
        assert!("Pending".parse::<OrderStatus>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn verification_only_leaves_pending_verification() {
        assert_eq!(
            PaymentStatus::PendingVerification.verify(Verdict::Approve),
            Ok(PaymentStatus::Paid)
        );
        assert_eq!(
            PaymentStatus::PendingVerification.verify(Verdict::Reject),
            Ok(PaymentStatus::Rejected)
        );
        assert!(PaymentStatus::Paid.verify(Verdict::Reject).is_err());
        assert!(PaymentStatus::Rejected.verify(Verdict::Approve).is_err());
        assert!(PaymentStatus::Pending.verify(Verdict::Approve).is_err());
    }

    #[test]
    fn evidence_can_be_resubmitted_until_decided() {
        assert_eq!(
            PaymentStatus::Pending.submit_evidence(),
            Ok(PaymentStatus::PendingVerification)
        );
        assert_eq!(
            PaymentStatus::PendingVerification.submit_evidence(),
            Ok(PaymentStatus::PendingVerification)
        );
        assert!(PaymentStatus::Paid.submit_evidence().is_err());
    }

    #[test]
    fn only_open_payments_are_abandoned() {
        assert_eq!(PaymentStatus::Pending.abandon(), Ok(PaymentStatus::Failed));
        assert_eq!(
            PaymentStatus::PendingVerification.abandon(),
            Ok(PaymentStatus::Failed)
        );
        let err = PaymentStatus::Paid.abandon().unwrap_err();
        assert_eq!(err.from, PaymentStatus::Paid);
        assert!(PaymentStatus::Rejected.abandon().is_err());
        assert!(PaymentStatus::Failed.abandon().is_err());
    }

    #[test]
    fn fulfillment_moves_forward_only() {
        assert_eq!(
            OrderStatus::Processing.fulfillment_successor(),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(OrderStatus::Cancelled.fulfillment_successor(), None);
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
    }
}
