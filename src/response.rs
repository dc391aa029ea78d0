use serde::Serialize;
use utoipa::ToSchema;

/// Paging details for list responses. Single-item responses send an empty one.
#[derive(Debug, Serialize, ToSchema, Clone, Default)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    /// A listing returned whole, as a single page of `total` rows.
    pub fn unpaged(total: usize) -> Self {
        let total = i64::try_from(total).unwrap_or(i64::MAX);
        Self::new(1, total, total)
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Envelope shared by every JSON response. Failures carry an [`ErrorBody`]
/// in `data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// True when the same request may succeed if sent again, e.g. after a stock race.
    pub retryable: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<ErrorBody> {
    pub fn failure(message: impl Into<String>, retryable: bool) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorBody {
                error: message.clone(),
                retryable,
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}
