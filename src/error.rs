//! Unified error taxonomy for the order-processing core.
//!
//! Every store and the worker's classifier speak this type; the gateway maps it to HTTP at the
//! edge (`gateway/types.rs::ApiError`). Keeping one enum end to end means the "business vs.
//! transient" split the worker needs is a single `match`, not exception-type sniffing.

use thiserror::Error;

use crate::core_types::{OrderId, StockId};

#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("stock {0} not found")]
    StockNotFound(StockId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: u32, available: u32 },

    #[error("version conflict on stock {0}")]
    VersionConflict(StockId),

    #[error("order already in a terminal state")]
    AlreadyTerminal,

    #[error("transient I/O error: {0}")]
    TransientIo(String),

    #[error("payment gateway timeout - please retry")]
    PaymentTimeout,

    #[error("queue is full, please try again later")]
    QueueFull,

    #[error("critical: {0}")]
    Critical(String),
}

impl CoreError {
    /// A terminal business failure: never worth retrying, always recorded as `failureReason`.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            CoreError::StockNotFound(_) | CoreError::OrderNotFound(_) | CoreError::Insufficient { .. }
        )
    }

    /// A recoverable failure the queue should retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::VersionConflict(_) | CoreError::TransientIo(_) | CoreError::PaymentTimeout
        )
    }

    /// The string recorded on `Order.failureReason` for a business failure.
    pub fn failure_reason(&self) -> String {
        self.to_string()
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::TransientIo(err.to_string())
    }
}
