//! Payment capture, abstracted behind a trait so the order worker never has to know whether it
//! is talking to a real gateway or the development stand-in.
//!
//! Grounded on the `async_trait`-object pattern the teacher uses for exchange connectors in
//! `market/`, generalized to a one-method capture interface.

use async_trait::async_trait;
use rand::Rng;

use crate::config::PaymentConfig;
use crate::core_types::OrderId;
use crate::error::CoreError;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Captures payment for an order. A timeout or other transient failure must be reported as
    /// `CoreError::PaymentTimeout`/`CoreError::TransientIo` so the worker retries; anything that
    /// will never succeed on retry belongs in one of the business-failure variants instead.
    async fn capture(&self, order_id: OrderId) -> Result<(), CoreError>;
}

/// Production default: payment capture is out of scope for this core (handled upstream or by a
/// separate service) so this simply succeeds.
pub struct NoopPaymentGateway;

#[async_trait]
impl PaymentGateway for NoopPaymentGateway {
    async fn capture(&self, _order_id: OrderId) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Dev/test gateway that injects timeouts at a configurable rate, so the retry and compensation
/// paths can be exercised without a real payment provider.
pub struct SimulatedPaymentGateway {
    config: PaymentConfig,
}

impl SimulatedPaymentGateway {
    pub fn new(config: PaymentConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn capture(&self, _order_id: OrderId) -> Result<(), CoreError> {
        if rand::thread_rng().r#gen::<f64>() < self.config.failure_probability {
            return Err(CoreError::PaymentTimeout);
        }
        Ok(())
    }
}
