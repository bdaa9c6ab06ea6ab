//! Order processing core — a concurrent order-fulfillment service for an e-commerce ordering
//! flow.
//!
//! # Modules
//!
//! - [`core_types`] — shared identifiers (`ProductId`, `StockId`, `OrderId`, `JobId`, `UserId`)
//! - [`config`] — environment-driven runtime configuration
//! - [`error`] — the unified `CoreError` taxonomy
//! - [`logging`] — structured logging setup
//! - [`persistence`] — Postgres pool + schema bootstrap
//! - [`stock`] — Stock Store (C1): CAS-guarded reservation, plus the product catalog
//! - [`order`] — Order Store (C2): the order state machine
//! - [`queue`] — Priority Job Queue (C3)
//! - [`intake`] — Order Intake (C4)
//! - [`worker`] — Order Worker (C5): the job handler and worker pool
//! - [`dlq`] — Dead Letter Queue observer (C6)
//! - [`user_auth`] — registration, login, JWT issuance/verification
//! - [`gateway`] — the HTTP surface

pub mod core_types;

pub mod config;
pub mod error;
pub mod logging;
pub mod persistence;

pub mod stock;

pub mod order;

pub mod queue;

pub mod intake;
pub mod worker;

pub mod dlq;

pub mod user_auth;

pub mod gateway;

pub use core_types::{AuthenticatedUser, JobId, OrderId, ProductId, StockId, UserId};
pub use error::CoreError;
