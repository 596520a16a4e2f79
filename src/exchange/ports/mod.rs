//! Port contracts for the task exchange engine.
//!
//! Ports define infrastructure-agnostic interfaces used by exchange
//! services.

pub mod repository;

pub use repository::{ExchangeRepository, ExchangeRepositoryError, ExchangeRepositoryResult};
