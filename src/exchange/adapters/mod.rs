//! Persistence adapters for the exchange engine.
//!
//! This module provides concrete implementations of the
//! [`ExchangeRepository`] port, following hexagonal architecture
//! principles. Adapters handle all infrastructure concerns while the
//! domain remains pure.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryExchangeRepository`]: Thread-safe in-memory storage
//!
//! [`ExchangeRepository`]: crate::exchange::ports::ExchangeRepository

pub mod memory;
