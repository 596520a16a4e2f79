//! In-memory adapter implementations.
//!
//! A simple, thread-safe store suitable for tests and single-process
//! embedding without database dependencies.

mod exchange;

pub use exchange::InMemoryExchangeRepository;
