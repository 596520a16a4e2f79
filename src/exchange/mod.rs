//! Task exchange between shared work queues.
//!
//! This module implements the task transition engine: the permission-gated
//! state machine that moves tasks between an outgoing (sender) list and an
//! incoming (receiver) list, the dependency-driven auto-completion cascade,
//! and the append-only audit log recording every state change. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
