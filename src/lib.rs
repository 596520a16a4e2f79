//! Taskrelay: a task exchange engine.
//!
//! This crate implements the core of a task exchange system: users trade
//! units of work between shared task lists they own, post to, or observe,
//! and each task moves through a four-state lifecycle under asymmetric
//! permissions: the sender and the receiver of a task control different
//! transitions.
//!
//! # Architecture
//!
//! Taskrelay follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`exchange`]: Task lists, the permission-gated transition engine, the
//!   dependency-driven auto-completion cascade, and the append-only audit
//!   log

pub mod exchange;
