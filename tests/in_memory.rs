//! In-memory repository integration tests.
//!
//! Tests are organized into modules by functionality:
//! - `exchange_flow_tests`: End-to-end handoff, rejection, and cascade flows
//! - `repository_tests`: Store-level guarantees (versioning, uniqueness,
//!   delete cleanup, event ordering)

mod in_memory {
    pub mod helpers;

    mod exchange_flow_tests;
    mod repository_tests;
}
