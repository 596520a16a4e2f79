//! Application services for the task exchange engine.

mod exchange;

pub use exchange::{CreateTaskRequest, TaskExchangeError, TaskExchangeResult, TaskExchangeService};
