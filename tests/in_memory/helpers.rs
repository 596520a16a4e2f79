//! Shared test helpers for in-memory exchange integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use taskrelay::exchange::{
    adapters::memory::InMemoryExchangeRepository,
    domain::{Actor, Task, TaskState, UserId},
    services::{CreateTaskRequest, TaskExchangeService},
};

/// Service type used throughout the integration tests.
pub type TestService = TaskExchangeService<InMemoryExchangeRepository, DefaultClock>;

/// An in-memory repository shared between the service and direct
/// store-level assertions.
pub struct TestExchange {
    /// The backing repository, for store-level assertions.
    pub repository: Arc<InMemoryExchangeRepository>,
    /// The service under test.
    pub service: TestService,
}

/// Provides a fresh exchange for each test.
#[fixture]
pub fn exchange() -> TestExchange {
    let repository = Arc::new(InMemoryExchangeRepository::new());
    let service = TaskExchangeService::new(Arc::clone(&repository), Arc::new(DefaultClock));
    TestExchange {
        repository,
        service,
    }
}

/// A sender, a receiver, and a task the sender posted to the receiver's
/// list.
pub struct HandoffSetup {
    /// The sending user, admin of the outgoing list.
    pub sender: Actor,
    /// The receiving user, admin of the incoming list.
    pub receiver: Actor,
    /// The task sitting in the receiver's inbox.
    pub task: Task,
}

/// Creates two users, a list for each, and a handoff task between them.
///
/// # Errors
///
/// Returns an error when list or task creation fails.
pub async fn set_up_handoff(service: &TestService) -> eyre::Result<HandoffSetup> {
    let sender = Actor::User(UserId::new());
    let receiver = Actor::User(UserId::new());
    let outgoing = service.create_list(sender, "Sent").await?;
    let incoming = service.create_list(receiver, "Inbox").await?;
    let task = service
        .create_task(
            CreateTaskRequest::new(sender, incoming.id())
                .with_outgoing(outgoing.id())
                .with_title("Quarterly report"),
        )
        .await?;
    Ok(HandoffSetup {
        sender,
        receiver,
        task,
    })
}

/// Reads a task's current state through the service.
///
/// # Errors
///
/// Returns an error when the task no longer exists.
pub async fn current_state(service: &TestService, task: &Task) -> eyre::Result<TaskState> {
    let fetched = service
        .task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task {} vanished", task.id()))?;
    Ok(fetched.state())
}
