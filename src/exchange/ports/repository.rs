//! Repository port for task, list, and audit event persistence.

use crate::exchange::domain::{ListId, ListSlug, Task, TaskEvent, TaskId, TaskList};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for exchange repository operations.
pub type ExchangeRepositoryResult<T> = Result<T, ExchangeRepositoryError>;

/// Store contract for the exchange engine.
///
/// The engine needs only point reads, point writes, and simple filtered
/// scans; anything that can satisfy this trait can back the engine.
#[async_trait]
pub trait ExchangeRepository: Send + Sync {
    /// Stores a new task list.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::DuplicateList`] when the list ID
    /// already exists or [`ExchangeRepositoryError::DuplicateSlug`] when the
    /// slug is taken.
    async fn store_list(&self, list: &TaskList) -> ExchangeRepositoryResult<()>;

    /// Persists changes to an existing list (title, slug, membership,
    /// public flags).
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::ListNotFound`] when the list does
    /// not exist or [`ExchangeRepositoryError::DuplicateSlug`] when a slug
    /// change collides with another list.
    async fn update_list(&self, list: &TaskList) -> ExchangeRepositoryResult<()>;

    /// Finds a list by identifier.
    ///
    /// Returns `None` when the list does not exist.
    async fn list(&self, id: ListId) -> ExchangeRepositoryResult<Option<TaskList>>;

    /// Finds a list by slug.
    ///
    /// Returns `None` when no list carries the slug.
    async fn list_by_slug(&self, slug: &ListSlug) -> ExchangeRepositoryResult<Option<TaskList>>;

    /// Stores a new task together with its creation audit event.
    ///
    /// The two writes succeed or fail together.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::DuplicateTask`] when the task ID
    /// already exists.
    async fn store_task(&self, task: &Task, created: &TaskEvent) -> ExchangeRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn task(&self, id: TaskId) -> ExchangeRepositoryResult<Option<Task>>;

    /// Atomically appends a state-change event and commits the updated
    /// task, guarded by the task's optimistic version.
    ///
    /// `task` must carry the version the caller read; the stored copy is
    /// written with that version incremented. Event append and task update
    /// succeed or fail together.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::TaskNotFound`] when the task does
    /// not exist and [`ExchangeRepositoryError::VersionConflict`] when
    /// another commit won the race; callers refetch and retry.
    async fn commit_transition(
        &self,
        task: &Task,
        event: &TaskEvent,
    ) -> ExchangeRepositoryResult<()>;

    /// Records that `dependent` must wait for `dependency`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::TaskNotFound`] when either task
    /// does not exist.
    async fn link_dependency(
        &self,
        dependent: TaskId,
        dependency: TaskId,
    ) -> ExchangeRepositoryResult<()>;

    /// Hard-deletes a task, its audit events, and every adjacency edge
    /// pointing at it.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::TaskNotFound`] when the task does
    /// not exist.
    async fn delete_task(&self, id: TaskId) -> ExchangeRepositoryResult<()>;

    /// Returns the tasks that depend on `dependency`, are flagged for
    /// auto-finish, and are still in a pre-terminal state.
    async fn autofinish_dependents(
        &self,
        dependency: TaskId,
    ) -> ExchangeRepositoryResult<Vec<Task>>;

    /// Returns the audit events for a task, oldest first.
    ///
    /// Unknown tasks yield an empty sequence.
    async fn events(&self, task_id: TaskId) -> ExchangeRepositoryResult<Vec<TaskEvent>>;
}

/// Errors returned by exchange repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ExchangeRepositoryError {
    /// A list with the same identifier already exists.
    #[error("duplicate list identifier: {0}")]
    DuplicateList(ListId),

    /// A list with the same slug already exists.
    #[error("duplicate list slug: {0}")]
    DuplicateSlug(ListSlug),

    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The list was not found.
    #[error("list not found: {0}")]
    ListNotFound(ListId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A commit carried a stale optimistic version.
    #[error("version conflict on task {task_id}: store holds version {stored}")]
    VersionConflict {
        /// The task whose commit was rejected.
        task_id: TaskId,
        /// The version currently held by the store.
        stored: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ExchangeRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
