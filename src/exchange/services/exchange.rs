//! Transition executor, dependency cascade engine, and creation entry
//! points.

use crate::exchange::{
    domain::{
        Actor, Initiator, InvalidOperation, ListId, ListSlug, PermissionDenied, Role, RoleSet,
        Task, TaskEvent, TaskId, TaskList, TaskState, TransitionOption, TransitionTarget,
        ValidationError, allowed_transitions,
    },
    ports::{ExchangeRepository, ExchangeRepositoryError},
};
use mockable::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Bound on refetch-and-retry rounds when a transition commit loses a
/// version race.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Bound on slug regeneration rounds when a generated slug collides.
const MAX_SLUG_ATTEMPTS: u32 = 3;

/// Service-level errors for exchange operations.
#[derive(Debug, Error)]
pub enum TaskExchangeError {
    /// List title or slug input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller is not authorized for the operation.
    #[error(transparent)]
    Permission(#[from] PermissionDenied),

    /// Delete was requested without permission or without a human
    /// initiator.
    #[error("task {task_id} cannot be deleted from state {state} by this initiator")]
    InvalidTarget {
        /// The task the delete was requested for.
        task_id: TaskId,
        /// The task's current state.
        state: TaskState,
    },

    /// An engine-internal precondition was violated.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ExchangeRepositoryError),
}

/// Result type for exchange service operations.
pub type TaskExchangeResult<T> = Result<T, TaskExchangeError>;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    actor: Actor,
    outgoing: Option<ListId>,
    incoming: ListId,
    title: Option<String>,
    notes: Option<String>,
    auto_close: bool,
    auto_finish: bool,
    dependent_of: Option<TaskId>,
}

impl CreateTaskRequest {
    /// Creates a request addressed to `incoming`.
    #[must_use]
    pub const fn new(actor: Actor, incoming: ListId) -> Self {
        Self {
            actor,
            outgoing: None,
            incoming,
            title: None,
            notes: None,
            auto_close: false,
            auto_finish: false,
            dependent_of: None,
        }
    }

    /// Names the outgoing (sender) list. The actor must hold admin on it.
    #[must_use]
    pub const fn with_outgoing(mut self, outgoing: ListId) -> Self {
        self.outgoing = Some(outgoing);
        self
    }

    /// Sets the task title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the task notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Flags the task to close automatically when finished.
    #[must_use]
    pub const fn with_auto_close(mut self) -> Self {
        self.auto_close = true;
        self
    }

    /// Flags the task to finish automatically once its dependencies are
    /// terminal.
    #[must_use]
    pub const fn with_auto_finish(mut self) -> Self {
        self.auto_finish = true;
        self
    }

    /// Records the task this one is created as a dependency of.
    ///
    /// Title and notes default from that task when not given explicitly,
    /// and the new task's id is added to its adjacency set.
    #[must_use]
    pub const fn with_dependent_of(mut self, dependent_of: TaskId) -> Self {
        self.dependent_of = Some(dependent_of);
        self
    }
}

/// Outcome of one applied change, before cascading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    /// The target equalled the current state; nothing was written.
    NoOp,
    /// The task and its events were hard-deleted.
    Deleted,
    /// A transition was committed.
    Transitioned {
        /// The state the task settled in.
        state: TaskState,
    },
}

/// Task exchange orchestration service.
///
/// Owns the transition executor and the dependency cascade: a
/// [`change_state`](Self::change_state) call returns only once every
/// reachable auto-finish and auto-close has been applied, so callers
/// observe a fully settled system.
#[derive(Clone)]
pub struct TaskExchangeService<R, C>
where
    R: ExchangeRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskExchangeService<R, C>
where
    R: ExchangeRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new exchange service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a new list owned by the acting user.
    ///
    /// The list gets a generated slug; a collision with an existing slug is
    /// retried with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionDenied::AuthenticationRequired`] for anonymous
    /// actors, [`ValidationError::EmptyListTitle`] for blank titles, and
    /// repository errors on persistence failure.
    pub async fn create_list(
        &self,
        actor: Actor,
        title: impl Into<String> + Send,
    ) -> TaskExchangeResult<TaskList> {
        let Some(owner) = actor.user_id() else {
            return Err(PermissionDenied::AuthenticationRequired.into());
        };
        let raw_title = title.into();
        let trimmed = raw_title.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyListTitle.into());
        }
        let mut attempts = 0;
        loop {
            let list = TaskList::new(owner, trimmed, &*self.clock);
            match self.repository.store_list(&list).await {
                Ok(()) => return Ok(list),
                Err(ExchangeRepositoryError::DuplicateSlug(_))
                    if attempts < MAX_SLUG_ATTEMPTS =>
                {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Changes a list's display title.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionDenied::ListAdminRequired`] when the actor is
    /// not an admin and [`ValidationError::EmptyListTitle`] for blank
    /// input.
    pub async fn rename_list(
        &self,
        actor: Actor,
        list_id: ListId,
        title: &str,
    ) -> TaskExchangeResult<TaskList> {
        let mut list = self.require_list(list_id).await?;
        if !list.roles(actor).contains(Role::Admin) {
            return Err(PermissionDenied::ListAdminRequired { list_id }.into());
        }
        list.rename(title, &*self.clock)?;
        self.repository.update_list(&list).await?;
        Ok(list)
    }

    /// Changes a list's slug.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed input,
    /// [`PermissionDenied::ListAdminRequired`] when the actor is not an
    /// admin, and [`ExchangeRepositoryError::DuplicateSlug`] when the slug
    /// is taken.
    pub async fn change_list_slug(
        &self,
        actor: Actor,
        list_id: ListId,
        slug: &str,
    ) -> TaskExchangeResult<TaskList> {
        let parsed = ListSlug::new(slug)?;
        let mut list = self.require_list(list_id).await?;
        if !list.roles(actor).contains(Role::Admin) {
            return Err(PermissionDenied::ListAdminRequired { list_id }.into());
        }
        list.change_slug(parsed, &*self.clock);
        self.repository.update_list(&list).await?;
        Ok(list)
    }

    /// Creates a new task.
    ///
    /// The actor must hold admin on the outgoing list when one is named
    /// (anonymous tasks name none) and post on the incoming list. A
    /// self-assigned task starts `Active`; everything else starts `Inbox`.
    /// A `Created` audit event is always appended.
    ///
    /// # Errors
    ///
    /// Returns a [`PermissionDenied`] variant when the actor lacks the
    /// required role and repository errors when a referenced list or task
    /// is absent.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskExchangeResult<Task> {
        if let Some(outgoing_id) = request.outgoing {
            let outgoing_list = self.require_list(outgoing_id).await?;
            if !outgoing_list.roles(request.actor).contains(Role::Admin) {
                return Err(PermissionDenied::OutgoingAdminRequired {
                    list_id: outgoing_id,
                }
                .into());
            }
        }
        let incoming_list = self.require_list(request.incoming).await?;
        if !incoming_list.roles(request.actor).contains(Role::Post) {
            return Err(PermissionDenied::PostNotPermitted {
                list_id: request.incoming,
            }
            .into());
        }

        let parent = match request.dependent_of {
            Some(parent_id) => Some(self.require_task(parent_id).await?),
            None => None,
        };

        let mut task = Task::new(
            request.actor.user_id(),
            request.outgoing,
            request.incoming,
            &*self.clock,
        );
        match (request.title, &parent) {
            (Some(explicit), _) => task = task.with_title(explicit),
            (None, Some(from_parent)) => task = task.with_title(from_parent.title()),
            (None, None) => {}
        }
        match (request.notes, &parent) {
            (Some(explicit), _) => task = task.with_notes(explicit),
            (None, Some(from_parent)) => task = task.with_notes(from_parent.notes()),
            (None, None) => {}
        }
        if request.auto_close {
            task = task.with_auto_close();
        }
        if request.auto_finish {
            task = task.with_auto_finish();
        }

        let event = TaskEvent::created(
            task.id(),
            request.actor.user_id(),
            request.outgoing,
            request.incoming,
            request.dependent_of,
            &*self.clock,
        );
        self.repository.store_task(&task, &event).await?;
        if let Some(from_parent) = &parent {
            self.repository
                .link_dependency(from_parent.id(), task.id())
                .await?;
        }
        Ok(task)
    }

    /// Returns the transitions `actor` may currently invoke on a task,
    /// sorted for deterministic display.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the task or one of its lists is
    /// absent.
    pub async fn allowed_transitions(
        &self,
        task_id: TaskId,
        actor: Actor,
    ) -> TaskExchangeResult<Vec<TransitionOption>> {
        let task = self.require_task(task_id).await?;
        let (in_roles, out_roles) = self.resolve_roles(&task, actor).await?;
        Ok(allowed_transitions(&task, in_roles, out_roles))
    }

    /// Executes a state change, then settles every cascade it triggers.
    ///
    /// A no-op request (target equals the current state) writes nothing.
    /// Human-initiated transitions are validated against the transition
    /// matrix; [`Initiator::System`] transitions are trusted. After a
    /// commit into a terminal state the dependency cascade runs to
    /// completion before this method returns; cascade-step failures are
    /// logged and never abort the already committed transition.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionDenied::TransitionNotPermitted`] when the move
    /// is not in the initiator's matrix,
    /// [`TaskExchangeError::InvalidTarget`] for unauthorized deletes, and
    /// repository errors (including an exhausted
    /// [`ExchangeRepositoryError::VersionConflict`] retry) on persistence
    /// failure.
    pub async fn change_state(
        &self,
        task_id: TaskId,
        initiator: Initiator,
        target: TransitionTarget,
    ) -> TaskExchangeResult<()> {
        let applied = self.apply_with_autoclose(task_id, initiator, target).await?;
        if let Applied::Transitioned { state } = applied {
            if state.is_terminal() {
                self.settle_dependents(task_id).await;
            }
        }
        Ok(())
    }

    /// Returns the audit events for a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeRepositoryError::TaskNotFound`] when the task does
    /// not exist.
    pub async fn history(&self, task_id: TaskId) -> TaskExchangeResult<Vec<TaskEvent>> {
        self.require_task(task_id).await?;
        Ok(self.repository.events(task_id).await?)
    }

    /// Finds a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns repository errors on persistence failure.
    pub async fn task(&self, task_id: TaskId) -> TaskExchangeResult<Option<Task>> {
        Ok(self.repository.task(task_id).await?)
    }

    /// Finds a list by identifier.
    ///
    /// # Errors
    ///
    /// Returns repository errors on persistence failure.
    pub async fn list(&self, list_id: ListId) -> TaskExchangeResult<Option<TaskList>> {
        Ok(self.repository.list(list_id).await?)
    }

    /// Finds a list by slug.
    ///
    /// # Errors
    ///
    /// Returns repository errors on persistence failure.
    pub async fn list_by_slug(&self, slug: &ListSlug) -> TaskExchangeResult<Option<TaskList>> {
        Ok(self.repository.list_by_slug(slug).await?)
    }

    async fn require_list(&self, list_id: ListId) -> TaskExchangeResult<TaskList> {
        Ok(self
            .repository
            .list(list_id)
            .await?
            .ok_or(ExchangeRepositoryError::ListNotFound(list_id))?)
    }

    async fn require_task(&self, task_id: TaskId) -> TaskExchangeResult<Task> {
        Ok(self
            .repository
            .task(task_id)
            .await?
            .ok_or(ExchangeRepositoryError::TaskNotFound(task_id))?)
    }

    /// Resolves the actor's capability sets on the task's two lists.
    ///
    /// Anonymous tasks have no outgoing list; their sender side is the
    /// empty set.
    async fn resolve_roles(
        &self,
        task: &Task,
        actor: Actor,
    ) -> TaskExchangeResult<(RoleSet, RoleSet)> {
        let in_roles = self.require_list(task.incoming()).await?.roles(actor);
        let out_roles = match task.outgoing() {
            Some(outgoing_id) => self.require_list(outgoing_id).await?.roles(actor),
            None => RoleSet::NONE,
        };
        Ok((in_roles, out_roles))
    }

    /// Finds the matrix entry matching `(task.state, target)` for `actor`.
    ///
    /// The matrix is sorted, so for pairs that carry both a plain and a
    /// rejection-tagged option the plain one is matched first.
    async fn permitted(
        &self,
        task: &Task,
        actor: Actor,
        target: TransitionTarget,
    ) -> TaskExchangeResult<Option<TransitionOption>> {
        let (in_roles, out_roles) = self.resolve_roles(task, actor).await?;
        let matched = allowed_transitions(task, in_roles, out_roles)
            .into_iter()
            .find(|option| option.from == task.state() && option.to == target);
        Ok(matched)
    }

    /// Applies one change and chains the auto-close that a finish may
    /// trigger, recording both audit events.
    async fn apply_with_autoclose(
        &self,
        task_id: TaskId,
        initiator: Initiator,
        target: TransitionTarget,
    ) -> TaskExchangeResult<Applied> {
        let applied = self.apply_once(task_id, initiator, target).await?;
        if matches!(
            applied,
            Applied::Transitioned {
                state: TaskState::Finished,
            }
        ) {
            let finished = self.require_task(task_id).await?;
            if finished.auto_close() {
                return self
                    .apply_once(
                        task_id,
                        Initiator::System,
                        TransitionTarget::State(TaskState::Closed),
                    )
                    .await;
            }
        }
        Ok(applied)
    }

    async fn apply_once(
        &self,
        task_id: TaskId,
        initiator: Initiator,
        target: TransitionTarget,
    ) -> TaskExchangeResult<Applied> {
        match target {
            TransitionTarget::Delete => self.apply_delete(task_id, initiator).await,
            TransitionTarget::State(to) => self.apply_state(task_id, initiator, to).await,
        }
    }

    /// Hard-deletes a task: requires a human initiator holding the
    /// matching matrix entry.
    async fn apply_delete(
        &self,
        task_id: TaskId,
        initiator: Initiator,
    ) -> TaskExchangeResult<Applied> {
        let task = self.require_task(task_id).await?;
        let allowed = match initiator {
            Initiator::System => false,
            Initiator::Actor(actor) => self
                .permitted(&task, actor, TransitionTarget::Delete)
                .await?
                .is_some(),
        };
        if !allowed {
            return Err(TaskExchangeError::InvalidTarget {
                task_id,
                state: task.state(),
            });
        }
        self.repository.delete_task(task_id).await?;
        Ok(Applied::Deleted)
    }

    /// Commits one state transition under the optimistic version guard,
    /// refetching and retrying when another writer wins the race.
    async fn apply_state(
        &self,
        task_id: TaskId,
        initiator: Initiator,
        to: TaskState,
    ) -> TaskExchangeResult<Applied> {
        let mut attempts = 0;
        loop {
            let task = self.require_task(task_id).await?;
            if task.state() == to {
                return Ok(Applied::NoOp);
            }
            let rejection = match initiator {
                Initiator::System => false,
                Initiator::Actor(actor) => {
                    let matched = self
                        .permitted(&task, actor, TransitionTarget::State(to))
                        .await?;
                    match matched {
                        Some(option) => option.rejection,
                        None => {
                            return Err(PermissionDenied::TransitionNotPermitted {
                                task_id,
                                from: task.state(),
                                to: TransitionTarget::State(to),
                            }
                            .into());
                        }
                    }
                }
            };
            let event = TaskEvent::state(
                task_id,
                initiator.user_id(),
                task.state(),
                to,
                &*self.clock,
            );
            let mut updated = task;
            updated.apply_transition(to, rejection, &*self.clock);
            match self.repository.commit_transition(&updated, &event).await {
                Ok(()) => return Ok(Applied::Transitioned { state: to }),
                Err(ExchangeRepositoryError::VersionConflict { .. })
                    if attempts < MAX_COMMIT_ATTEMPTS =>
                {
                    attempts += 1;
                    debug!(task = %task_id, attempts, "transition lost a version race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drains the cascade triggered by a terminal transition.
    ///
    /// Each newly terminal task is pushed back as a trigger of its own, so
    /// chains of dependents settle transitively. Termination follows from
    /// strict state advancement: every step moves a task forward in the
    /// fixed state order, and terminal tasks are never reconsidered as
    /// dependents.
    async fn settle_dependents(&self, trigger: TaskId) {
        let mut queue = VecDeque::from([trigger]);
        while let Some(current) = queue.pop_front() {
            let dependents = match self.repository.autofinish_dependents(current).await {
                Ok(dependents) => dependents,
                Err(err) => {
                    error!(trigger = %current, %err, "dependent scan failed during cascade");
                    continue;
                }
            };
            for dependent in dependents {
                match self.check_autofinish(&dependent).await {
                    Ok(true) => queue.push_back(dependent.id()),
                    Ok(false) => {}
                    Err(err) => {
                        error!(task = %dependent.id(), %err, "auto-finish step failed during cascade");
                    }
                }
            }
        }
    }

    /// Advances a dependent to `Finished` when every one of its
    /// dependencies is terminal.
    ///
    /// Returns `true` when the task advanced (and is therefore itself a
    /// cascade trigger). Dependencies are re-read in full on every call; a
    /// missing or pre-terminal dependency leaves the task untouched.
    async fn check_autofinish(&self, dependent: &Task) -> TaskExchangeResult<bool> {
        if !dependent.auto_finish() {
            return Err(InvalidOperation::NotAutoFinish(dependent.id()).into());
        }
        if dependent.state().is_terminal() {
            return Err(InvalidOperation::AlreadyTerminal {
                task_id: dependent.id(),
                state: dependent.state(),
            }
            .into());
        }
        for dependency_id in dependent.dependencies() {
            let Some(dependency) = self.repository.task(*dependency_id).await? else {
                return Ok(false);
            };
            if !dependency.state().is_terminal() {
                return Ok(false);
            }
        }
        debug!(task = %dependent.id(), "all dependencies terminal, auto-finishing");
        let applied = self
            .apply_with_autoclose(
                dependent.id(),
                Initiator::System,
                TransitionTarget::State(TaskState::Finished),
            )
            .await?;
        Ok(matches!(applied, Applied::Transitioned { .. }))
    }
}
