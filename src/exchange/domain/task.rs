//! Task aggregate root and the four-state lifecycle.

use super::{ListId, ParseTaskStateError, TaskId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default title for tasks created without one.
const DEFAULT_TASK_TITLE: &str = "New Task";

/// Task lifecycle state, ordered `Inbox < Active < Finished < Closed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Delivered to the receiving list but not yet acknowledged.
    Inbox,
    /// Acknowledged by the receiver and in progress.
    Active,
    /// Work complete from the receiver's point of view.
    Finished,
    /// Settled: accepted by the sender, rejected, or closed outright.
    Closed,
}

impl TaskState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` for the states that satisfy a dependency.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Closed)
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "inbox" => Ok(Self::Inbox),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted free-text notes.
    pub notes: String,
    /// Persisted creator, `None` for anonymously created tasks.
    pub creator: Option<UserId>,
    /// Persisted outgoing (sender) list, `None` for anonymous tasks.
    pub outgoing: Option<ListId>,
    /// Persisted incoming (receiver) list.
    pub incoming: ListId,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Persisted rejection flag.
    pub rejected: bool,
    /// Whether finishing the task immediately closes it.
    pub auto_close: bool,
    /// Whether the task auto-advances once its dependencies are terminal.
    pub auto_finish: bool,
    /// Persisted dependency adjacency set.
    pub dependencies: BTreeSet<TaskId>,
    /// Persisted optimistic-concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A unit of work exchanged between an outgoing and an incoming list.
///
/// Tasks whose outgoing list equals their incoming list are self-assigned:
/// they are created directly in [`TaskState::Active`] and never occupy
/// [`TaskState::Inbox`]. Tasks with no outgoing list are anonymous; their
/// sender holds no administrative role anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    notes: String,
    creator: Option<UserId>,
    outgoing: Option<ListId>,
    incoming: ListId,
    state: TaskState,
    rejected: bool,
    auto_close: bool,
    auto_finish: bool,
    dependencies: BTreeSet<TaskId>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task addressed to `incoming`.
    ///
    /// Self-assigned tasks start in [`TaskState::Active`]; everything else
    /// lands in the receiver's [`TaskState::Inbox`].
    #[must_use]
    pub fn new(
        creator: Option<UserId>,
        outgoing: Option<ListId>,
        incoming: ListId,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        let state = if outgoing == Some(incoming) {
            TaskState::Active
        } else {
            TaskState::Inbox
        };
        Self {
            id: TaskId::new(),
            title: DEFAULT_TASK_TITLE.to_owned(),
            notes: String::new(),
            creator,
            outgoing,
            incoming,
            state,
            rejected: false,
            auto_close: false,
            auto_finish: false,
            dependencies: BTreeSet::new(),
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            notes: data.notes,
            creator: data.creator,
            outgoing: data.outgoing,
            incoming: data.incoming,
            state: data.state,
            rejected: data.rejected,
            auto_close: data.auto_close,
            auto_finish: data.auto_finish,
            dependencies: data.dependencies,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the free-text notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Flags the task to close automatically when it is finished.
    #[must_use]
    pub const fn with_auto_close(mut self) -> Self {
        self.auto_close = true;
        self
    }

    /// Flags the task to finish automatically once every dependency is
    /// finished or closed.
    #[must_use]
    pub const fn with_auto_finish(mut self) -> Self {
        self.auto_finish = true;
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the free-text notes.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Returns the creating user, `None` for anonymously created tasks.
    #[must_use]
    pub const fn creator(&self) -> Option<UserId> {
        self.creator
    }

    /// Returns the outgoing (sender) list, `None` for anonymous tasks.
    #[must_use]
    pub const fn outgoing(&self) -> Option<ListId> {
        self.outgoing
    }

    /// Returns the incoming (receiver) list.
    #[must_use]
    pub const fn incoming(&self) -> ListId {
        self.incoming
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns `true` when the task was rejected by the receiver and the
    /// rejection has not been undone.
    #[must_use]
    pub const fn rejected(&self) -> bool {
        self.rejected
    }

    /// Returns `true` when finishing the task immediately closes it.
    #[must_use]
    pub const fn auto_close(&self) -> bool {
        self.auto_close
    }

    /// Returns `true` when the task auto-advances to finished once all its
    /// dependencies are terminal.
    #[must_use]
    pub const fn auto_finish(&self) -> bool {
        self.auto_finish
    }

    /// Returns the dependency adjacency set.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<TaskId> {
        &self.dependencies
    }

    /// Returns `true` when the task must wait for `other`.
    #[must_use]
    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }

    /// Returns the optimistic-concurrency version.
    ///
    /// Every committed transition carries the version it was computed
    /// against; the store rejects stale commits.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Sets the version. Intended for store adapters reloading or bumping
    /// the concurrency token.
    pub const fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when the outgoing list equals the incoming list.
    #[must_use]
    pub fn is_self_assigned(&self) -> bool {
        self.outgoing == Some(self.incoming)
    }

    /// Returns `true` when the task has no creator.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.creator.is_none()
    }

    /// Adds a dependency edge to `other`.
    pub fn add_dependency(&mut self, other: TaskId) {
        self.dependencies.insert(other);
    }

    /// Removes a dependency edge, returning whether it was present.
    pub fn remove_dependency(&mut self, other: TaskId) -> bool {
        self.dependencies.remove(&other)
    }

    /// Moves the task to `to` and maintains the rejection flag.
    ///
    /// A rejection transition sets the flag; any other transition clears a
    /// previously set flag.
    pub fn apply_transition(&mut self, to: TaskState, rejection: bool, clock: &impl Clock) {
        self.state = to;
        if rejection {
            self.rejected = true;
        } else if self.rejected {
            self.rejected = false;
        }
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
