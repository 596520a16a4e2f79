//! Append-only audit events recorded for every task.

use super::{ListId, TaskId, TaskState, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Tagged audit payload.
///
/// The JSON shape keeps the original wire form: a `type` tag alongside the
/// payload fields, with `null` actors marking anonymous creation or
/// system-triggered transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEventData {
    /// The task was created.
    Created {
        /// The creating user, `None` for anonymous creation.
        actor: Option<UserId>,
        /// The outgoing list, `None` for anonymous tasks.
        outgoing: Option<ListId>,
        /// The incoming list.
        incoming: ListId,
        /// The task this one was created as a dependency of, if any.
        dependent_of: Option<TaskId>,
    },
    /// The task changed state.
    State {
        /// The acting user, `None` for system-triggered transitions.
        actor: Option<UserId>,
        /// The state the task left.
        from: TaskState,
        /// The state the task entered.
        to: TaskState,
    },
}

/// One immutable audit record.
///
/// Events are append-only: written once, never mutated or deleted, except
/// that deleting the parent task discards its events. Ordering is by
/// creation time, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// The task the event belongs to.
    pub task_id: TaskId,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
    /// The tagged payload.
    pub data: TaskEventData,
}

impl TaskEvent {
    /// Builds a creation event.
    #[must_use]
    pub fn created(
        task_id: TaskId,
        actor: Option<UserId>,
        outgoing: Option<ListId>,
        incoming: ListId,
        dependent_of: Option<TaskId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            task_id,
            created_at: clock.utc(),
            data: TaskEventData::Created {
                actor,
                outgoing,
                incoming,
                dependent_of,
            },
        }
    }

    /// Builds a state-change event.
    #[must_use]
    pub fn state(
        task_id: TaskId,
        actor: Option<UserId>,
        from: TaskState,
        to: TaskState,
        clock: &impl Clock,
    ) -> Self {
        Self {
            task_id,
            created_at: clock.utc(),
            data: TaskEventData::State { actor, from, to },
        }
    }

    /// Returns `true` for state-change events.
    #[must_use]
    pub const fn is_state_change(&self) -> bool {
        matches!(self.data, TaskEventData::State { .. })
    }
}
