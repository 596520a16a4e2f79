//! Permission-gated transition matrix.
//!
//! [`allowed_transitions`] computes which `(from, to)` moves an actor may
//! invoke on a task, given the capability sets the actor holds on the
//! task's incoming and outgoing lists. The receiver admin and the sender
//! admin see different, asymmetric halves of the state machine; the
//! branching lives here, in one pure function over
//! `(task, in_roles, out_roles)`, so it can be unit-tested in isolation
//! from storage.

use super::{Role, RoleSet, Task, TaskState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The destination of a transition: a lifecycle state or a hard delete.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTarget {
    /// Move the task to the given state.
    State(TaskState),
    /// Hard-delete the task and its audit events.
    Delete,
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(state) => f.write_str(state.as_str()),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// One transition an actor is permitted to invoke.
///
/// Options order by `(from, to, rejection)`, so a plain move sorts before a
/// rejection-tagged move for the same pair and is matched first by the
/// executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TransitionOption {
    /// The state the task must currently be in.
    pub from: TaskState,
    /// The destination.
    pub to: TransitionTarget,
    /// Whether taking this transition marks the task as rejected.
    pub rejection: bool,
}

impl TransitionOption {
    /// A plain move between two states.
    #[must_use]
    pub const fn to_state(from: TaskState, to: TaskState) -> Self {
        Self {
            from,
            to: TransitionTarget::State(to),
            rejection: false,
        }
    }

    /// A receiver-side rejection move.
    #[must_use]
    pub const fn rejection(from: TaskState, to: TaskState) -> Self {
        Self {
            from,
            to: TransitionTarget::State(to),
            rejection: true,
        }
    }

    /// A hard delete from the given state.
    #[must_use]
    pub const fn delete(from: TaskState) -> Self {
        Self {
            from,
            to: TransitionTarget::Delete,
            rejection: false,
        }
    }
}

/// The states the receiver admin cycles a task through.
const HANDOFF_STATES: [TaskState; 3] = [TaskState::Inbox, TaskState::Active, TaskState::Finished];

/// Computes the transitions an actor holding `in_roles` on the task's
/// incoming list and `out_roles` on its outgoing list may invoke.
///
/// Receiver admins move tasks among inbox, active, and finished, except
/// that self-assigned tasks never target the inbox, and self-assigned or
/// anonymous tasks get closed instead of finished (there is no distinct
/// sender to accept the outcome). A receiver admin who is not also the
/// sender may reject an unacknowledged task straight from inbox to closed,
/// and undo that rejection; the sole owner of a self-assigned task may
/// instead delete it outright. Sender admins always get finished to closed;
/// when they are not also the receiver they may reopen a closed task to
/// finished (unless it was rejected) and retract an unacknowledged task,
/// and when they are both sides the reopen goes straight to active.
///
/// The result never contains a pair with `from == to` and is sorted for
/// deterministic display.
#[must_use]
pub fn allowed_transitions(task: &Task, in_roles: RoleSet, out_roles: RoleSet) -> Vec<TransitionOption> {
    let receiver_admin = in_roles.contains(Role::Admin);
    let sender_admin = out_roles.contains(Role::Admin);
    let mut options = BTreeSet::new();

    if receiver_admin {
        for from in HANDOFF_STATES {
            for to in HANDOFF_STATES {
                if from == to {
                    continue;
                }
                if sender_admin && to == TaskState::Inbox {
                    // Self-assigned tasks never sit in the inbox.
                    continue;
                }
                if (sender_admin || task.is_anonymous()) && to == TaskState::Finished {
                    // No distinct sender to accept the outcome: close
                    // instead of finishing.
                    if sender_admin && from == TaskState::Inbox {
                        // ...and self-assigned tasks are never in the
                        // inbox, so this source state cannot occur.
                        continue;
                    }
                    options.insert(TransitionOption::to_state(from, TaskState::Closed));
                } else {
                    options.insert(TransitionOption::to_state(from, to));
                }
            }
        }
        if sender_admin {
            // Sole owner of a self-assigned task: hard delete at any point
            // after creation.
            for from in [TaskState::Active, TaskState::Finished, TaskState::Closed] {
                options.insert(TransitionOption::delete(from));
            }
        } else {
            // Receiver-side veto of an unacknowledged task, and its undo.
            options.insert(TransitionOption::rejection(TaskState::Inbox, TaskState::Closed));
            options.insert(TransitionOption::to_state(TaskState::Closed, TaskState::Inbox));
        }
    }

    if sender_admin {
        options.insert(TransitionOption::to_state(TaskState::Finished, TaskState::Closed));
        if receiver_admin {
            // The finished target already comes from the receiver side;
            // reopen goes straight back to active instead.
            options.insert(TransitionOption::to_state(TaskState::Closed, TaskState::Active));
        } else {
            if !task.rejected() {
                // Once rejected, the sender cannot unilaterally un-reject.
                options.insert(TransitionOption::to_state(TaskState::Closed, TaskState::Finished));
            }
            // Retraction is only possible while the receiver has not yet
            // acknowledged the task.
            options.insert(TransitionOption::delete(TaskState::Inbox));
        }
    }

    options.into_iter().collect()
}
