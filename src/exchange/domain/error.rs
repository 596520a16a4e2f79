//! Error types for exchange domain validation and permission checks.
//!
//! Uses `thiserror` for ergonomic error handling with typed variants that
//! can be inspected by callers.

use super::{ListId, TaskId, TaskState, TransitionTarget};
use thiserror::Error;

/// Errors returned while validating list title and slug input.
///
/// These are recoverable caller errors, surfaced verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The list title is empty after trimming.
    #[error("list title must not be empty")]
    EmptyListTitle,

    /// The list slug is empty after trimming.
    #[error("list slug must not be empty")]
    EmptyListSlug,

    /// The list slug exceeds the maximum length.
    #[error("list slug is {length} characters long, maximum is {max}")]
    SlugTooLong {
        /// The length of the rejected slug.
        length: usize,
        /// The maximum permitted length.
        max: usize,
    },

    /// The list slug contains a character outside the permitted charset.
    #[error(
        "list slug may only contain letters, numbers, dashes, and underscores \
         (found {character:?})"
    )]
    SlugInvalidCharacter {
        /// The first offending character.
        character: char,
    },
}

/// Errors returned when a caller lacks authorization for an operation.
///
/// Never silently downgraded: every denied creation or transition surfaces
/// one of these variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermissionDenied {
    /// The operation requires an authenticated user.
    #[error("an authenticated user is required")]
    AuthenticationRequired,

    /// The actor may not post tasks to the list.
    #[error("posting to list {list_id} is not permitted")]
    PostNotPermitted {
        /// The incoming list the post was addressed to.
        list_id: ListId,
    },

    /// The actor is not an admin of the outgoing list named on a new task.
    #[error("sending from list {list_id} requires admin on that list")]
    OutgoingAdminRequired {
        /// The outgoing list named on the task.
        list_id: ListId,
    },

    /// The actor is not an admin of the list being edited.
    #[error("editing list {list_id} requires admin on that list")]
    ListAdminRequired {
        /// The list being edited.
        list_id: ListId,
    },

    /// The requested transition is not in the actor's permitted set.
    #[error("transition {from} -> {to} on task {task_id} is not permitted")]
    TransitionNotPermitted {
        /// The task whose state change was requested.
        task_id: TaskId,
        /// The task's current state.
        from: TaskState,
        /// The requested target.
        to: TransitionTarget,
    },
}

/// Engine-internal precondition violations.
///
/// These indicate a caller bug: they are unreachable through the public
/// contract and are logged loudly when a cascade step trips one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidOperation {
    /// Auto-finish was evaluated for a task not flagged for it.
    #[error("task {0} is not flagged for auto-finish")]
    NotAutoFinish(TaskId),

    /// Auto-finish was evaluated for a task already in a terminal state.
    #[error("task {task_id} is already {state} and cannot auto-finish")]
    AlreadyTerminal {
        /// The task the cascade tried to advance.
        task_id: TaskId,
        /// The terminal state it was found in.
        state: TaskState,
    },
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);
