//! Domain model for the task exchange engine.
//!
//! The exchange domain models task lists with role-based access, the task
//! lifecycle and its permission-gated transition matrix, and the audit
//! events recorded for every task, while keeping all infrastructure
//! concerns outside of the domain boundary.

mod actor;
mod error;
mod event;
mod ids;
mod list;
mod slug;
mod task;
mod transition;

pub use actor::{Actor, Initiator};
pub use error::{InvalidOperation, ParseTaskStateError, PermissionDenied, ValidationError};
pub use event::{TaskEvent, TaskEventData};
pub use ids::{ListId, TaskId, UserId};
pub use list::{PersistedListData, Role, RoleSet, TaskList};
pub use slug::{LIST_SLUG_MAX_LENGTH, ListSlug};
pub use task::{PersistedTaskData, Task, TaskState};
pub use transition::{TransitionOption, TransitionTarget, allowed_transitions};
