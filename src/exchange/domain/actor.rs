//! Acting-identity types threaded through every engine operation.
//!
//! The engine never relies on an ambient "current user": permission checks
//! take an explicit [`Actor`], and transition execution takes an explicit
//! [`Initiator`] so that system-triggered work (cascades, auto-close) is
//! distinguishable from human requests in both the permission check and the
//! audit log.

use super::UserId;
use serde::{Deserialize, Serialize};

/// The identity a permission check is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// No authenticated identity. Holds only roles granted by public flags.
    Anonymous,
    /// An authenticated user.
    User(UserId),
}

impl Actor {
    /// Returns the user identifier for authenticated actors.
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Returns `true` when the actor carries no authenticated identity.
    #[must_use]
    pub const fn is_anonymous(self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// The origin of a state-change request.
///
/// Human-initiated transitions are validated against the transition matrix;
/// [`Initiator::System`] marks engine-triggered transitions (dependency
/// cascade, auto-close) which are trusted by construction and bypass the
/// permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    /// A transition requested by a (possibly anonymous) caller.
    Actor(Actor),
    /// A transition triggered by the engine itself.
    System,
}

impl Initiator {
    /// Returns the authenticated user behind this initiator, if any.
    ///
    /// Both [`Initiator::System`] and anonymous actors yield `None`; audit
    /// events record exactly this value.
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Actor(actor) => actor.user_id(),
            Self::System => None,
        }
    }
}
