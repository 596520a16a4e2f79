//! Task list aggregate and role resolution.

use super::{Actor, ListId, ListSlug, UserId, ValidationError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A capability a user may hold on a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control: list settings, membership, and both sides of every
    /// task transition the receiver or sender may perform.
    Admin,
    /// May create tasks addressed to the list.
    Post,
    /// May view all tasks on the list.
    Observe,
}

/// The capability set an actor holds on one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleSet {
    admin: bool,
    post: bool,
    observe: bool,
}

impl RoleSet {
    /// The empty capability set.
    pub const NONE: Self = Self {
        admin: false,
        post: false,
        observe: false,
    };

    /// All three capabilities, as held by a list owner.
    pub const ALL: Self = Self {
        admin: true,
        post: true,
        observe: true,
    };

    /// Creates a capability set from its three flags.
    #[must_use]
    pub const fn new(admin: bool, post: bool, observe: bool) -> Self {
        Self {
            admin,
            post,
            observe,
        }
    }

    /// Returns `true` when the set contains the given role.
    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        match role {
            Role::Admin => self.admin,
            Role::Post => self.post,
            Role::Observe => self.observe,
        }
    }

    /// Returns `true` when no capability is held.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.admin || self.post || self.observe)
    }
}

/// Parameter object for reconstructing a persisted task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedListData {
    /// Persisted list identifier.
    pub id: ListId,
    /// Persisted slug.
    pub slug: ListSlug,
    /// Persisted display title.
    pub title: String,
    /// Persisted owner set.
    pub owners: BTreeSet<UserId>,
    /// Persisted poster set.
    pub posters: BTreeSet<UserId>,
    /// Persisted observer set.
    pub observers: BTreeSet<UserId>,
    /// Whether all users may post to the list.
    pub public_to_post: bool,
    /// Whether all users may observe the list.
    pub public_to_observe: bool,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A named work queue that tasks flow into and out of.
///
/// Membership sets and public flags are the access-control facts the
/// transition engine reads; the engine never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    id: ListId,
    slug: ListSlug,
    title: String,
    owners: BTreeSet<UserId>,
    posters: BTreeSet<UserId>,
    observers: BTreeSet<UserId>,
    public_to_post: bool,
    public_to_observe: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskList {
    /// Creates a new list owned by `owner` with default settings.
    ///
    /// New lists get a generated slug, are open for public posting, and are
    /// not publicly observable.
    #[must_use]
    pub fn new(owner: UserId, title: impl Into<String>, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ListId::new(),
            slug: ListSlug::generate(),
            title: title.into(),
            owners: BTreeSet::from([owner]),
            posters: BTreeSet::new(),
            observers: BTreeSet::new(),
            public_to_post: true,
            public_to_observe: false,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a list from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedListData) -> Self {
        Self {
            id: data.id,
            slug: data.slug,
            title: data.title,
            owners: data.owners,
            posters: data.posters,
            observers: data.observers,
            public_to_post: data.public_to_post,
            public_to_observe: data.public_to_observe,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the list identifier.
    #[must_use]
    pub const fn id(&self) -> ListId {
        self.id
    }

    /// Returns the list slug.
    #[must_use]
    pub const fn slug(&self) -> &ListSlug {
        &self.slug
    }

    /// Returns the display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the owner set.
    #[must_use]
    pub const fn owners(&self) -> &BTreeSet<UserId> {
        &self.owners
    }

    /// Returns `true` when all users may post to the list.
    #[must_use]
    pub const fn public_to_post(&self) -> bool {
        self.public_to_post
    }

    /// Returns `true` when all users may observe the list.
    #[must_use]
    pub const fn public_to_observe(&self) -> bool {
        self.public_to_observe
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Computes the capability set `actor` holds on this list.
    ///
    /// Owners hold every capability. Otherwise posting requires the public
    /// flag or poster membership, and observing requires the public flag or
    /// observer membership. Anonymous actors hold only what the public
    /// flags grant.
    #[must_use]
    pub fn roles(&self, actor: Actor) -> RoleSet {
        let member = actor.user_id();
        if member.is_some_and(|user| self.owners.contains(&user)) {
            return RoleSet::ALL;
        }
        RoleSet {
            admin: false,
            post: self.public_to_post || member.is_some_and(|user| self.posters.contains(&user)),
            observe: self.public_to_observe
                || member.is_some_and(|user| self.observers.contains(&user)),
        }
    }

    /// Changes the display title.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyListTitle`] when the trimmed title is
    /// empty.
    pub fn rename(&mut self, title: &str, clock: &impl Clock) -> Result<(), ValidationError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyListTitle);
        }
        self.title = trimmed.to_owned();
        self.touch(clock);
        Ok(())
    }

    /// Changes the slug to an already-validated value.
    ///
    /// Global uniqueness is enforced by the store when the change is
    /// persisted.
    pub fn change_slug(&mut self, slug: ListSlug, clock: &impl Clock) {
        self.slug = slug;
        self.touch(clock);
    }

    /// Adds a user to the owner set.
    pub fn add_owner(&mut self, user: UserId, clock: &impl Clock) {
        self.owners.insert(user);
        self.touch(clock);
    }

    /// Adds a user to the poster set.
    pub fn add_poster(&mut self, user: UserId, clock: &impl Clock) {
        self.posters.insert(user);
        self.touch(clock);
    }

    /// Adds a user to the observer set.
    pub fn add_observer(&mut self, user: UserId, clock: &impl Clock) {
        self.observers.insert(user);
        self.touch(clock);
    }

    /// Sets whether all users may post to the list.
    pub fn set_public_to_post(&mut self, value: bool, clock: &impl Clock) {
        self.public_to_post = value;
        self.touch(clock);
    }

    /// Sets whether all users may observe the list.
    pub fn set_public_to_observe(&mut self, value: bool, clock: &impl Clock) {
        self.public_to_observe = value;
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
