//! Validated short slug identifying a task list in URLs.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of a list slug.
pub const LIST_SLUG_MAX_LENGTH: usize = 24;

/// Length of the auto-generated slug assigned to new lists.
const AUTO_SLUG_LENGTH: usize = 8;

/// Globally unique, human-chooseable short name for a task list.
///
/// Restricted to letters, numbers, dashes, and underscores, at most
/// [`LIST_SLUG_MAX_LENGTH`] characters. Uniqueness is enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListSlug(String);

impl ListSlug {
    /// Creates a validated slug from caller input.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyListSlug`] for empty input,
    /// [`ValidationError::SlugTooLong`] past the length bound, and
    /// [`ValidationError::SlugInvalidCharacter`] for anything outside the
    /// alphanumeric-plus-dash-underscore charset.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyListSlug);
        }
        let length = normalized.chars().count();
        if length > LIST_SLUG_MAX_LENGTH {
            return Err(ValidationError::SlugTooLong {
                length,
                max: LIST_SLUG_MAX_LENGTH,
            });
        }
        if let Some(character) = normalized.chars().find(|c| !is_slug_char(*c)) {
            return Err(ValidationError::SlugInvalidCharacter { character });
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Generates a random slug for a newly created list.
    ///
    /// Eight hex characters drawn from a v4 UUID, always within the slug
    /// charset. Collisions are resolved by the caller retrying against the
    /// store's uniqueness check.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex.chars().take(AUTO_SLUG_LENGTH).collect())
    }

    /// Returns the slug as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl AsRef<str> for ListSlug {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ListSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
