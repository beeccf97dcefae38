//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum email length per RFC 5321.
const MAX_LENGTH: usize = 254;

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string exceeds the RFC 5321 length limit.
    #[error("email must be at most {MAX_LENGTH} characters")]
    TooLong,
    /// The input is not of the form `local@domain` with both parts non-empty.
    #[error("email must be of the form local@domain")]
    Malformed,
}

/// A structurally valid email address.
///
/// Validation is intentionally shallow: one `@`, non-empty local and domain
/// parts, bounded length. Deliverability is the email collaborator's problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse and validate an email address.
    ///
    /// The input is trimmed and lowercased before validation.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] if the input is empty, too long, or not of the
    /// form `local@domain`.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > MAX_LENGTH {
            return Err(EmailError::TooLong);
        }
        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(trimmed.to_lowercase()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// The normalized address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
