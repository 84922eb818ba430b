// SPDX-License-Identifier: MIT

//! Thread identity for workflow runs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier scoping one logical run and its checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Timestamp-based id (`%Y%m%d%H%M%S` plus microseconds), sortable by start time
    pub fn from_timestamp() -> Self {
        Self(chrono::Local::now().format("%Y%m%d%H%M%S%6f").to_string())
    }

    /// Random UUID v4 id
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ThreadId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ids_are_digits() {
        let id = ThreadId::from_timestamp();
        assert_eq!(id.as_str().len(), 20);
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(ThreadId::random(), ThreadId::random());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ThreadId::new("review-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"review-42\"");
    }
}
