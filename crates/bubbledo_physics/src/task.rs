// SPDX-License-Identifier: MIT OR Apache-2.0
//! Task entities observed by the simulation.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque unique task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new random task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A short text item shown as a bubble. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Non-empty display text
    pub text: String,
    /// Creation time in Unix milliseconds
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

impl Task {
    /// Create a task from user input.
    ///
    /// Returns `None` when the text is empty after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            id: TaskId::new(),
            text: text.to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        })
    }

    /// Create a task with a known id, as when restoring from storage
    pub fn with_id(id: impl Into<TaskId>, text: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at,
        }
    }
}
