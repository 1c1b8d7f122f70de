use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high sorts first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    /// Capitalized badge label
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Parse a stored priority string, `None` for anything unrecognized
    pub fn parse_priority(s: &str) -> Option<Priority> {
        match s {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Strict parse used at the input boundary (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::parse_priority(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("invalid priority '{}' (expected high, medium, low)", s))
    }
}

/// The `priority` field exactly as stored. Values this version does not
/// recognize are carried verbatim so they survive unrelated writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredPriority {
    Known(Priority),
    Other(serde_json::Value),
}

impl StoredPriority {
    /// Recognized priority, `None` for anything else
    pub fn known(&self) -> Option<Priority> {
        match self {
            StoredPriority::Known(p) => Some(*p),
            StoredPriority::Other(_) => None,
        }
    }
}

impl From<Priority> for StoredPriority {
    fn from(p: Priority) -> Self {
        StoredPriority::Known(p)
    }
}

/// A single task record, as persisted under the `tasks` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique id, assigned at creation
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    /// Stored priority. Missing or unrecognized values read back as medium
    /// through [`Task::priority`].
    #[serde(rename = "priority", default, skip_serializing_if = "Option::is_none")]
    pub raw_priority: Option<StoredPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Effective priority used for display and sorting
    pub fn priority(&self) -> Priority {
        self.raw_priority
            .as_ref()
            .and_then(StoredPriority::known)
            .unwrap_or_default()
    }

    /// Whether a live countdown applies (has a deadline, not completed)
    pub fn has_active_deadline(&self) -> bool {
        self.deadline.is_some() && !self.completed
    }

    /// Valid iff the title is non-empty. Priority never invalidates a task.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty()
    }
}
