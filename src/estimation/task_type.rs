//! Task type and its base score

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a task describes.
///
/// Unrecognised labels are kept verbatim in `Other` and scored with the
/// default base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Feature,
    Bug,
    Refactor,
    Documentation,
    Other(String),
}

impl TaskType {
    /// The four recognised types in feature-vector order.
    pub const KNOWN: [TaskType; 4] = [
        TaskType::Feature,
        TaskType::Bug,
        TaskType::Refactor,
        TaskType::Documentation,
    ];

    pub fn parse(label: &str) -> Self {
        match label {
            "feature" => TaskType::Feature,
            "bug" => TaskType::Bug,
            "refactor" => TaskType::Refactor,
            "documentation" => TaskType::Documentation,
            other => TaskType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Feature => "feature",
            TaskType::Bug => "bug",
            TaskType::Refactor => "refactor",
            TaskType::Documentation => "documentation",
            TaskType::Other(label) => label,
        }
    }

    /// Starting score before any keyword analysis.
    pub fn base_points(&self) -> i64 {
        match self {
            TaskType::Feature => 3,
            TaskType::Bug => 2,
            TaskType::Refactor => 3,
            TaskType::Documentation => 1,
            TaskType::Other(_) => 2,
        }
    }

    pub fn base_points_reason(&self) -> &'static str {
        match self {
            TaskType::Feature => "New features usually require significant development work",
            TaskType::Bug => "Bug fixes are typically less complex than new features",
            TaskType::Refactor => {
                "Refactorings require careful analysis and may touch several parts of the code"
            }
            TaskType::Documentation => {
                "Documentation matters but is usually less technically complex"
            }
            TaskType::Other(_) => "Default score for unspecified task types",
        }
    }

    /// Index in the one-hot encoding, `None` for unknown types.
    pub fn one_hot_index(&self) -> Option<usize> {
        Self::KNOWN.iter().position(|known| known == self)
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Feature
    }
}

impl From<String> for TaskType {
    fn from(label: String) -> Self {
        TaskType::parse(&label)
    }
}

impl From<&str> for TaskType {
    fn from(label: &str) -> Self {
        TaskType::parse(label)
    }
}

impl From<TaskType> for String {
    fn from(task_type: TaskType) -> Self {
        task_type.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
