//! View-level selection criteria.
//!
//! Filters are stored next to the task list but are never touched by
//! synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Priority, Task, TypesError};

/// Which priorities are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    /// Every priority
    #[default]
    All,
    /// Only low
    Low,
    /// Only medium
    Medium,
    /// Only high
    High,
}

impl PriorityFilter {
    /// Check if a task passes this filter.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Low => task.priority == Priority::Low,
            Self::Medium => task.priority == Priority::Medium,
            Self::High => task.priority == Priority::High,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TypesError::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Which completion states are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Completed and incomplete
    #[default]
    All,
    /// Only completed
    Completed,
    /// Only incomplete
    Incomplete,
}

impl StatusFilter {
    /// Check if a task passes this filter.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed,
            Self::Incomplete => !task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" => Ok(Self::Completed),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(TypesError::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
        })
    }
}
