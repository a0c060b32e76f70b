//! # Task Data Model
//!
//! This module defines the data structures exchanged with the task database:
//! the closed category and priority sets offered in the dialogue, the record
//! shape returned by queries and the draft committed at the end of a dialog.
//!
//! ## Usage
//!
//! ```rust
//! use task_capture::task_model::{Category, NewTask, Priority};
//!
//! let task = NewTask::new("Buy milk", Category::Work).with_priority(Some(Priority::High));
//! assert_eq!(task.category.to_string(), "Work");
//! ```

use chrono::NaiveDate;
use strum::{Display, EnumString};

/// Fixed set of task categories, stored as tags in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Category {
    Today,
    Work,
    Home,
    Global,
    Everyday,
    Personal,
}

/// Ordered priority set; `High` sorts first in task lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Priority {
    Low,
    Med,
    High,
}

impl Priority {
    /// Sort rank used by list rendering (lower comes first)
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Med => 1,
            Priority::Low => 2,
        }
    }
}

/// Sort rank of a free-form priority value; unknown or absent values go last
pub fn priority_rank(priority: Option<&str>) -> u8 {
    priority
        .and_then(|p| p.parse::<Priority>().ok())
        .map(Priority::rank)
        .unwrap_or(3)
}

/// Statuses treated as finished by list and today views
pub fn is_terminal_status(status: &str) -> bool {
    let status = status.trim();
    status.eq_ignore_ascii_case("done") || status.eq_ignore_ascii_case("complete")
}

/// A task as returned by the database query
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub status: String,
}

impl TaskRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_active(&self) -> bool {
        !is_terminal_status(&self.status)
    }
}

/// A fully assembled task ready to be created in the database
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub category: Category,
    pub weight: Option<f64>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            weight: None,
            priority: None,
            due_date: None,
        }
    }

    pub fn with_weight(mut self, weight: Option<f64>) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }
}

/// Identifier returned by the database for a created record
pub type RecordId = String;
