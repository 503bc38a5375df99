//! Error types for schedule-engine operations.
//!
//! Only malformed input is an error. Overload, per-task placement failures and
//! unresolved sacrifice conflicts are reported as data in
//! [`ScheduleResult`](crate::model::ScheduleResult).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid time block {id}: {reason}")]
    InvalidTimeBlock { id: String, reason: String },

    #[error("Invalid task {id}: {reason}")]
    InvalidTask { id: String, reason: String },

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Time blocks belong to more than one owner (expected {expected}, found {found})")]
    MixedOwners { expected: String, found: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid recurrence rule on time block {id}: {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
