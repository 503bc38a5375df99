//! # schedule-engine
//!
//! Deterministic placement of a user's pending tasks onto their declared free
//! time.
//!
//! The engine is a pure, synchronous computation over an in-memory snapshot of
//! one user's tasks and time blocks. It never reads the wall clock: the
//! reference time is part of [`ScheduleOptions`]. Identical input always gives
//! an identical [`ScheduleResult`].
//!
//! ## Modules
//!
//! - [`expander`] — time blocks (one-off, weekly, RRULE) → free intervals over the horizon
//! - [`orderer`] — priority, deadline, size, id ordering of pending tasks
//! - [`placer`] — greedy front-loaded placement, splitting by minimum block size
//! - [`overload`] — pre-flight capacity check and the compression hook
//! - [`sacrifice`] — evict lower-priority unlocked tasks to fit an urgent one
//! - [`conflict`] — overlap detection between placed blocks
//! - [`runner`] — [`compute_schedule`], the entry point tying it together
//! - [`interval`] — half-open intervals and the free-time pool
//! - [`model`], [`options`], [`error`] — records, configuration, error types

pub mod conflict;
pub mod error;
pub mod expander;
pub mod interval;
pub mod model;
pub mod options;
pub mod orderer;
pub mod overload;
pub mod placer;
pub mod runner;
pub mod sacrifice;

pub use conflict::{check_manual_placement, find_conflicts, find_overlaps, Conflict};
pub use error::ScheduleError;
pub use expander::expand_availability;
pub use interval::{AvailabilityPool, Interval};
pub use model::{
    Priority, ScheduleResult, ScheduleStats, ScheduledBlock, ScheduledTask, Task, TaskStatus,
    TimeBlock, UnscheduledReason, UnscheduledTask, MAX_TASK_HOURS,
};
pub use options::{DayWindow, OverloadStrategy, RemainingPolicy, ScheduleOptions};
pub use overload::{DurationCompressor, OverloadReport, ProportionalCompressor};
pub use runner::{compute_schedule, compute_schedule_with};
