//! Task, time-block and result records exchanged with the caller.
//!
//! Field names serialize in camelCase so records can be handed over by a
//! JSON-speaking persistence layer unchanged.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::interval::{duration_to_hours, Interval};
use crate::overload::OverloadReport;

/// Task priority. Ordering is ascending, so `Urgent` is the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

/// Largest value accepted for any hour field of a [`Task`], about eleven
/// years of continuous work.
pub const MAX_TASK_HOURS: f64 = 100_000.0;

/// A unit of work the caller wants placed into free time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub estimated_hours: f64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    /// Smallest session the task may be split into. Defaults to a fraction of
    /// the estimate (see `ScheduleOptions::default_min_block_fraction`).
    #[serde(default)]
    pub min_block_size: Option<f64>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Sub-block windows when the task is split across sessions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Interval>,
    #[serde(default)]
    pub is_locked: bool,
    /// Hours already logged against the task.
    #[serde(default)]
    pub actual_hours: Option<f64>,
    /// Hours still outstanding after the last scheduling run.
    #[serde(default)]
    pub remaining_hours: Option<f64>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, estimated_hours: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            estimated_hours,
            deadline: None,
            priority: Priority::default(),
            min_block_size: None,
            status: TaskStatus::default(),
            start_time: None,
            end_time: None,
            blocks: Vec::new(),
            is_locked: false,
            actual_hours: None,
            remaining_hours: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_min_block(mut self, hours: f64) -> Self {
        self.min_block_size = Some(hours);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_logged_hours(mut self, hours: f64) -> Self {
        self.actual_hours = Some(hours);
        self
    }

    /// Give the task an existing placement without locking it.
    pub fn placed_at(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self.blocks.clear();
        self
    }

    /// Pin the task to a fixed window.
    pub fn locked_at(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut task = self.placed_at(start, end);
        task.is_locked = true;
        task
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// The windows this task currently occupies: its sub-blocks when split,
    /// otherwise the single `start_time..end_time` pair.
    pub fn placement(&self) -> Vec<Interval> {
        if !self.blocks.is_empty() {
            return self.blocks.clone();
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => vec![Interval::new(start, end)],
            _ => Vec::new(),
        }
    }

    pub(crate) fn apply_placement(&mut self, windows: &[Interval]) {
        self.start_time = windows.first().map(|w| w.start);
        self.end_time = windows.last().map(|w| w.end);
        self.blocks = if windows.len() > 1 {
            windows.to_vec()
        } else {
            Vec::new()
        };
    }

    pub(crate) fn clear_placement(&mut self) {
        self.start_time = None;
        self.end_time = None;
        self.blocks.clear();
    }
}

/// A user-declared stretch of free time, either one-off or a weekly template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    #[serde(default)]
    pub owner: String,
    /// For recurring blocks only the wall-clock time (in the configured
    /// timezone) and the `end - start` length are used.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
    /// RFC 5545 RRULE body (e.g. `FREQ=DAILY;INTERVAL=2`). Takes precedence
    /// over `day_of_week`; the block's `start` is the rule's DTSTART.
    #[serde(default)]
    pub rrule: Option<String>,
}

impl TimeBlock {
    pub fn once(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner: String::new(),
            start,
            end,
            is_recurring: false,
            day_of_week: None,
            rrule: None,
        }
    }

    pub fn weekly(
        id: impl Into<String>,
        day: Weekday,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            is_recurring: true,
            day_of_week: Some(day),
            ..Self::once(id, start, end)
        }
    }

    pub fn with_rrule(mut self, rule: impl Into<String>) -> Self {
        self.is_recurring = true;
        self.rrule = Some(rule.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

/// One contiguous placement of (part of) a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    pub task_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduledBlock {
    pub fn window(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Machine-readable reason a task ended up unscheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// Free time ran out.
    InsufficientCapacity,
    /// Enough free time exists, but not before this task's deadline.
    DeadlineUnreachable,
    /// Bumped to make room for a sacrifice-mode task.
    EvictedBySacrifice,
    /// Sacrifice mode could not reclaim enough time from unlocked tasks.
    CannotResolveConflict,
    /// Overload was detected and the caller has not chosen a strategy.
    OverloadStrategyRequired,
    /// A locked task with no window; it may not be moved, so it is not placed.
    LockedWithoutPlacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub task: Task,
    pub blocks: Vec<ScheduledBlock>,
}

impl ScheduledTask {
    pub(crate) fn new(mut task: Task, windows: &[Interval]) -> Self {
        if !task.is_locked {
            task.apply_placement(windows);
            task.remaining_hours = Some(0.0);
        }
        let blocks = windows
            .iter()
            .map(|w| ScheduledBlock {
                task_id: task.id.clone(),
                start: w.start,
                end: w.end,
            })
            .collect();
        Self { task, blocks }
    }

    pub fn scheduled_hours(&self) -> f64 {
        self.blocks
            .iter()
            .map(|b| duration_to_hours(b.end - b.start))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledTask {
    pub task: Task,
    pub reason: UnscheduledReason,
}

/// Capacity figures for a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    pub total_available_hours: f64,
    pub total_scheduled_hours: f64,
    /// Scheduled hours as a percentage of available hours.
    pub utilization_rate: f64,
}

/// Everything a scheduling run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub scheduled: Vec<ScheduledTask>,
    pub unscheduled: Vec<UnscheduledTask>,
    /// Ids of completed tasks, which take no part in scheduling.
    pub excluded: Vec<String>,
    pub overload: bool,
    pub overload_report: Option<OverloadReport>,
    /// Ids of tasks bumped by sacrifice mode.
    pub evicted: Vec<String>,
    pub stats: ScheduleStats,
}

impl ScheduleResult {
    /// Every placed block across all scheduled tasks.
    pub fn all_blocks(&self) -> Vec<ScheduledBlock> {
        self.scheduled
            .iter()
            .flat_map(|s| s.blocks.iter().cloned())
            .collect()
    }

    pub fn find_scheduled(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.scheduled.iter().find(|s| s.task.id == task_id)
    }

    pub fn find_unscheduled(&self, task_id: &str) -> Option<&UnscheduledTask> {
        self.unscheduled.iter().find(|u| u.task.id == task_id)
    }

    /// The scheduled tasks with their placements pinned, ready to be fed back
    /// into another run.
    pub fn into_locked_tasks(self) -> Vec<Task> {
        self.scheduled
            .into_iter()
            .map(|s| {
                let mut task = s.task;
                let windows: Vec<Interval> = s.blocks.iter().map(ScheduledBlock::window).collect();
                task.apply_placement(&windows);
                task.is_locked = true;
                task
            })
            .collect()
    }
}
