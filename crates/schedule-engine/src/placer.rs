//! Greedy placement of tasks into the free-interval pool.
//!
//! Each task is placed front-loaded: the earliest interval that can hold the
//! whole remaining need wins. Failing that, the task is split across the
//! largest eligible intervals (earliest first on ties). A task is either
//! placed completely or leaves the pool untouched.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::interval::{hours_to_duration, AvailabilityPool, Interval};
use crate::model::{Priority, Task, TaskStatus, UnscheduledReason};
use crate::options::{RemainingPolicy, ScheduleOptions};

/// The time a single task asks of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand {
    pub task_id: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    /// Total time still to place.
    pub need: Duration,
    /// Smallest sub-block allowed. Never larger than `need`, so a task whose
    /// estimate is below its minimum block is placed whole or not at all.
    pub min_block: Duration,
}

impl Demand {
    /// Measure what `task` needs under the configured remaining-work policy.
    ///
    /// In-progress work logged against the task is subtracted under
    /// [`RemainingPolicy::SubtractLogged`]; the result never drops below one
    /// minimum block, so an over-budget task still gets a session.
    pub fn from_task(task: &Task, options: &ScheduleOptions) -> Self {
        let estimate = hours_to_duration(task.estimated_hours);
        let min_block = task
            .min_block_size
            .map(hours_to_duration)
            .unwrap_or_else(|| {
                hours_to_duration(task.estimated_hours * options.default_min_block_fraction)
            })
            .max(Duration::seconds(1));

        let logged = match (options.remaining_policy, task.status) {
            (RemainingPolicy::SubtractLogged, TaskStatus::InProgress) => {
                task.actual_hours.map(hours_to_duration).unwrap_or_else(Duration::zero)
            }
            _ => Duration::zero(),
        };
        let need = (estimate - logged).max(min_block.min(estimate));

        Self {
            task_id: task.id.clone(),
            priority: task.priority,
            deadline: task.deadline,
            need,
            min_block: min_block.min(need),
        }
    }

    pub fn is_splittable(&self) -> bool {
        self.need > self.min_block
    }
}

/// Outcome of placing one demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed(Vec<Interval>),
    Failed(UnscheduledReason),
}

/// Owns the working pool for one run and consumes it task by task.
#[derive(Debug, Clone)]
pub struct Placer {
    pool: AvailabilityPool,
    allow_splitting: bool,
}

impl Placer {
    pub fn new(pool: AvailabilityPool, allow_splitting: bool) -> Self {
        Self {
            pool,
            allow_splitting,
        }
    }

    pub fn pool(&self) -> &AvailabilityPool {
        &self.pool
    }

    pub fn into_pool(self) -> AvailabilityPool {
        self.pool
    }

    /// Place `demand`, consuming the chosen windows from the pool on success.
    pub fn place(&mut self, demand: &Demand) -> PlacementOutcome {
        match plan(&self.pool, demand, self.allow_splitting) {
            Some(windows) => {
                for window in &windows {
                    self.pool.subtract(window);
                }
                debug!(
                    task_id = %demand.task_id,
                    blocks = windows.len(),
                    "placed task"
                );
                PlacementOutcome::Placed(windows)
            }
            None => {
                let reason = self.failure_reason(demand);
                debug!(task_id = %demand.task_id, ?reason, "could not place task");
                PlacementOutcome::Failed(reason)
            }
        }
    }

    /// A failure is blamed on the deadline only when the same demand would
    /// fit without one.
    fn failure_reason(&self, demand: &Demand) -> UnscheduledReason {
        if demand.deadline.is_none() {
            return UnscheduledReason::InsufficientCapacity;
        }
        let relaxed = Demand {
            deadline: None,
            ..demand.clone()
        };
        if plan(&self.pool, &relaxed, self.allow_splitting).is_some() {
            UnscheduledReason::DeadlineUnreachable
        } else {
            UnscheduledReason::InsufficientCapacity
        }
    }
}

/// Choose windows for `demand` without touching the pool.
///
/// Returns the windows in chronological order, or `None` when the demand
/// cannot be met in full.
pub fn plan(
    pool: &AvailabilityPool,
    demand: &Demand,
    allow_splitting: bool,
) -> Option<Vec<Interval>> {
    let eligible: Vec<Interval> = pool
        .intervals()
        .iter()
        .filter_map(|iv| iv.truncate_at(demand.deadline))
        .collect();

    if let Some(iv) = eligible.iter().find(|iv| iv.duration() >= demand.need) {
        return Some(vec![Interval::new(iv.start, iv.start + demand.need)]);
    }

    if !allow_splitting || !demand.is_splittable() {
        return None;
    }

    let mut candidates: Vec<Interval> = eligible
        .into_iter()
        .filter(|iv| iv.duration() >= demand.min_block)
        .collect();
    candidates.sort_by(|a, b| {
        b.duration()
            .cmp(&a.duration())
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut remaining = demand.need;
    let mut pieces = Vec::new();
    for iv in candidates {
        if remaining <= Duration::zero() {
            break;
        }
        // A tail shorter than the minimum block is rounded up to one block.
        let mut take = iv.duration().min(remaining.max(demand.min_block));
        let leftover = remaining - take;
        if leftover > Duration::zero() && leftover < demand.min_block {
            // Leave enough behind for a legal final block when possible.
            let shrunk = remaining - demand.min_block;
            if shrunk >= demand.min_block {
                take = shrunk;
            }
        }
        pieces.push(Interval::new(iv.start, iv.start + take));
        remaining = remaining - take;
    }

    if remaining > Duration::zero() {
        return None;
    }
    pieces.sort();
    Some(pieces)
}
