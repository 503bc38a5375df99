//! The single entry point: tasks + time blocks + options in, schedule out.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::conflict::find_overlaps;
use crate::error::{Result, ScheduleError};
use crate::expander::expand_availability;
use crate::interval::{duration_to_hours, hours_to_duration, AvailabilityPool, Interval};
use crate::model::{
    ScheduleResult, ScheduleStats, ScheduledTask, Task, TimeBlock, UnscheduledReason,
    UnscheduledTask, MAX_TASK_HOURS,
};
use crate::options::{OverloadStrategy, ScheduleOptions};
use crate::orderer::order_tasks;
use crate::overload::{
    detect_overload, DurationCompressor, OverloadReport, ProportionalCompressor,
};
use crate::placer::{Demand, PlacementOutcome, Placer};
use crate::sacrifice::{Occupant, SacrificeOutcome, SacrificeResolver};

/// Compute a schedule, compressing with [`ProportionalCompressor`] when the
/// caller picks [`OverloadStrategy::Compress`].
///
/// # Errors
/// Returns a [`ScheduleError`] for malformed input; nothing is computed in
/// that case.
pub fn compute_schedule(
    tasks: &[Task],
    time_blocks: &[TimeBlock],
    options: &ScheduleOptions,
) -> Result<ScheduleResult> {
    compute_schedule_with(tasks, time_blocks, options, &ProportionalCompressor)
}

/// Like [`compute_schedule`], with a caller-supplied compression step.
pub fn compute_schedule_with(
    tasks: &[Task],
    time_blocks: &[TimeBlock],
    options: &ScheduleOptions,
    compressor: &dyn DurationCompressor,
) -> Result<ScheduleResult> {
    validate(tasks, options)?;
    let availability = expand_availability(time_blocks, options)?;

    let mut out = Assembly::default();
    let mut base = availability;

    for task in tasks {
        if task.is_completed() {
            out.excluded.push(task.id.clone());
        } else if task.is_locked {
            let windows = task.placement();
            if windows.is_empty() {
                warn!(task_id = %task.id, "locked task has no placement");
                out.reject(task, UnscheduledReason::LockedWithoutPlacement, None);
            } else {
                for window in &windows {
                    base.subtract(window);
                }
                out.scheduled.push(ScheduledTask::new(task.clone(), &windows));
            }
        }
    }

    let locked_overlaps = find_overlaps(&out.scheduled_blocks());
    if !locked_overlaps.is_empty() {
        warn!(count = locked_overlaps.len(), "locked tasks overlap each other");
    }

    let pending: Vec<&Task> = tasks
        .iter()
        .filter(|t| !t.is_completed() && !t.is_locked)
        .collect();

    match options.sacrifice_task_id.as_deref() {
        Some(target_id) => run_sacrifice(&mut out, &base, &pending, target_id, options),
        None => run_full_pass(&mut out, &base, &pending, options, compressor),
    }

    let result = out.finish(&base);
    info!(
        scheduled = result.scheduled.len(),
        unscheduled = result.unscheduled.len(),
        evicted = result.evicted.len(),
        overload = result.overload,
        "schedule computed"
    );
    Ok(result)
}

fn run_full_pass(
    out: &mut Assembly,
    base: &AvailabilityPool,
    pending: &[&Task],
    options: &ScheduleOptions,
    compressor: &dyn DurationCompressor,
) {
    let by_id = index(pending);
    let mut demands = order_tasks(pending.iter().copied(), options);

    if options.detect_overload && !demands.is_empty() {
        let report = detect_overload(base, &demands);
        if report.is_overloaded {
            out.overload = true;
            match options.overload_strategy {
                None => {
                    info!(
                        required_hours = report.required_hours,
                        available_hours = report.available_hours,
                        "overload detected; caller must choose a strategy"
                    );
                    for demand in &demands {
                        out.reject(
                            by_id[demand.task_id.as_str()],
                            UnscheduledReason::OverloadStrategyRequired,
                            Some(demand),
                        );
                    }
                    out.overload_report = Some(report);
                    return;
                }
                Some(OverloadStrategy::Prioritize) => {}
                Some(OverloadStrategy::Compress) => {
                    compressor.compress(&mut demands, hours_to_duration(report.available_hours));
                }
            }
        }
        out.overload_report = Some(report);
    }

    let mut placer = Placer::new(base.clone(), options.allow_splitting);
    place_all(out, &mut placer, &demands, &by_id);
}

fn run_sacrifice(
    out: &mut Assembly,
    base: &AvailabilityPool,
    pending: &[&Task],
    target_id: &str,
    options: &ScheduleOptions,
) {
    let by_id = index(pending);
    let mut free = base.clone();

    // Existing unlocked placements stay where they are unless evicted.
    let occupants: Vec<Occupant> = pending
        .iter()
        .filter(|t| t.id != target_id && !t.placement().is_empty())
        .map(|t| Occupant::from_task(t))
        .collect();
    for occupant in &occupants {
        for window in &occupant.windows {
            free.subtract(window);
        }
    }

    let target = by_id[target_id];
    let demand = Demand::from_task(target, options);
    let resolver = SacrificeResolver::new(base, options.allow_splitting);
    let evicted: HashSet<String> = match resolver.resolve(&mut free, &demand, &occupants) {
        SacrificeOutcome::Placed { windows, evicted } => {
            out.place(target, &windows);
            evicted.into_iter().collect()
        }
        SacrificeOutcome::Unresolved => {
            out.reject(target, UnscheduledReason::CannotResolveConflict, Some(&demand));
            HashSet::new()
        }
    };

    for occupant in &occupants {
        let task = by_id[occupant.task_id.as_str()];
        if evicted.contains(&occupant.task_id) {
            let need = Demand::from_task(task, options);
            out.reject(task, UnscheduledReason::EvictedBySacrifice, Some(&need));
            out.evicted.push(occupant.task_id.clone());
        } else {
            out.place(task, &occupant.windows);
        }
    }

    // Anything else still waiting gets a normal pass over what is left.
    let rest = pending
        .iter()
        .copied()
        .filter(|t| t.id != target_id && t.placement().is_empty());
    let demands = order_tasks(rest, options);
    let mut placer = Placer::new(free, options.allow_splitting);
    place_all(out, &mut placer, &demands, &by_id);
}

fn place_all(
    out: &mut Assembly,
    placer: &mut Placer,
    demands: &[Demand],
    by_id: &HashMap<&str, &Task>,
) {
    for demand in demands {
        let task = by_id[demand.task_id.as_str()];
        match placer.place(demand) {
            PlacementOutcome::Placed(windows) => out.place(task, &windows),
            PlacementOutcome::Failed(reason) => out.reject(task, reason, Some(demand)),
        }
    }
}

fn index<'a>(tasks: &[&'a Task]) -> HashMap<&'a str, &'a Task> {
    tasks.iter().map(|t| (t.id.as_str(), *t)).collect()
}

/// Reject malformed input before any computation starts.
fn validate(tasks: &[Task], options: &ScheduleOptions) -> Result<()> {
    options.validate()?;

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(ScheduleError::DuplicateTask(task.id.clone()));
        }
        let invalid = |reason: String| ScheduleError::InvalidTask {
            id: task.id.clone(),
            reason,
        };
        if !(task.estimated_hours.is_finite() && task.estimated_hours > 0.0) {
            return Err(invalid(format!(
                "estimatedHours must be positive, got {}",
                task.estimated_hours
            )));
        }
        if let Some(min) = task.min_block_size {
            if !(min.is_finite() && min > 0.0) {
                return Err(invalid(format!("minBlockSize must be positive, got {}", min)));
            }
        }
        if let Some(logged) = task.actual_hours {
            if !(logged.is_finite() && logged >= 0.0) {
                return Err(invalid(format!(
                    "actualHours must not be negative, got {}",
                    logged
                )));
            }
        }
        let hour_fields = [
            ("estimatedHours", Some(task.estimated_hours)),
            ("minBlockSize", task.min_block_size),
            ("actualHours", task.actual_hours),
        ];
        for (field, value) in hour_fields {
            if let Some(hours) = value.filter(|h| *h > MAX_TASK_HOURS) {
                return Err(invalid(format!(
                    "{} must be at most {}, got {}",
                    field, MAX_TASK_HOURS, hours
                )));
            }
        }
        match (task.start_time, task.end_time) {
            (Some(start), Some(end)) if end <= start => {
                return Err(invalid(format!(
                    "endTime {} is not after startTime {}",
                    end, start
                )));
            }
            (Some(_), None) | (None, Some(_)) if task.blocks.is_empty() => {
                return Err(invalid("startTime and endTime must be set together".to_string()));
            }
            _ => {}
        }
        if task.blocks.iter().any(Interval::is_empty) {
            return Err(invalid("every sub-block must end after it starts".to_string()));
        }
    }

    if let Some(target_id) = &options.sacrifice_task_id {
        let target = tasks
            .iter()
            .find(|t| &t.id == target_id)
            .ok_or_else(|| ScheduleError::UnknownTask(target_id.clone()))?;
        if target.is_locked || target.is_completed() {
            return Err(ScheduleError::InvalidOptions(format!(
                "sacrifice target {} must be an open, unlocked task",
                target_id
            )));
        }
    }

    Ok(())
}

/// Collects per-task outcomes and turns them into a [`ScheduleResult`].
#[derive(Default)]
struct Assembly {
    scheduled: Vec<ScheduledTask>,
    unscheduled: Vec<UnscheduledTask>,
    excluded: Vec<String>,
    evicted: Vec<String>,
    overload: bool,
    overload_report: Option<OverloadReport>,
}

impl Assembly {
    fn place(&mut self, task: &Task, windows: &[Interval]) {
        self.scheduled.push(ScheduledTask::new(task.clone(), windows));
    }

    fn reject(&mut self, task: &Task, reason: UnscheduledReason, demand: Option<&Demand>) {
        let mut task = task.clone();
        if !task.is_locked {
            task.clear_placement();
            task.remaining_hours = demand.map(|d| duration_to_hours(d.need));
        }
        self.unscheduled.push(UnscheduledTask { task, reason });
    }

    fn scheduled_blocks(&self) -> Vec<crate::model::ScheduledBlock> {
        self.scheduled
            .iter()
            .flat_map(|s| s.blocks.iter().cloned())
            .collect()
    }

    fn finish(mut self, base: &AvailabilityPool) -> ScheduleResult {
        self.scheduled.sort_by(|a, b| {
            let first = |s: &ScheduledTask| s.blocks.first().map(|b| b.start);
            first(a)
                .cmp(&first(b))
                .then_with(|| a.task.id.cmp(&b.task.id))
        });
        self.unscheduled.sort_by(|a, b| a.task.id.cmp(&b.task.id));
        self.excluded.sort();
        self.evicted.sort();

        let total_available_hours = duration_to_hours(base.total());
        let total_scheduled_hours: f64 = self
            .scheduled
            .iter()
            .filter(|s| !s.task.is_locked)
            .map(ScheduledTask::scheduled_hours)
            .sum();

        ScheduleResult {
            scheduled: self.scheduled,
            unscheduled: self.unscheduled,
            excluded: self.excluded,
            overload: self.overload,
            overload_report: self.overload_report,
            evicted: self.evicted,
            stats: ScheduleStats {
                total_available_hours,
                total_scheduled_hours,
                utilization_rate: total_scheduled_hours / total_available_hours.max(0.01) * 100.0,
            },
        }
    }
}
