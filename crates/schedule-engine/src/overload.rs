//! Pre-flight capacity check and the compression hook for overloaded runs.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::interval::{duration_to_hours, AvailabilityPool};
use crate::model::Priority;
use crate::placer::Demand;

/// Work booked at one priority level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorityLoad {
    pub count: usize,
    pub hours: f64,
}

/// Capacity analysis of a run, produced before anything is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadReport {
    pub is_overloaded: bool,
    pub required_hours: f64,
    /// Free time in intervals long enough to hold the smallest minimum block.
    pub available_hours: f64,
    pub overload_ratio: f64,
    pub excess_hours: f64,
    pub priority_distribution: BTreeMap<Priority, PriorityLoad>,
    pub recommendations: Vec<String>,
}

/// Compare the work in `demands` with the free time in `pool`.
///
/// Fragments shorter than every task's minimum block cannot host any work,
/// so they are left out of the available total.
pub fn detect_overload(pool: &AvailabilityPool, demands: &[Demand]) -> OverloadReport {
    let required = demands
        .iter()
        .fold(Duration::zero(), |acc, d| acc + d.need);
    let smallest_block = demands
        .iter()
        .map(|d| d.min_block)
        .min()
        .unwrap_or_else(Duration::zero);
    let available = pool.usable_total(smallest_block);

    let required_hours = duration_to_hours(required);
    let available_hours = duration_to_hours(available);
    let overload_ratio = required_hours / available_hours.max(0.01);

    let mut priority_distribution: BTreeMap<Priority, PriorityLoad> = BTreeMap::new();
    for demand in demands {
        let load = priority_distribution.entry(demand.priority).or_default();
        load.count += 1;
        load.hours += duration_to_hours(demand.need);
    }

    let recommendations = recommendations(overload_ratio, &priority_distribution);

    OverloadReport {
        is_overloaded: required > available,
        required_hours,
        available_hours,
        overload_ratio,
        excess_hours: (required_hours - available_hours).max(0.0),
        priority_distribution,
        recommendations,
    }
}

fn recommendations(ratio: f64, distribution: &BTreeMap<Priority, PriorityLoad>) -> Vec<String> {
    let mut out = Vec::new();

    if ratio > 2.0 {
        out.push("Defer low-priority tasks to a later week".to_string());
        out.push("Break large tasks into smaller sessions".to_string());
    } else if ratio > 1.2 {
        out.push("Reduce the scope of some tasks".to_string());
        out.push("Negotiate later deadlines where possible".to_string());
    } else if ratio > 1.1 {
        out.push("The schedule is tight; consider declaring more free time".to_string());
    }

    let pressing: f64 = [Priority::Urgent, Priority::High]
        .iter()
        .filter_map(|p| distribution.get(p))
        .map(|l| l.hours)
        .sum();
    if pressing > 8.0 {
        out.push("Heavy urgent and high-priority load; protect focus time for it".to_string());
    }

    if distribution
        .get(&Priority::Low)
        .is_some_and(|l| l.hours > 4.0)
    {
        out.push("Consider deferring some low-priority tasks".to_string());
    }

    out
}

/// Post-processing applied to demands when the caller picks
/// [`OverloadStrategy::Compress`](crate::options::OverloadStrategy::Compress).
///
/// Implementations may only shrink `need`, and must keep `min_block <= need`.
pub trait DurationCompressor {
    fn compress(&self, demands: &mut [Demand], available: Duration);
}

/// Scales every demand by `available / required`, rounded down to whole
/// minutes and never below the task's minimum block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalCompressor;

impl DurationCompressor for ProportionalCompressor {
    fn compress(&self, demands: &mut [Demand], available: Duration) {
        let required = demands
            .iter()
            .fold(Duration::zero(), |acc, d| acc + d.need);
        if required <= available || required <= Duration::zero() {
            return;
        }
        let factor = available.num_seconds() as f64 / required.num_seconds() as f64;
        for demand in demands.iter_mut() {
            let scaled = (demand.need.num_seconds() as f64 * factor).floor() as i64;
            let scaled = Duration::seconds(scaled - scaled % 60);
            demand.need = scaled.max(demand.min_block).min(demand.need);
        }
    }
}
