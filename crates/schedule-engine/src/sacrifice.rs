//! Sacrifice mode: make room for one task by evicting lower-priority,
//! unlocked placements.
//!
//! Only occupants of strictly lower priority than the target are candidates.
//! Victims are taken lowest priority first, and among equals the one with the
//! most slack (latest deadline, or none) first. Victims are added one at a time
//! until the target fits; victims that turn out not to be needed are then
//! spared, last chosen first, so the highest-priority victims keep their slots
//! whenever a cheaper set still makes room. Either the whole eviction set is
//! committed together with the target's placement, or nothing changes.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::interval::{AvailabilityPool, Interval};
use crate::model::{Priority, Task};
use crate::placer::{plan, Demand};

/// A placed, unlocked task whose time may be reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub task_id: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub windows: Vec<Interval>,
}

impl Occupant {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            priority: task.priority,
            deadline: task.deadline,
            windows: task.placement(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SacrificeOutcome {
    Placed {
        windows: Vec<Interval>,
        evicted: Vec<String>,
    },
    Unresolved,
}

pub struct SacrificeResolver<'a> {
    /// Declared free time minus locked placements: the most a victim's
    /// window can give back.
    base: &'a AvailabilityPool,
    allow_splitting: bool,
}

impl<'a> SacrificeResolver<'a> {
    pub fn new(base: &'a AvailabilityPool, allow_splitting: bool) -> Self {
        Self {
            base,
            allow_splitting,
        }
    }

    /// Place `target` into `free`, evicting from `occupants` if needed.
    ///
    /// On success `free` has the evicted windows returned and the target's
    /// windows consumed. On failure `free` is left as it was.
    pub fn resolve(
        &self,
        free: &mut AvailabilityPool,
        target: &Demand,
        occupants: &[Occupant],
    ) -> SacrificeOutcome {
        if let Some(windows) = plan(free, target, self.allow_splitting) {
            for window in &windows {
                free.subtract(window);
            }
            debug!(task_id = %target.task_id, "sacrifice target fit without eviction");
            return SacrificeOutcome::Placed {
                windows,
                evicted: Vec::new(),
            };
        }

        let candidates = victim_order(target, occupants);
        let mut chosen: Vec<&Occupant> = Vec::new();
        for victim in candidates {
            chosen.push(victim);
            if self.try_with(free, target, &chosen).is_some() {
                let kept = self.spare_unneeded(free, target, chosen);
                return self.commit(free, target, kept);
            }
        }

        info!(
            task_id = %target.task_id,
            "sacrifice mode could not reclaim enough unlocked time"
        );
        SacrificeOutcome::Unresolved
    }

    fn try_with(
        &self,
        free: &AvailabilityPool,
        target: &Demand,
        victims: &[&Occupant],
    ) -> Option<(AvailabilityPool, Vec<Interval>)> {
        let mut trial = free.clone();
        for victim in victims {
            for window in &victim.windows {
                trial.restore(window, self.base);
            }
        }
        plan(&trial, target, self.allow_splitting).map(|windows| (trial, windows))
    }

    /// Drop victims whose eviction is not needed for the target to fit,
    /// trying the last chosen (highest priority) first.
    fn spare_unneeded<'o>(
        &self,
        free: &AvailabilityPool,
        target: &Demand,
        chosen: Vec<&'o Occupant>,
    ) -> Vec<&'o Occupant> {
        let mut kept = chosen.clone();
        for victim in chosen.into_iter().rev() {
            let without: Vec<&Occupant> = kept
                .iter()
                .copied()
                .filter(|o| o.task_id != victim.task_id)
                .collect();
            if self.try_with(free, target, &without).is_some() {
                kept = without;
            }
        }
        kept
    }

    fn commit(
        &self,
        free: &mut AvailabilityPool,
        target: &Demand,
        victims: Vec<&Occupant>,
    ) -> SacrificeOutcome {
        let Some((mut trial, windows)) = self.try_with(free, target, &victims) else {
            return SacrificeOutcome::Unresolved;
        };
        for window in &windows {
            trial.subtract(window);
        }
        *free = trial;

        let evicted: Vec<String> = victims.iter().map(|v| v.task_id.clone()).collect();
        info!(
            task_id = %target.task_id,
            evicted = ?evicted,
            "sacrifice mode placed task"
        );
        SacrificeOutcome::Placed { windows, evicted }
    }
}

/// Lower-priority occupants that hold time before the target's deadline, in
/// eviction order.
fn victim_order<'o>(target: &Demand, occupants: &'o [Occupant]) -> Vec<&'o Occupant> {
    let mut candidates: Vec<&Occupant> = occupants
        .iter()
        .filter(|o| o.task_id != target.task_id && !o.windows.is_empty())
        .filter(|o| o.priority < target.priority)
        .filter(|o| match target.deadline {
            Some(deadline) => o.windows.iter().any(|w| w.start < deadline),
            None => true,
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| match (a.deadline, b.deadline) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => y.cmp(&x),
            })
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    candidates
}
