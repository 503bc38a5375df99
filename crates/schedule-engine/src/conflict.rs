//! Detect overlapping placements.
//!
//! Adjacent blocks (one ends exactly when another starts) are NOT conflicts.

use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::model::{ScheduledBlock, Task};

/// Two blocks belonging to different tasks that share time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub block_a: ScheduledBlock,
    pub block_b: ScheduledBlock,
    pub overlap_minutes: i64,
}

fn conflict_between(a: &ScheduledBlock, b: &ScheduledBlock) -> Option<Conflict> {
    a.window().intersect(&b.window()).map(|overlap| Conflict {
        block_a: a.clone(),
        block_b: b.clone(),
        overlap_minutes: overlap.duration().num_minutes(),
    })
}

/// Find all pairwise conflicts between two block lists.
pub fn find_conflicts(blocks_a: &[ScheduledBlock], blocks_b: &[ScheduledBlock]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for a in blocks_a {
        for b in blocks_b {
            if let Some(conflict) = conflict_between(a, b) {
                conflicts.push(conflict);
            }
        }
    }
    conflicts
}

/// Find conflicts within one block list, ignoring blocks of the same task.
pub fn find_overlaps(blocks: &[ScheduledBlock]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            if a.task_id == b.task_id {
                continue;
            }
            if let Some(conflict) = conflict_between(a, b) {
                conflicts.push(conflict);
            }
        }
    }
    conflicts
}

/// Check a manually chosen window for `task_id` against every other placed,
/// non-completed task.
pub fn check_manual_placement(task_id: &str, window: Interval, tasks: &[Task]) -> Vec<Conflict> {
    let proposed = [ScheduledBlock {
        task_id: task_id.to_string(),
        start: window.start,
        end: window.end,
    }];
    let existing: Vec<ScheduledBlock> = tasks
        .iter()
        .filter(|t| t.id != task_id && !t.is_completed())
        .flat_map(|t| {
            t.placement().into_iter().map(|w| ScheduledBlock {
                task_id: t.id.clone(),
                start: w.start,
                end: w.end,
            })
        })
        .collect();
    find_conflicts(&proposed, &existing)
}
