//! Deterministic ordering of the tasks that need placement.

use std::cmp::{Ordering, Reverse};

use crate::model::Task;
use crate::options::ScheduleOptions;
use crate::placer::Demand;

/// Build demands for every task that needs placement and put them in
/// placement order. Completed and locked tasks are skipped.
pub fn order_tasks<'a, I>(tasks: I, options: &ScheduleOptions) -> Vec<Demand>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut demands: Vec<Demand> = tasks
        .into_iter()
        .filter(|t| !t.is_completed() && !t.is_locked)
        .map(|t| Demand::from_task(t, options))
        .collect();
    order_demands(&mut demands);
    demands
}

/// Sort in place: priority descending, then deadline ascending with
/// undeadlined tasks last, then remaining need descending, then task id.
pub fn order_demands(demands: &mut [Demand]) {
    demands.sort_by(compare);
}

fn compare(a: &Demand, b: &Demand) -> Ordering {
    Reverse(a.priority)
        .cmp(&Reverse(b.priority))
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.need.cmp(&a.need))
        .then_with(|| a.task_id.cmp(&b.task_id))
}
