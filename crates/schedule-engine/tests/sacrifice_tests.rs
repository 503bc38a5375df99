//! Tests for sacrifice-mode victim selection and all-or-nothing eviction.

use chrono::{DateTime, Duration, TimeZone, Utc};
use schedule_engine::placer::Demand;
use schedule_engine::sacrifice::{Occupant, SacrificeOutcome, SacrificeResolver};
use schedule_engine::{AvailabilityPool, Interval, Priority};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn iv(start_hour: u32, end_hour: u32) -> Interval {
    Interval::new(at(16, start_hour), at(16, end_hour))
}

fn occupant(id: &str, priority: Priority, window: Interval) -> Occupant {
    Occupant {
        task_id: id.to_string(),
        priority,
        deadline: None,
        windows: vec![window],
    }
}

fn urgent(hours: i64) -> Demand {
    Demand {
        task_id: "urgent".to_string(),
        priority: Priority::Urgent,
        deadline: None,
        need: Duration::hours(hours),
        min_block: Duration::hours(hours),
    }
}

/// Free pool = base minus every occupant's windows.
fn free_of(base: &AvailabilityPool, occupants: &[Occupant]) -> AvailabilityPool {
    let mut free = base.clone();
    for o in occupants {
        for w in &o.windows {
            free.subtract(w);
        }
    }
    free
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn no_eviction_when_free_time_suffices() {
    let base = AvailabilityPool::new(vec![iv(9, 13)]);
    let occupants = vec![occupant("low", Priority::Low, iv(9, 11))];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(2), &occupants);

    assert_eq!(
        outcome,
        SacrificeOutcome::Placed {
            windows: vec![iv(11, 13)],
            evicted: vec![],
        }
    );
    assert!(free.is_empty());
}

#[test]
fn lowest_priority_is_evicted_first() {
    let base = AvailabilityPool::new(vec![iv(9, 13)]);
    let occupants = vec![
        occupant("medium", Priority::Medium, iv(9, 11)),
        occupant("low", Priority::Low, iv(11, 13)),
    ];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(2), &occupants);

    assert_eq!(
        outcome,
        SacrificeOutcome::Placed {
            windows: vec![iv(11, 13)],
            evicted: vec!["low".to_string()],
        }
    );
}

#[test]
fn among_equal_priority_the_least_pressed_is_evicted() {
    let base = AvailabilityPool::new(vec![iv(9, 13)]);
    let mut due_soon = occupant("due-soon", Priority::Low, iv(9, 11));
    due_soon.deadline = Some(at(17, 9));
    let mut due_later = occupant("due-later", Priority::Low, iv(11, 13));
    due_later.deadline = Some(at(20, 9));
    let occupants = vec![due_soon, due_later];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(2), &occupants);

    match outcome {
        SacrificeOutcome::Placed { evicted, .. } => assert_eq!(evicted, vec!["due-later"]),
        SacrificeOutcome::Unresolved => panic!("expected placement"),
    }
}

#[test]
fn victims_that_did_not_help_are_spared() {
    // "low" only frees 1h, which is useless to a 2h unsplittable task.
    // "medium" frees 2h on its own, so "low" keeps its slot.
    let base = AvailabilityPool::new(vec![iv(9, 10), iv(14, 16)]);
    let occupants = vec![
        occupant("low", Priority::Low, iv(9, 10)),
        occupant("medium", Priority::Medium, iv(14, 16)),
    ];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(2), &occupants);

    assert_eq!(
        outcome,
        SacrificeOutcome::Placed {
            windows: vec![iv(14, 16)],
            evicted: vec!["medium".to_string()],
        }
    );
    assert!(free.is_empty());
}

#[test]
fn several_victims_can_be_combined() {
    let base = AvailabilityPool::new(vec![iv(9, 12)]);
    let occupants = vec![
        occupant("a", Priority::Low, iv(9, 10)),
        occupant("b", Priority::Low, iv(10, 11)),
        occupant("c", Priority::Low, iv(11, 12)),
    ];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(3), &occupants);

    match outcome {
        SacrificeOutcome::Placed { windows, evicted } => {
            assert_eq!(windows, vec![iv(9, 12)]);
            assert_eq!(evicted, vec!["a", "b", "c"]);
        }
        SacrificeOutcome::Unresolved => panic!("expected placement"),
    }
}

#[test]
fn unresolved_leaves_pool_untouched() {
    let base = AvailabilityPool::new(vec![iv(9, 10)]);
    let occupants = vec![occupant("low", Priority::Low, iv(9, 10))];
    let mut free = free_of(&base, &occupants);
    let before = free.clone();

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(2), &occupants);

    assert_eq!(outcome, SacrificeOutcome::Unresolved);
    assert_eq!(free, before);
}

#[test]
fn occupants_after_the_deadline_are_not_candidates() {
    let base = AvailabilityPool::new(vec![iv(9, 11), iv(14, 16)]);
    let occupants = vec![
        occupant("morning", Priority::Medium, iv(9, 11)),
        occupant("afternoon", Priority::Low, iv(14, 16)),
    ];
    let mut free = free_of(&base, &occupants);
    let mut target = urgent(2);
    target.deadline = Some(at(16, 12));

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &target, &occupants);

    match outcome {
        SacrificeOutcome::Placed { windows, evicted } => {
            assert_eq!(windows, vec![iv(9, 11)]);
            assert_eq!(evicted, vec!["morning"]);
        }
        SacrificeOutcome::Unresolved => panic!("expected placement"),
    }
}

#[test]
fn equal_or_higher_priority_is_never_evicted() {
    let base = AvailabilityPool::new(vec![iv(9, 13)]);
    let occupants = vec![
        occupant("peer", Priority::Medium, iv(9, 11)),
        occupant("boss", Priority::Urgent, iv(11, 13)),
    ];
    let mut free = free_of(&base, &occupants);
    let before = free.clone();
    let mut target = urgent(2);
    target.priority = Priority::Medium;

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &target, &occupants);

    assert_eq!(outcome, SacrificeOutcome::Unresolved);
    assert_eq!(free, before);
}

#[test]
fn highest_priority_victims_are_spared_first() {
    // "high" must go either way. Pairing it with "low" or with "medium"
    // both make room for 3h, so "medium" keeps its slot.
    let base = AvailabilityPool::new(vec![iv(9, 13)]);
    let occupants = vec![
        occupant("low", Priority::Low, iv(9, 10)),
        occupant("high", Priority::High, iv(10, 12)),
        occupant("medium", Priority::Medium, iv(12, 13)),
    ];
    let mut free = free_of(&base, &occupants);

    let outcome = SacrificeResolver::new(&base, true).resolve(&mut free, &urgent(3), &occupants);

    assert_eq!(
        outcome,
        SacrificeOutcome::Placed {
            windows: vec![iv(9, 12)],
            evicted: vec!["low".to_string(), "high".to_string()],
        }
    );
    assert!(free.is_empty());
}
