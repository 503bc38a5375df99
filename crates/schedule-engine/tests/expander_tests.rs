//! Tests for availability expansion: weekly templates, RRULE blocks, one-off
//! blocks, horizon clipping, merging, and validation.

use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use schedule_engine::{
    expand_availability, DayWindow, Interval, ScheduleError, ScheduleOptions, TimeBlock,
};

fn utc(month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, min, 0).unwrap()
}

/// Sunday 2026-03-15 12:00 UTC. The following Monday is 2026-03-16.
fn sunday_noon() -> ScheduleOptions {
    ScheduleOptions::new(utc(3, 15, 12, 0))
}

fn monday_9_to_12() -> TimeBlock {
    // Only the wall-clock time of a weekly template matters.
    TimeBlock::weekly("mon", Weekday::Mon, utc(1, 5, 9, 0), utc(1, 5, 12, 0))
}

#[test]
fn weekly_block_expands_once_in_default_horizon() {
    let pool = expand_availability(&[monday_9_to_12()], &sunday_noon()).unwrap();
    assert_eq!(
        pool.intervals(),
        &[Interval::new(utc(3, 16, 9, 0), utc(3, 16, 12, 0))]
    );
}

#[test]
fn weekly_block_repeats_across_longer_horizon() {
    let options = sunday_noon().with_horizon_days(14);
    let pool = expand_availability(&[monday_9_to_12()], &options).unwrap();
    assert_eq!(
        pool.intervals(),
        &[
            Interval::new(utc(3, 16, 9, 0), utc(3, 16, 12, 0)),
            Interval::new(utc(3, 23, 9, 0), utc(3, 23, 12, 0)),
        ]
    );
}

#[test]
fn instance_in_progress_starts_at_reference_time() {
    let options = ScheduleOptions::new(utc(3, 16, 10, 0));
    let pool = expand_availability(&[monday_9_to_12()], &options).unwrap();
    assert_eq!(
        pool.intervals()[0],
        Interval::new(utc(3, 16, 10, 0), utc(3, 16, 12, 0))
    );
}

#[test]
fn one_off_block_is_clipped_to_horizon() {
    let block = TimeBlock::once("today", utc(3, 15, 10, 0), utc(3, 15, 14, 0));
    let pool = expand_availability(&[block], &sunday_noon()).unwrap();
    assert_eq!(
        pool.intervals(),
        &[Interval::new(utc(3, 15, 12, 0), utc(3, 15, 14, 0))]
    );
}

#[test]
fn one_off_block_outside_horizon_is_dropped() {
    let block = TimeBlock::once("later", utc(4, 1, 9, 0), utc(4, 1, 10, 0));
    let pool = expand_availability(&[block], &sunday_noon()).unwrap();
    assert!(pool.is_empty());
}

#[test]
fn overlapping_and_touching_blocks_are_coalesced() {
    let blocks = vec![
        monday_9_to_12(),
        TimeBlock::once("extra", utc(3, 16, 11, 0), utc(3, 16, 13, 0)),
        TimeBlock::once("touching", utc(3, 16, 13, 0), utc(3, 16, 14, 0)),
        TimeBlock::once("separate", utc(3, 16, 15, 0), utc(3, 16, 16, 0)),
    ];
    let pool = expand_availability(&blocks, &sunday_noon()).unwrap();
    assert_eq!(
        pool.intervals(),
        &[
            Interval::new(utc(3, 16, 9, 0), utc(3, 16, 14, 0)),
            Interval::new(utc(3, 16, 15, 0), utc(3, 16, 16, 0)),
        ]
    );
}

#[test]
fn weekly_template_keeps_local_time_across_dst() {
    // 09:00 in New York. DST starts 2026-03-08, so the UTC hour moves.
    let block = TimeBlock::weekly("ny", Weekday::Mon, utc(3, 2, 14, 0), utc(3, 2, 15, 0));
    let options = ScheduleOptions::new(utc(3, 1, 12, 0))
        .with_horizon_days(14)
        .with_timezone("America/New_York");

    let pool = expand_availability(&[block], &options).unwrap();
    assert_eq!(
        pool.intervals(),
        &[
            Interval::new(utc(3, 2, 14, 0), utc(3, 2, 15, 0)),
            Interval::new(utc(3, 9, 13, 0), utc(3, 9, 14, 0)),
        ]
    );
}

#[test]
fn rrule_block_expands_daily_within_horizon() {
    let block = TimeBlock::once("evenings", utc(3, 16, 18, 0), utc(3, 16, 19, 0))
        .with_rrule("FREQ=DAILY");
    let pool = expand_availability(&[block], &sunday_noon()).unwrap();

    // Mar 16..=21 at 18:00; Mar 22 18:00 is past the horizon end (12:00).
    assert_eq!(pool.intervals().len(), 6);
    assert_eq!(pool.intervals()[0].start, utc(3, 16, 18, 0));
    assert_eq!(pool.intervals()[5].start, utc(3, 21, 18, 0));
}

#[test]
fn rrule_anchored_years_ago_still_reaches_horizon() {
    let start = Utc.with_ymd_and_hms(2010, 1, 1, 18, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2010, 1, 1, 19, 0, 0).unwrap();
    let block = TimeBlock::once("old-evenings", start, end).with_rrule("FREQ=DAILY");
    let pool = expand_availability(&[block], &sunday_noon()).unwrap();

    // Mar 15..=21 at 18:00.
    assert_eq!(pool.intervals().len(), 7);
    assert_eq!(pool.intervals()[0].start, utc(3, 15, 18, 0));
    assert_eq!(pool.intervals()[6].start, utc(3, 21, 18, 0));
}

#[test]
fn oversized_horizon_is_rejected() {
    let options = sunday_noon().with_horizon_days(200_000_000);
    assert!(matches!(
        expand_availability(&[monday_9_to_12()], &options),
        Err(ScheduleError::InvalidOptions(_))
    ));
}

#[test]
fn unparseable_rrule_is_rejected() {
    let block = TimeBlock::once("bad", utc(3, 16, 18, 0), utc(3, 16, 19, 0))
        .with_rrule("FREQ=SOMETIMES");
    let err = expand_availability(&[block], &sunday_noon()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidRule { ref id, .. } if id == "bad"));
}

#[test]
fn block_ending_before_it_starts_is_rejected() {
    let block = TimeBlock::once("backwards", utc(3, 16, 12, 0), utc(3, 16, 9, 0));
    let err = expand_availability(&[block], &sunday_noon()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidTimeBlock { ref id, .. } if id == "backwards"));
}

#[test]
fn zero_length_block_is_rejected() {
    let block = TimeBlock::once("empty", utc(3, 16, 9, 0), utc(3, 16, 9, 0));
    assert!(matches!(
        expand_availability(&[block], &sunday_noon()),
        Err(ScheduleError::InvalidTimeBlock { .. })
    ));
}

#[test]
fn recurring_block_without_day_or_rule_is_rejected() {
    let mut block = TimeBlock::once("vague", utc(3, 16, 9, 0), utc(3, 16, 10, 0));
    block.is_recurring = true;
    assert!(matches!(
        expand_availability(&[block], &sunday_noon()),
        Err(ScheduleError::InvalidTimeBlock { .. })
    ));
}

#[test]
fn blocks_from_two_owners_are_rejected() {
    let blocks = vec![
        monday_9_to_12().with_owner("alice"),
        TimeBlock::once("x", utc(3, 17, 9, 0), utc(3, 17, 10, 0)).with_owner("bob"),
    ];
    assert_eq!(
        expand_availability(&blocks, &sunday_noon()).unwrap_err(),
        ScheduleError::MixedOwners {
            expected: "alice".to_string(),
            found: "bob".to_string(),
        }
    );
}

#[test]
fn day_window_clamps_early_morning_time() {
    let block = TimeBlock::once("early", utc(3, 16, 4, 0), utc(3, 16, 10, 0));
    let options = sunday_noon().with_day_window(DayWindow::new(
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        NaiveTime::MIN,
    ));
    let pool = expand_availability(&[block], &options).unwrap();
    assert_eq!(
        pool.intervals(),
        &[Interval::new(utc(3, 16, 6, 0), utc(3, 16, 10, 0))]
    );
}

#[test]
fn day_window_splits_overnight_block() {
    let block = TimeBlock::once("overnight", utc(3, 16, 20, 0), utc(3, 17, 8, 0));
    let options = sunday_noon().with_day_window(DayWindow::new(
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
    ));
    let pool = expand_availability(&[block], &options).unwrap();
    assert_eq!(
        pool.intervals(),
        &[
            Interval::new(utc(3, 16, 20, 0), utc(3, 16, 22, 0)),
            Interval::new(utc(3, 17, 6, 0), utc(3, 17, 8, 0)),
        ]
    );
}
