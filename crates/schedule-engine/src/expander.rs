//! Availability expansion -- turns time-block definitions into concrete free
//! intervals over the scheduling horizon.
//!
//! Recurring blocks are expanded through the `rrule` crate with a
//! `DTSTART;TZID=` anchor in the configured zone, so wall-clock templates keep
//! their local time across DST transitions. A weekday-only block becomes
//! `FREQ=WEEKLY;BYDAY=<day>`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::interval::{AvailabilityPool, Interval};
use crate::model::TimeBlock;
use crate::options::{DayWindow, ScheduleOptions};

/// Upper bound on instances pulled from a single rule. Only instances that
/// can overlap the horizon count toward it, however old the rule's DTSTART.
const MAX_INSTANCES: u16 = 4096;

/// Expand `blocks` into a sorted, non-overlapping pool covering the horizon
/// described by `options`.
///
/// # Errors
/// Returns `ScheduleError::InvalidTimeBlock` for a block whose end is not after
/// its start, `ScheduleError::InvalidRule` for an unparseable RRULE,
/// `ScheduleError::MixedOwners` when blocks belong to different owners, and
/// the errors of an invalid `options` (see [`ScheduleOptions`]).
pub fn expand_availability(
    blocks: &[TimeBlock],
    options: &ScheduleOptions,
) -> Result<AvailabilityPool> {
    options.validate()?;
    validate_blocks(blocks)?;
    let tz = options.tz()?;
    let horizon = options.horizon();

    let mut instances = Vec::new();
    for block in blocks {
        let expanded = expand_block(block, tz, horizon)?;
        debug!(block_id = %block.id, instances = expanded.len(), "expanded time block");
        instances.extend(expanded);
    }

    if let Some(window) = options.day_window {
        instances = instances
            .into_iter()
            .flat_map(|iv| clamp_to_day_window(iv, window, tz))
            .collect();
    }

    Ok(AvailabilityPool::new(instances))
}

/// Reject blocks that cannot describe free time.
pub fn validate_blocks(blocks: &[TimeBlock]) -> Result<()> {
    let mut owner: Option<&str> = None;
    for block in blocks {
        if block.end <= block.start {
            return Err(ScheduleError::InvalidTimeBlock {
                id: block.id.clone(),
                reason: format!("end {} is not after start {}", block.end, block.start),
            });
        }
        if is_recurring(block) && block.day_of_week.is_none() && block.rrule.is_none() {
            return Err(ScheduleError::InvalidTimeBlock {
                id: block.id.clone(),
                reason: "recurring block needs a dayOfWeek or an rrule".to_string(),
            });
        }
        if let Some(rule) = &block.rrule {
            if rule.trim().is_empty() {
                return Err(ScheduleError::InvalidRule {
                    id: block.id.clone(),
                    reason: "empty RRULE string".to_string(),
                });
            }
        }
        match owner {
            None => owner = Some(&block.owner),
            Some(expected) if expected != block.owner => {
                return Err(ScheduleError::MixedOwners {
                    expected: expected.to_string(),
                    found: block.owner.clone(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn is_recurring(block: &TimeBlock) -> bool {
    block.is_recurring || block.rrule.is_some()
}

fn expand_block(block: &TimeBlock, tz: Tz, horizon: Interval) -> Result<Vec<Interval>> {
    if !is_recurring(block) {
        return Ok(Interval::new(block.start, block.end)
            .intersect(&horizon)
            .into_iter()
            .collect());
    }

    let duration = block.end - block.start;
    let template_start = block.start.with_timezone(&tz).naive_local();

    let (rule, dtstart) = match (&block.rrule, block.day_of_week) {
        (Some(rule), _) => (rule.clone(), template_start),
        (None, Some(day)) => {
            // Anchor one day before the horizon so an instance already in
            // progress at `now` is still produced (and clipped).
            let from = horizon.start.with_timezone(&tz).date_naive() - Duration::days(1);
            let date = next_weekday(from, day);
            (
                format!("FREQ=WEEKLY;BYDAY={}", byday(day)),
                date.and_time(template_start.time()),
            )
        }
        (None, None) => return Ok(Vec::new()),
    };

    let earliest = horizon.start.checked_sub_signed(duration).unwrap_or(horizon.start);
    let window = Interval::new(earliest, horizon.end);
    let starts = expand_rule(&block.id, &rule, dtstart, tz, window)?;
    Ok(starts
        .into_iter()
        .filter_map(|start| Interval::new(start, start + duration).intersect(&horizon))
        .collect())
}

/// Expand an RRULE body anchored at a local `dtstart` into the UTC instance
/// starts that fall inside `window` (both ends inclusive).
fn expand_rule(
    block_id: &str,
    rule: &str,
    dtstart: NaiveDateTime,
    tz: Tz,
    window: Interval,
) -> Result<Vec<DateTime<Utc>>> {
    let mut rule_str = rule.trim().trim_start_matches("RRULE:").to_string();
    let upper = rule_str.to_uppercase();

    // The rrule crate requires UNTIL and DTSTART to share a timezone: UTC
    // needs the trailing "Z", other zones take bare local time.
    if !upper.contains("UNTIL=") && !upper.contains("COUNT=") {
        let until = window.end.with_timezone(&tz).naive_local();
        let mut until_ical = until.format("%Y%m%dT%H%M%S").to_string();
        if tz == Tz::UTC {
            until_ical.push('Z');
        }
        rule_str = format!("{};UNTIL={}", rule_str, until_ical);
    }

    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        tz.name(),
        dtstart.format("%Y%m%dT%H%M%S"),
        rule_str
    );

    let rrule_set: RRuleSet = rrule_text.parse().map_err(|e| ScheduleError::InvalidRule {
        id: block_id.to_string(),
        reason: format!("{}", e),
    })?;

    // `all` counts from DTSTART unless bounded, so a rule anchored years ago
    // would exhaust the cap before reaching the horizon.
    Ok(rrule_set
        .after(window.start.with_timezone(&rrule::Tz::UTC))
        .before(window.end.with_timezone(&rrule::Tz::UTC))
        .all(MAX_INSTANCES)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

fn next_weekday(mut date: NaiveDate, day: Weekday) -> NaiveDate {
    use chrono::Datelike;
    while date.weekday() != day {
        date = date.succ_opt().unwrap_or(date);
    }
    date
}

fn byday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Clip an interval to the daily window on every local date it touches.
fn clamp_to_day_window(iv: Interval, window: DayWindow, tz: Tz) -> Vec<Interval> {
    let first = iv.start.with_timezone(&tz).date_naive() - Duration::days(1);
    let last = iv.end.with_timezone(&tz).date_naive();

    let mut pieces = Vec::new();
    let mut date = first;
    while date <= last {
        let end_local = if window.ends_at_midnight() {
            (date + Duration::days(1)).and_time(window.end)
        } else {
            date.and_time(window.end)
        };
        if let (Some(start), Some(end)) = (
            local_to_utc(tz, date.and_time(window.start)),
            local_to_utc(tz, end_local),
        ) {
            if let Some(piece) = iv.intersect(&Interval::new(start, end)) {
                pieces.push(piece);
            }
        }
        date += Duration::days(1);
    }
    pieces
}

/// Resolve a local wall-clock time, taking the earlier instant when it is
/// ambiguous and the first valid time after a DST gap.
fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_weekday_is_inclusive() {
        let mon = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        assert_eq!(next_weekday(mon, Weekday::Mon), mon);
        assert_eq!(
            next_weekday(mon, Weekday::Sun),
            NaiveDate::from_ymd_opt(2026, 3, 22).unwrap()
        );
    }

    #[test]
    fn local_to_utc_skips_spring_forward_gap() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 2026-03-08 02:30 does not exist in New York.
        let gap = NaiveDate::from_ymd_opt(2026, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = local_to_utc(tz, gap).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 3, 8, 7, 30, 0).unwrap());
    }
}
