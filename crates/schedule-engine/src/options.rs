//! Run configuration for [`compute_schedule`](crate::runner::compute_schedule).

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::interval::Interval;

/// What to do when the pre-flight check finds more work than free time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverloadStrategy {
    /// Shrink treated durations with a [`DurationCompressor`](crate::overload::DurationCompressor),
    /// then place.
    Compress,
    /// Place in priority order and let the tail land in `unscheduled`.
    Prioritize,
}

/// How much time an in-progress task still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemainingPolicy {
    /// `estimatedHours - actualHours` for in-progress tasks.
    #[default]
    SubtractLogged,
    /// Always reschedule the full estimate.
    FullEstimate,
}

/// Daily wall-clock window that free time is clamped to. An `end` of
/// midnight means the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DayWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub(crate) fn ends_at_midnight(&self) -> bool {
        self.end == NaiveTime::MIN
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptions {
    /// Reference time. The horizon starts here and free time before it is
    /// discarded.
    pub now: DateTime<Utc>,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// IANA zone in which recurring block templates are wall-clock times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub overload_strategy: Option<OverloadStrategy>,
    #[serde(default)]
    pub sacrifice_task_id: Option<String>,
    #[serde(default = "default_true")]
    pub detect_overload: bool,
    #[serde(default = "default_true")]
    pub allow_splitting: bool,
    #[serde(default = "default_min_block_fraction")]
    pub default_min_block_fraction: f64,
    #[serde(default)]
    pub remaining_policy: RemainingPolicy,
    #[serde(default)]
    pub day_window: Option<DayWindow>,
}

/// Longest horizon accepted, about one hundred years.
pub const MAX_HORIZON_DAYS: u32 = 36_600;

fn default_horizon_days() -> u32 {
    7
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_block_fraction() -> f64 {
    0.25
}

impl ScheduleOptions {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            horizon_days: default_horizon_days(),
            timezone: default_timezone(),
            overload_strategy: None,
            sacrifice_task_id: None,
            detect_overload: true,
            allow_splitting: true,
            default_min_block_fraction: default_min_block_fraction(),
            remaining_policy: RemainingPolicy::default(),
            day_window: None,
        }
    }

    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_strategy(mut self, strategy: OverloadStrategy) -> Self {
        self.overload_strategy = Some(strategy);
        self
    }

    pub fn with_sacrifice(mut self, task_id: impl Into<String>) -> Self {
        self.sacrifice_task_id = Some(task_id.into());
        self
    }

    pub fn with_day_window(mut self, window: DayWindow) -> Self {
        self.day_window = Some(window);
        self
    }

    pub fn with_remaining_policy(mut self, policy: RemainingPolicy) -> Self {
        self.remaining_policy = policy;
        self
    }

    pub fn without_overload_detection(mut self) -> Self {
        self.detect_overload = false;
        self
    }

    pub fn without_splitting(mut self) -> Self {
        self.allow_splitting = false;
        self
    }

    /// `[now, now + horizon_days)`, saturating at the latest representable
    /// instant.
    pub fn horizon(&self) -> Interval {
        Interval::new(self.now, self.horizon_end().unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    fn horizon_end(&self) -> Option<DateTime<Utc>> {
        self.now
            .checked_add_signed(Duration::days(i64::from(self.horizon_days)))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ScheduleError::InvalidOptions(
                "horizonDays must be at least 1".to_string(),
            ));
        }
        if self.horizon_days > MAX_HORIZON_DAYS || self.horizon_end().is_none() {
            return Err(ScheduleError::InvalidOptions(format!(
                "horizonDays must be at most {}, got {}",
                MAX_HORIZON_DAYS, self.horizon_days
            )));
        }
        if !(self.default_min_block_fraction > 0.0 && self.default_min_block_fraction <= 1.0) {
            return Err(ScheduleError::InvalidOptions(format!(
                "defaultMinBlockFraction must be in (0, 1], got {}",
                self.default_min_block_fraction
            )));
        }
        if let Some(window) = self.day_window {
            if !window.ends_at_midnight() && window.end <= window.start {
                return Err(ScheduleError::InvalidOptions(format!(
                    "dayWindow end {} must be after start {}",
                    window.end, window.start
                )));
            }
        }
        self.tz()?;
        Ok(())
    }
}
