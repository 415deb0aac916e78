//! Cadence rule engine: turns an abstract recurrence rule into a concrete,
//! ordered series of future send instants.
//!
//! [`generate`] is a total function — it never fails and performs no I/O.
//! A rule whose anchor date cannot be parsed yields an empty series, and the
//! requested occurrence count is always clamped against a hard cap before any
//! generation loop starts.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Default upper bound on generated occurrences per series.
pub const DEFAULT_HARD_CAP: u32 = 100;

/// Whether a rule describes a one-off send or a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Single,
    Cadence,
}

/// Recurrence pattern families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceKind {
    Weekly,
    Biweekly,
    Monthly,
    EveryOtherMonth,
    Quarterly,
    Custom,
}

impl CadenceKind {
    /// Stable string form, stored on schedule records for audit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::EveryOtherMonth => "every_other_month",
            Self::Quarterly => "quarterly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "every_other_month" => Some(Self::EveryOtherMonth),
            "quarterly" => Some(Self::Quarterly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Step unit for custom cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

/// "Every n days/weeks/months" for [`CadenceKind::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomInterval {
    pub n: u32,
    pub unit: IntervalUnit,
}

impl Default for CustomInterval {
    fn default() -> Self {
        Self {
            n: 1,
            unit: IntervalUnit::Weeks,
        }
    }
}

/// The abstract recurrence rule authored in the scheduler UI.
///
/// `start_date` ("YYYY-MM-DD") and `time` ("HH:MM") stay as strings so the
/// engine can treat malformed input as an empty series instead of erroring.
/// Weekday ordinals use the 0=Sunday .. 6=Saturday convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceRule {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_cadence")]
    pub cadence: CadenceKind,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub weekdays: BTreeSet<u8>,
    #[serde(default = "default_month_day")]
    pub month_day: u32,
    #[serde(default = "default_occurrences")]
    pub occurrences: u32,
    #[serde(default)]
    pub custom_every: CustomInterval,
}

fn default_mode() -> Mode {
    Mode::Single
}

fn default_cadence() -> CadenceKind {
    CadenceKind::Weekly
}

fn default_month_day() -> u32 {
    1
}

fn default_occurrences() -> u32 {
    6
}

impl CadenceRule {
    /// A single-send rule anchored at the given date and time.
    pub fn single(start_date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            mode: Mode::Single,
            cadence: default_cadence(),
            start_date: start_date.into(),
            time: time.into(),
            weekdays: BTreeSet::new(),
            month_day: default_month_day(),
            occurrences: 1,
            custom_every: CustomInterval::default(),
        }
    }

    /// A recurring rule of the given kind anchored at the given date and time.
    pub fn recurring(
        cadence: CadenceKind,
        start_date: impl Into<String>,
        time: impl Into<String>,
        occurrences: u32,
    ) -> Self {
        Self {
            mode: Mode::Cadence,
            cadence,
            start_date: start_date.into(),
            time: time.into(),
            weekdays: BTreeSet::new(),
            month_day: default_month_day(),
            occurrences,
            custom_every: CustomInterval::default(),
        }
    }
}

/// One concrete occurrence in a generated series.
///
/// `ordinal` is the zero-based position within the series; preview exclusions
/// are keyed by it, never by the date itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedInstance {
    pub date: DateTime<Utc>,
    pub ordinal: usize,
    pub excluded: bool,
}

/// Generate the ordered series of send instants for `rule`.
///
/// Guarantees:
/// - output is non-decreasing in `date`
/// - output length is `<= min(rule.occurrences, hard_cap)`
/// - for the single, weekly, and monthly families the first instant is never
///   earlier than the anchor; a custom month interval keeps the anchor's month
///   at ordinal 0, so a `month_day` below the anchor's day lands earlier in
///   that same month
/// - an unparsable or empty `start_date` yields an empty series
pub fn generate(rule: &CadenceRule, hard_cap: u32) -> Vec<GeneratedInstance> {
    let Some(anchor) = parse_anchor(&rule.start_date, &rule.time) else {
        return Vec::new();
    };

    // Clamp before entering any loop so a hostile occurrence count cannot
    // make generation unbounded.
    let total = rule.occurrences.clamp(1, hard_cap.max(1)) as usize;

    if rule.mode == Mode::Single {
        return with_ordinals(vec![anchor]);
    }

    let dates = match rule.cadence {
        CadenceKind::Weekly => weekly_series(anchor, 1, &rule.weekdays, total),
        CadenceKind::Biweekly => weekly_series(anchor, 2, &rule.weekdays, total),
        CadenceKind::Monthly => monthly_series(anchor, 1, rule.month_day, total),
        CadenceKind::EveryOtherMonth => monthly_series(anchor, 2, rule.month_day, total),
        CadenceKind::Quarterly => monthly_series(anchor, 3, rule.month_day, total),
        CadenceKind::Custom => custom_series(anchor, rule.custom_every, rule.month_day, total),
    };

    with_ordinals(dates)
}

fn with_ordinals(dates: Vec<DateTime<Utc>>) -> Vec<GeneratedInstance> {
    dates
        .into_iter()
        .enumerate()
        .map(|(ordinal, date)| GeneratedInstance {
            date,
            ordinal,
            excluded: false,
        })
        .collect()
}

/// Combine the rule's date and time strings into a UTC instant.
///
/// The date must parse; a malformed time falls back to midnight rather than
/// invalidating the whole rule.
fn parse_anchor(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time).and_utc())
}

/// Weekly/biweekly: walk cycles of `step_weeks` from the anchor, and within
/// each cycle align forward to every selected weekday. Candidates earlier
/// than the anchor are discarded, so the series never starts in the past.
fn weekly_series(
    anchor: DateTime<Utc>,
    step_weeks: u32,
    weekdays: &BTreeSet<u8>,
    total: usize,
) -> Vec<DateTime<Utc>> {
    let days: Vec<u8> = weekdays.iter().copied().filter(|d| *d < 7).collect();
    let days = if days.is_empty() {
        vec![anchor.weekday().num_days_from_sunday() as u8]
    } else {
        days
    };

    let mut dates = Vec::with_capacity(total);
    let mut cycle: u32 = 0;
    while dates.len() < total {
        let cycle_start = anchor + Duration::weeks((cycle * step_weeks) as i64);
        for &weekday in &days {
            if dates.len() >= total {
                break;
            }
            let aligned = align_to_weekday(cycle_start, weekday);
            if aligned >= anchor {
                dates.push(aligned);
            }
        }
        cycle += 1;
    }
    // Multiple weekdays per cycle can be produced out of chronological order.
    dates.sort();
    dates
}

/// Monthly family: align the anchor to `month_day` (clamped to the month's
/// length, moving forward if the aligned day already passed), then step in
/// whole months, reclamping the day each time.
fn monthly_series(
    anchor: DateTime<Utc>,
    step_months: u32,
    month_day: u32,
    total: usize,
) -> Vec<DateTime<Utc>> {
    let first = align_to_month_day(anchor, month_day);
    (0..total)
        .map(|i| add_months_clamped(first, i as u32 * step_months, month_day))
        .collect()
}

fn custom_series(
    anchor: DateTime<Utc>,
    every: CustomInterval,
    month_day: u32,
    total: usize,
) -> Vec<DateTime<Utc>> {
    let n = every.n.max(1);
    match every.unit {
        IntervalUnit::Days => (0..total)
            .map(|i| anchor + Duration::days((i as u32 * n) as i64))
            .collect(),
        IntervalUnit::Weeks => (0..total)
            .map(|i| anchor + Duration::weeks((i as u32 * n) as i64))
            .collect(),
        IntervalUnit::Months => (0..total)
            .map(|i| add_months_clamped(anchor, i as u32 * n, month_day))
            .collect(),
    }
}

/// Number of days in the given month (1-12).
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Clamp a target day-of-month into `[1, days_in_month]`.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.clamp(1, days_in_month(year, month))
}

/// Move `instant` forward (0-6 days) to the next occurrence of `weekday`
/// (0=Sunday). Never moves backward.
fn align_to_weekday(instant: DateTime<Utc>, weekday: u8) -> DateTime<Utc> {
    let current = instant.weekday().num_days_from_sunday() as i64;
    let diff = (weekday as i64 - current).rem_euclid(7);
    instant + Duration::days(diff)
}

/// Set the day-of-month to `month_day` (clamped). If that instant lies before
/// the anchor, advance one month and reclamp.
fn align_to_month_day(anchor: DateTime<Utc>, month_day: u32) -> DateTime<Utc> {
    let day = clamp_day(anchor.year(), anchor.month(), month_day);
    let aligned = anchor.with_day(day).unwrap_or(anchor);
    if aligned < anchor {
        add_months_clamped(aligned, 1, month_day)
    } else {
        aligned
    }
}

/// Add `months` whole months to `instant`, targeting `month_day` and clamping
/// to the destination month's last valid day (day 31 in a 30-day month yields
/// day 30; day 31 in February yields day 28/29).
fn add_months_clamped(instant: DateTime<Utc>, months: u32, month_day: u32) -> DateTime<Utc> {
    let zero_based = instant.month0() + months;
    let year = instant.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = clamp_day(year, month, month_day);
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.and_time(instant.time()).and_utc())
        .unwrap_or(instant)
}
