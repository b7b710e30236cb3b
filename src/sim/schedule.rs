//! Recurring schedule rules and their expansion into dense per-interval arrays.

use serde::Deserialize;
use tracing::debug;

use crate::devices::battery::DischargeLimit;
use crate::error::ConfigError;
use crate::sim::calendar::{DAYS_PER_YEAR, INTERVALS_PER_DAY, INTERVALS_PER_HOUR, ReferenceYear};

/// Set of months `1..=12`, stored as a bitmask.
///
/// Deserializes from a non-empty list such as `[1, 2, 12]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<u8>")]
pub struct MonthSet(u16);

impl MonthSet {
    pub const ALL: Self = Self(0b1_1111_1111_1110);

    /// Builds a set from a mask where bit `m` selects month `m`.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// # Errors
    ///
    /// Fails on an empty list or a month outside `1..=12`.
    pub fn new(months: &[u8]) -> Result<Self, String> {
        if months.is_empty() {
            return Err("month list must not be empty".to_string());
        }
        let mut bits = 0u16;
        for &m in months {
            if !(1..=12).contains(&m) {
                return Err(format!("month {m} is outside 1..=12"));
            }
            bits |= 1 << m;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, month: u8) -> bool {
        month <= 12 && self.0 & (1 << month) != 0
    }
}

impl TryFrom<Vec<u8>> for MonthSet {
    type Error = String;

    fn try_from(months: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&months)
    }
}

/// Set of weekdays, `0` = Sunday through `6` = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const ALL: Self = Self(0b111_1111);
    /// Monday through Friday.
    pub const WORKDAYS: Self = Self(0b011_1110);

    /// # Errors
    ///
    /// Fails on an empty list or a weekday outside `0..=6`.
    pub fn new(weekdays: &[u8]) -> Result<Self, String> {
        if weekdays.is_empty() {
            return Err("weekday list must not be empty".to_string());
        }
        let mut bits = 0u8;
        for &d in weekdays {
            if d > 6 {
                return Err(format!("weekday {d} is outside 0..=6"));
            }
            bits |= 1 << d;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, weekday: u8) -> bool {
        weekday <= 6 && self.0 & (1 << weekday) != 0
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(weekdays: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&weekdays)
    }
}

/// Recurring time window: an hour range on selected months and weekdays.
///
/// The range starts at `begin_hour` (inclusive) and stops at `end_hour`
/// (exclusive). When `begin_hour > end_hour` the window wraps past midnight,
/// so `22..6` covers 22:00 to 05:59. Month and weekday are those of the day the
/// interval itself falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub begin_hour: u8,
    pub end_hour: u8,
    pub months: MonthSet,
    pub weekdays: WeekdaySet,
}

impl Window {
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.begin_hour > 23 {
            errors.push(ConfigError::new(
                format!("{prefix}.begin_hour"),
                "must be in 0..=23",
            ));
        }
        if !(1..=24).contains(&self.end_hour) {
            errors.push(ConfigError::new(
                format!("{prefix}.end_hour"),
                "must be in 1..=24",
            ));
        }
        if self.begin_hour == self.end_hour {
            errors.push(ConfigError::new(
                format!("{prefix}.end_hour"),
                "must differ from begin_hour",
            ));
        }
        errors
    }

    pub fn covers_hour(&self, hour: u8) -> bool {
        if self.begin_hour < self.end_hour {
            (self.begin_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.begin_hour || hour < self.end_hour
        }
    }

    pub fn matches(&self, hour: u8, month: u8, weekday: u8) -> bool {
        self.covers_hour(hour) && self.months.contains(month) && self.weekdays.contains(weekday)
    }
}

/// A recurring rule that resolves to a value while its window is active.
pub trait ScheduleRule {
    type Value: Copy;

    fn window(&self) -> Window;
    fn value(&self) -> Self::Value;
    fn validate(&self, prefix: &str) -> Vec<ConfigError>;
}

/// Charge the battery from the grid up to `target_soc_pct` inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadShiftRule {
    pub begin_hour: u8,
    pub end_hour: u8,
    pub target_soc_pct: f64,
    pub months: MonthSet,
    pub weekdays: WeekdaySet,
}

impl ScheduleRule for LoadShiftRule {
    type Value = f64;

    fn window(&self) -> Window {
        Window {
            begin_hour: self.begin_hour,
            end_hour: self.end_hour,
            months: self.months,
            weekdays: self.weekdays,
        }
    }

    fn value(&self) -> f64 {
        self.target_soc_pct
    }

    fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = self.window().validate(prefix);
        if !(0.0..=100.0).contains(&self.target_soc_pct) {
            errors.push(ConfigError::new(
                format!("{prefix}.target_soc_pct"),
                "must be in [0, 100]",
            ));
        }
        errors
    }
}

/// Discharge the battery to the grid at `rate_kwh` per interval, down to
/// `stop_pct`, inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForcedDischargeRule {
    pub begin_hour: u8,
    pub end_hour: u8,
    pub stop_pct: f64,
    pub rate_kwh: f64,
    pub months: MonthSet,
    pub weekdays: WeekdaySet,
}

impl ScheduleRule for ForcedDischargeRule {
    type Value = DischargeLimit;

    fn window(&self) -> Window {
        Window {
            begin_hour: self.begin_hour,
            end_hour: self.end_hour,
            months: self.months,
            weekdays: self.weekdays,
        }
    }

    fn value(&self) -> DischargeLimit {
        DischargeLimit {
            stop_pct: self.stop_pct,
            rate_kwh: self.rate_kwh,
        }
    }

    fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = self.window().validate(prefix);
        if !(0.0..=100.0).contains(&self.stop_pct) {
            errors.push(ConfigError::new(
                format!("{prefix}.stop_pct"),
                "must be in [0, 100]",
            ));
        }
        if !self.rate_kwh.is_finite() || self.rate_kwh < 0.0 {
            errors.push(ConfigError::new(
                format!("{prefix}.rate_kwh"),
                "must be a finite value >= 0",
            ));
        }
        errors
    }
}

/// Dense per-interval schedule. `None` means no rule applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded<T> {
    values: Vec<Option<T>>,
}

impl<T: Copy> Expanded<T> {
    /// Resolved value at `index`; `None` past the end.
    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of intervals with a resolved value.
    pub fn active_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn as_slice(&self) -> &[Option<T>] {
        &self.values
    }
}

/// Expands `rules` into one entry per interval for `interval_count` intervals.
///
/// Rules are stably ordered by `begin_hour`; when several match an interval the
/// last one in that order wins. Rules are assumed to be validated.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::sim::calendar::{INTERVALS_PER_DAY, ReferenceYear};
/// use pv_battery_sim::sim::schedule::{LoadShiftRule, MonthSet, WeekdaySet, expand};
///
/// let rule = LoadShiftRule {
///     begin_hour: 0,
///     end_hour: 6,
///     target_soc_pct: 80.0,
///     months: MonthSet::ALL,
///     weekdays: WeekdaySet::ALL,
/// };
/// let schedule = expand(&ReferenceYear::new(), INTERVALS_PER_DAY, &[rule]);
/// assert_eq!(schedule.get(0), Some(80.0));
/// assert_eq!(schedule.get(6 * 12), None);
/// assert_eq!(schedule.active_count(), 72);
/// ```
pub fn expand<R: ScheduleRule>(
    year: &ReferenceYear,
    interval_count: usize,
    rules: &[R],
) -> Expanded<R::Value> {
    let mut order: Vec<usize> = (0..rules.len()).collect();
    order.sort_by_key(|&i| rules[i].window().begin_hour);
    let windows: Vec<(Window, usize)> = order.into_iter().map(|i| (rules[i].window(), i)).collect();

    // One resolved value per (day, hour); intervals copy their hour's entry.
    let hourly: Vec<Option<R::Value>> = year
        .day_tags()
        .flat_map(|(month, weekday)| (0..24u8).map(move |hour| (hour, month, weekday)))
        .map(|(hour, month, weekday)| {
            windows
                .iter()
                .rev()
                .find(|(w, _)| w.matches(hour, month, weekday))
                .map(|&(_, i)| rules[i].value())
        })
        .collect();

    let values: Vec<Option<R::Value>> = (0..interval_count)
        .map(|i| {
            let in_year = i % (DAYS_PER_YEAR * INTERVALS_PER_DAY);
            hourly[in_year / INTERVALS_PER_HOUR]
        })
        .collect();

    let expanded = Expanded { values };
    debug!(
        rules = rules.len(),
        intervals = interval_count,
        active = expanded.active_count(),
        "expanded schedule"
    );
    expanded
}
