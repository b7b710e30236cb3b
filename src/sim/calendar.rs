//! Fixed, leap-free reference calendar indexing every simulated interval.

use chrono::{Datelike, NaiveDate};

/// Calendar year used to tag intervals. Non-leap, starts on a Monday.
pub const REFERENCE_YEAR: i32 = 2001;
/// Length of one simulation interval in minutes.
pub const INTERVAL_MINUTES: u16 = 5;
/// Length of one simulation interval in hours.
pub const INTERVAL_HOURS: f64 = INTERVAL_MINUTES as f64 / 60.0;
pub const INTERVALS_PER_HOUR: usize = 60 / INTERVAL_MINUTES as usize;
pub const INTERVALS_PER_DAY: usize = 24 * INTERVALS_PER_HOUR;
pub const DAYS_PER_YEAR: usize = 365;
/// 105,120 five-minute intervals.
pub const INTERVALS_PER_YEAR: usize = DAYS_PER_YEAR * INTERVALS_PER_DAY;

/// Calendar identity of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSlot {
    /// Interval index from the start of the run.
    pub index: usize,
    /// Day of the reference year, `1..=365`.
    pub day_of_year: u16,
    /// Minutes since midnight at the start of the interval.
    pub minute_of_day: u16,
    /// Month, `1..=12`.
    pub month: u8,
    /// Day of week, `0` = Sunday through `6` = Saturday.
    pub weekday: u8,
    pub date: NaiveDate,
}

impl IntervalSlot {
    /// Hour of day, `0..=23`.
    pub fn hour(&self) -> u8 {
        (self.minute_of_day / 60) as u8
    }

    /// Time of day formatted as `HH:MM`.
    pub fn time_label(&self) -> String {
        format!("{:02}:{:02}", self.minute_of_day / 60, self.minute_of_day % 60)
    }
}

/// The 365 dates of the reference year, used to resolve month and weekday tags.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::sim::calendar::{INTERVALS_PER_DAY, ReferenceYear};
///
/// let year = ReferenceYear::new();
/// let slot = year.slot(INTERVALS_PER_DAY + 13);
/// assert_eq!(slot.day_of_year, 2);
/// assert_eq!(slot.minute_of_day, 65);
/// assert_eq!(slot.weekday, 2); // 2001-01-02 was a Tuesday
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceYear {
    days: Vec<NaiveDate>,
}

impl Default for ReferenceYear {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceYear {
    pub fn new() -> Self {
        let days = NaiveDate::from_yo_opt(REFERENCE_YEAR, 1)
            .into_iter()
            .flat_map(|first| first.iter_days())
            .take(DAYS_PER_YEAR)
            .collect();
        Self { days }
    }

    /// Resolves the calendar tags of interval `index`. Indices past one year wrap.
    pub fn slot(&self, index: usize) -> IntervalSlot {
        let in_year = index % INTERVALS_PER_YEAR;
        let day = in_year / INTERVALS_PER_DAY;
        let date = self.days[day];
        IntervalSlot {
            index,
            day_of_year: (day + 1) as u16,
            minute_of_day: ((in_year % INTERVALS_PER_DAY) as u16) * INTERVAL_MINUTES,
            month: date.month() as u8,
            weekday: date.weekday().num_days_from_sunday() as u8,
            date,
        }
    }

    /// Month and weekday of each day, in order.
    pub fn day_tags(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.days
            .iter()
            .map(|d| (d.month() as u8, d.weekday().num_days_from_sunday() as u8))
    }
}

/// Number of intervals covered by `days` simulated days.
pub fn intervals_for_days(days: usize) -> usize {
    days * INTERVALS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_has_expected_interval_count() {
        assert_eq!(INTERVALS_PER_DAY, 288);
        assert_eq!(INTERVALS_PER_YEAR, 105_120);
        assert_eq!(ReferenceYear::new().days.len(), 365);
    }

    #[test]
    fn first_slot_is_monday_midnight() {
        let slot = ReferenceYear::new().slot(0);
        assert_eq!(slot.day_of_year, 1);
        assert_eq!(slot.minute_of_day, 0);
        assert_eq!(slot.month, 1);
        assert_eq!(slot.weekday, 1);
        assert_eq!(slot.time_label(), "00:00");
    }

    #[test]
    fn last_slot_is_new_years_eve() {
        let slot = ReferenceYear::new().slot(INTERVALS_PER_YEAR - 1);
        assert_eq!(slot.day_of_year, 365);
        assert_eq!(slot.minute_of_day, 23 * 60 + 55);
        assert_eq!(slot.month, 12);
        assert_eq!(slot.hour(), 23);
        assert_eq!(slot.date.to_string(), "2001-12-31");
    }

    #[test]
    fn indices_past_one_year_wrap() {
        let year = ReferenceYear::new();
        let wrapped = year.slot(INTERVALS_PER_YEAR + 5);
        assert_eq!(wrapped.index, INTERVALS_PER_YEAR + 5);
        assert_eq!(wrapped.day_of_year, 1);
        assert_eq!(wrapped.minute_of_day, 25);
    }

    #[test]
    fn march_first_is_day_sixty() {
        let year = ReferenceYear::new();
        let slot = year.slot(59 * INTERVALS_PER_DAY);
        assert_eq!(slot.month, 3);
        assert_eq!(slot.date.to_string(), "2001-03-01");
    }
}
