//! State-of-charge dependent charge rate.

use super::battery::BatteryConfig;

/// SOC bracket selecting one entry of a [`ChargeCurve`](super::battery::ChargeCurve).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeBracket {
    /// `pct < 12`
    Low,
    /// `12 <= pct <= 90`
    Mid,
    /// `90 < pct < 100`
    High,
    /// Full battery.
    Full,
}

impl ChargeBracket {
    /// Selects the bracket for `soc` kWh stored in a battery of `capacity` kWh.
    ///
    /// The lower boundary of the middle bracket is inclusive and so is its upper
    /// boundary: 12% and 90% both charge at the middle rate.
    pub fn at(soc: f64, capacity: f64) -> Self {
        if capacity <= 0.0 || soc >= capacity {
            return Self::Full;
        }
        let pct = 100.0 * soc / capacity;
        if pct < 12.0 {
            Self::Low
        } else if pct <= 90.0 {
            Self::Mid
        } else if pct < 100.0 {
            Self::High
        } else {
            Self::Full
        }
    }
}

/// Returns the charge energy (kWh per interval) a battery accepts at `soc`.
///
/// The result is `max_charge_kwh` scaled by the curve percentage of the current
/// bracket. A zero-capacity battery always returns `0.0`.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::devices::battery::{BatteryConfig, ChargeCurve};
/// use pv_battery_sim::devices::charge_model::max_charge_rate;
///
/// let battery = BatteryConfig {
///     capacity_kwh: 10.0,
///     max_charge_kwh: 1.0,
///     max_discharge_kwh: 1.0,
///     discharge_stop_pct: 10.0,
///     storage_loss_pct: 0.0,
///     charge_curve: ChargeCurve { low: 100.0, mid: 100.0, high: 50.0, full: 0.0 },
/// };
/// assert_eq!(max_charge_rate(5.0, &battery), 1.0);
/// assert_eq!(max_charge_rate(9.5, &battery), 0.5);
/// assert_eq!(max_charge_rate(10.0, &battery), 0.0);
/// ```
pub fn max_charge_rate(soc: f64, battery: &BatteryConfig) -> f64 {
    if battery.capacity_kwh <= 0.0 {
        return 0.0;
    }
    let curve = &battery.charge_curve;
    let pct = match ChargeBracket::at(soc, battery.capacity_kwh) {
        ChargeBracket::Low => curve.low,
        ChargeBracket::Mid => curve.mid,
        ChargeBracket::High => curve.high,
        ChargeBracket::Full => curve.full,
    };
    battery.max_charge_kwh * (pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::battery::ChargeCurve;

    fn battery() -> BatteryConfig {
        BatteryConfig {
            capacity_kwh: 10.0,
            max_charge_kwh: 2.0,
            max_discharge_kwh: 2.0,
            discharge_stop_pct: 10.0,
            storage_loss_pct: 0.0,
            charge_curve: ChargeCurve {
                low: 100.0,
                mid: 80.0,
                high: 30.0,
                full: 0.0,
            },
        }
    }

    #[test]
    fn bracket_boundaries() {
        assert_eq!(ChargeBracket::at(0.0, 10.0), ChargeBracket::Low);
        assert_eq!(ChargeBracket::at(1.19, 10.0), ChargeBracket::Low);
        assert_eq!(ChargeBracket::at(12.0, 100.0), ChargeBracket::Mid);
        assert_eq!(ChargeBracket::at(9.0, 10.0), ChargeBracket::Mid);
        assert_eq!(ChargeBracket::at(9.01, 10.0), ChargeBracket::High);
        assert_eq!(ChargeBracket::at(9.99, 10.0), ChargeBracket::High);
        assert_eq!(ChargeBracket::at(10.0, 10.0), ChargeBracket::Full);
    }

    #[test]
    fn twelve_percent_charges_at_middle_rate() {
        // 100 * 12 / 100 is exactly 12.0
        let mut b = battery();
        b.capacity_kwh = 100.0;
        assert_eq!(max_charge_rate(12.0, &b), 1.6);
        assert_eq!(max_charge_rate(11.999, &b), 2.0);
    }

    #[test]
    fn ninety_percent_charges_at_middle_rate() {
        let mut b = battery();
        b.capacity_kwh = 100.0;
        assert_eq!(max_charge_rate(90.0, &b), 1.6);
        assert_eq!(max_charge_rate(90.001, &b), 0.6);
    }

    #[test]
    fn full_battery_accepts_nothing() {
        assert_eq!(max_charge_rate(10.0, &battery()), 0.0);
    }

    #[test]
    fn zero_capacity_returns_zero() {
        assert_eq!(max_charge_rate(0.0, &BatteryConfig::NONE), 0.0);
    }

    #[test]
    fn rate_is_non_increasing_with_soc() {
        let b = battery();
        let mut previous = f64::INFINITY;
        for step in 0..=1000 {
            let soc = f64::from(step) * 0.01;
            let rate = max_charge_rate(soc, &b);
            assert!(rate <= previous, "rate rose at soc={soc}");
            previous = rate;
        }
        assert_eq!(previous, 0.0);
    }
}
