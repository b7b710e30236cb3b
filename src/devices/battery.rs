use serde::Deserialize;

use super::charge_model::max_charge_rate;
use crate::error::{ConfigError, SocViolation};

/// Charge acceptance per SOC bracket, as percentages of the rated charge energy.
///
/// See [`ChargeBracket`](super::charge_model::ChargeBracket) for the exact bracket
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargeCurve {
    /// Below 12% SOC.
    pub low: f64,
    /// From 12% up to and including 90% SOC.
    pub mid: f64,
    /// Above 90% and below 100% SOC.
    pub high: f64,
    /// At 100% SOC, conventionally `0.0`.
    pub full: f64,
}

impl ChargeCurve {
    pub const ZERO: Self = Self {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
        full: 0.0,
    };
}

/// Static battery parameters. All energies are kWh, rates are kWh per interval.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable energy capacity.
    pub capacity_kwh: f64,
    /// Rated charge energy per interval, before the charge curve is applied.
    pub max_charge_kwh: f64,
    /// Maximum energy delivered per interval.
    pub max_discharge_kwh: f64,
    /// SOC percentage below which the battery must not discharge.
    pub discharge_stop_pct: f64,
    /// Overhead withdrawn on top of the energy delivered to the load, in percent.
    pub storage_loss_pct: f64,
    pub charge_curve: ChargeCurve,
}

impl BatteryConfig {
    /// Parameters of the "no battery" variant: nothing can be stored.
    pub const NONE: Self = Self {
        capacity_kwh: 0.0,
        max_charge_kwh: 0.0,
        max_discharge_kwh: 0.0,
        discharge_stop_pct: 0.0,
        storage_loss_pct: 0.0,
        charge_curve: ChargeCurve::ZERO,
    };

    /// Validates all fields, reporting errors under the dotted path `prefix`.
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(format!("{prefix}.{field}"), message));
            }
        };

        check(
            self.capacity_kwh.is_finite() && self.capacity_kwh > 0.0,
            "capacity_kwh",
            "must be > 0",
        );
        check(
            self.max_charge_kwh.is_finite() && self.max_charge_kwh >= 0.0,
            "max_charge_kwh",
            "must be >= 0",
        );
        check(
            self.max_discharge_kwh.is_finite() && self.max_discharge_kwh >= 0.0,
            "max_discharge_kwh",
            "must be >= 0",
        );
        check(
            (0.0..100.0).contains(&self.discharge_stop_pct),
            "discharge_stop_pct",
            "must be in [0, 100)",
        );
        check(
            self.storage_loss_pct.is_finite() && self.storage_loss_pct >= 0.0,
            "storage_loss_pct",
            "must be >= 0",
        );

        let c = &self.charge_curve;
        for (name, pct) in [("low", c.low), ("mid", c.mid), ("high", c.high), ("full", c.full)] {
            check(
                (0.0..=100.0).contains(&pct),
                &format!("charge_curve.{name}"),
                "must be in [0, 100]",
            );
        }
        check(
            c.low >= c.mid && c.mid >= c.high && c.high >= c.full,
            "charge_curve",
            "must be non-increasing from low to full",
        );

        errors
    }
}

/// A battery slot of an inverter: either installed or absent.
///
/// The absent variant behaves like [`BatteryConfig::NONE`], so callers never
/// branch on battery presence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Battery {
    #[default]
    Absent,
    Installed(BatteryConfig),
}

impl Battery {
    pub fn config(&self) -> &BatteryConfig {
        match self {
            Self::Absent => &BatteryConfig::NONE,
            Self::Installed(config) => config,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed(_))
    }
}

impl From<Option<BatteryConfig>> for Battery {
    fn from(config: Option<BatteryConfig>) -> Self {
        config.map_or(Self::Absent, Self::Installed)
    }
}

/// How the SOC is set before the first interval.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSoc {
    /// Start at the discharge-stop floor.
    #[serde(rename = "floor")]
    DischargeFloor,
    /// Start with an explicit stored energy.
    Kwh(f64),
}

/// Discharge rate cap and SOC floor imposed by a forced-discharge window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DischargeLimit {
    pub stop_pct: f64,
    pub rate_kwh: f64,
}

/// Runtime state of one battery: its configuration and current SOC in kWh.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::devices::battery::{Battery, BatteryState, InitialSoc};
///
/// let state = BatteryState::new(Battery::Absent, InitialSoc::DischargeFloor).unwrap();
/// assert_eq!(state.soc(), 0.0);
/// assert_eq!(state.charge_capacity(), 0.0);
/// assert_eq!(state.discharge_capacity(None), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    battery: Battery,
    soc: f64,
}

/// Tolerance for rounding noise in the SOC invariant checks.
const SOC_EPSILON: f64 = 1e-9;

impl BatteryState {
    /// Creates the state, resolving the starting SOC.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` on field `initial_soc` when an explicit starting
    /// SOC lies outside `[0, capacity]`.
    pub fn new(battery: Battery, initial: InitialSoc) -> Result<Self, ConfigError> {
        let mut state = Self { battery, soc: 0.0 };
        state.soc = match initial {
            InitialSoc::DischargeFloor => state.discharge_floor(),
            InitialSoc::Kwh(kwh) => {
                if !(0.0..=state.capacity()).contains(&kwh) {
                    return Err(ConfigError::new(
                        "initial_soc",
                        format!("{kwh} kWh is outside [0, {}]", state.capacity()),
                    ));
                }
                kwh
            }
        };
        Ok(state)
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn config(&self) -> &BatteryConfig {
        self.battery.config()
    }

    /// Current stored energy (kWh).
    pub fn soc(&self) -> f64 {
        self.soc
    }

    pub fn capacity(&self) -> f64 {
        self.config().capacity_kwh
    }

    /// SOC in kWh corresponding to `pct` percent of capacity.
    pub fn level_at(&self, pct: f64) -> f64 {
        pct / 100.0 * self.capacity()
    }

    /// Lowest SOC normal discharge may reach.
    pub fn discharge_floor(&self) -> f64 {
        self.level_at(self.config().discharge_stop_pct)
    }

    /// Withdrawn energy per unit delivered, `1 + storage_loss_pct / 100`.
    pub fn loss_factor(&self) -> f64 {
        1.0 + self.config().storage_loss_pct / 100.0
    }

    /// Energy (kWh) that can still be delivered this interval.
    ///
    /// Capped by `max_discharge_kwh`, or by the rate of `forced` when a
    /// forced-discharge window applies. The SOC headroom above the floor (the
    /// window's own floor when forced) is converted through the storage loss, so
    /// delivering the full amount never takes the SOC below that floor.
    pub fn discharge_capacity(&self, forced: Option<DischargeLimit>) -> f64 {
        let (rate, floor) = match forced {
            Some(limit) => (limit.rate_kwh, self.level_at(limit.stop_pct)),
            None => (self.config().max_discharge_kwh, self.discharge_floor()),
        };
        let headroom = (self.soc - floor).max(0.0);
        rate.min(headroom / self.loss_factor()).max(0.0)
    }

    /// Energy (kWh) the battery can store this interval.
    pub fn charge_capacity(&self) -> f64 {
        let rate = max_charge_rate(self.soc, self.config());
        rate.min(self.capacity() - self.soc).max(0.0)
    }

    /// Energy withdrawn from the SOC to deliver `delivered` kWh, never more than
    /// the headroom above `floor`.
    pub fn withdrawal_for(&self, delivered: f64, floor: f64) -> f64 {
        (delivered * self.loss_factor()).min((self.soc - floor).max(0.0))
    }

    /// Stores `amount` kWh.
    ///
    /// # Errors
    ///
    /// Returns a [`SocViolation`] and leaves the SOC untouched when `amount` is
    /// negative or would lift the SOC above capacity.
    pub fn apply_charge(&mut self, amount: f64) -> Result<(), SocViolation> {
        self.commit("charge", amount, self.soc + amount)
    }

    /// Withdraws `amount` kWh and returns the energy delivered after storage loss.
    ///
    /// # Errors
    ///
    /// Returns a [`SocViolation`] and leaves the SOC untouched when `amount` is
    /// negative or exceeds the stored energy.
    pub fn apply_discharge(&mut self, amount: f64) -> Result<f64, SocViolation> {
        self.commit("discharge", amount, self.soc - amount)?;
        Ok(amount / self.loss_factor())
    }

    /// Accepts `next` as the new SOC if it lies within `[0, capacity]`.
    ///
    /// Only rounding noise within [`SOC_EPSILON`] of a bound is snapped onto it.
    fn commit(
        &mut self,
        operation: &'static str,
        amount: f64,
        next: f64,
    ) -> Result<(), SocViolation> {
        let capacity = self.capacity();
        let snapped = if next > capacity && next <= capacity + SOC_EPSILON {
            capacity
        } else if next < 0.0 && next >= -SOC_EPSILON {
            0.0
        } else {
            next
        };
        if amount.is_nan() || amount < 0.0 || !(0.0..=capacity).contains(&snapped) {
            return Err(SocViolation {
                operation,
                amount,
                soc: self.soc,
                capacity,
            });
        }
        self.soc = snapped;
        Ok(())
    }
}
