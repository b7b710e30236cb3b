//! Per-inverter state and the interval decision function.

use bon::bon;
use tracing::debug;

use crate::devices::battery::{Battery, BatteryState, DischargeLimit, InitialSoc};
use crate::devices::inverter::{Efficiencies, InverterConfig};
use crate::error::{ConfigError, ConfigErrors, SimError, SocViolation};
use crate::sim::calendar::ReferenceYear;
use crate::sim::schedule::{Expanded, ForcedDischargeRule, LoadShiftRule, ScheduleRule, expand};
use crate::sim::types::{IntervalSample, InverterStep};

/// One inverter+battery pair: its configuration, expanded schedules, input
/// samples and the battery state carried from interval to interval.
#[derive(Debug, Clone)]
pub struct InverterContext {
    name: String,
    limits: InverterConfig,
    efficiencies: Efficiencies,
    battery: BatteryState,
    load_shift: Expanded<f64>,
    forced_discharge: Expanded<DischargeLimit>,
    samples: Vec<IntervalSample>,
}

#[bon]
impl InverterContext {
    /// Validates the configuration and expands both schedules over the
    /// length of `samples`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] listing every invalid field, with paths
    /// prefixed by the inverter name.
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        limits: InverterConfig,
        #[builder(default)] battery: Battery,
        #[builder(default = InitialSoc::DischargeFloor)] initial_soc: InitialSoc,
        #[builder(default)] load_shift: Vec<LoadShiftRule>,
        #[builder(default)] forced_discharge: Vec<ForcedDischargeRule>,
        samples: Vec<IntervalSample>,
    ) -> Result<Self, SimError> {
        let mut errors = limits.validate(&format!("{name}.limits"));
        if let Battery::Installed(config) = &battery {
            errors.extend(config.validate(&format!("{name}.battery")));
        }
        for (i, rule) in load_shift.iter().enumerate() {
            errors.extend(rule.validate(&format!("{name}.load_shift[{i}]")));
        }
        for (i, rule) in forced_discharge.iter().enumerate() {
            errors.extend(rule.validate(&format!("{name}.forced_discharge[{i}]")));
        }
        SimError::check(errors)?;

        let state = BatteryState::new(battery, initial_soc).map_err(|e| {
            SimError::Config(ConfigErrors(vec![ConfigError::new(
                format!("{name}.{}", e.field),
                e.message,
            )]))
        })?;

        let year = ReferenceYear::new();
        let load_shift = expand(&year, samples.len(), &load_shift);
        let forced_discharge = expand(&year, samples.len(), &forced_discharge);
        debug!(
            inverter = %name,
            samples = samples.len(),
            battery = state.battery().is_installed(),
            load_shift_intervals = load_shift.active_count(),
            forced_discharge_intervals = forced_discharge.active_count(),
            "inverter context ready"
        );

        Ok(Self {
            name,
            efficiencies: limits.efficiencies(),
            limits,
            battery: state,
            load_shift,
            forced_discharge,
            samples,
        })
    }
}

impl InverterContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> &InverterConfig {
        &self.limits
    }

    pub fn battery(&self) -> &BatteryState {
        &self.battery
    }

    pub fn samples(&self) -> &[IntervalSample] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Fails unless the input covers `interval_count` intervals.
    pub fn ensure_covers(&self, interval_count: usize) -> Result<(), SimError> {
        if interval_count > 0 && self.samples.len() < interval_count {
            return Err(self.insufficient(interval_count - 1));
        }
        Ok(())
    }

    fn insufficient(&self, interval: usize) -> SimError {
        SimError::InsufficientInput {
            inverter: self.name.clone(),
            interval,
            available: self.samples.len(),
        }
    }

    fn invariant(&self, interval: usize, source: SocViolation) -> SimError {
        SimError::Invariant {
            inverter: self.name.clone(),
            interval,
            source,
        }
    }

    /// Decides the energy flows of interval `index` and advances the battery.
    ///
    /// The battery state is updated once, at the end, from a working copy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InsufficientInput`] when `index` is past the input.
    pub fn step(&mut self, index: usize) -> Result<InverterStep, SimError> {
        let sample = *self
            .samples
            .get(index)
            .ok_or_else(|| self.insufficient(index))?;
        let mut battery = self.battery;
        let eff = self.efficiencies;
        let throughput = self.limits.max_throughput_kwh();
        let export_max = self.limits.export_max_kwh;
        let forced = self.forced_discharge.get(index);

        let mut out = InverterStep {
            load_kwh: sample.load_kwh,
            pv_kwh: sample.pv_kwh,
            diversion: sample.diversion,
            ..InverterStep::default()
        };

        // Storable energy for the whole interval, shared by PV and grid charging.
        let mut charge_budget = battery.charge_capacity();

        let excess = sample.pv_kwh * eff.dc2ac - sample.load_kwh;
        if excess > self.limits.min_excess_kwh {
            let to_battery = excess.min(charge_budget / eff.dc2dc).min(throughput);
            let stored = (to_battery * eff.dc2dc).min(charge_budget);
            battery
                .apply_charge(stored)
                .map_err(|source| self.invariant(index, source))?;
            charge_budget -= stored;
            out.pv_to_charge_kwh = to_battery;
            out.feed_kwh = (excess - to_battery)
                .min(export_max)
                .min(throughput - to_battery)
                .max(0.0);
            out.curtailed_kwh = excess - to_battery - out.feed_kwh;
        } else if excess > 0.0 {
            out.feed_kwh = excess.min(export_max).min(throughput);
            out.curtailed_kwh = excess - out.feed_kwh;
        } else if excess < 0.0 {
            let shortfall = -excess;
            let floor = battery.discharge_floor();
            let limit = forced.map(|f| DischargeLimit {
                stop_pct: battery.config().discharge_stop_pct,
                rate_kwh: f.rate_kwh,
            });
            let delivered = shortfall.min(battery.discharge_capacity(limit));
            if delivered > 0.0 {
                let withdrawn = battery.withdrawal_for(delivered, floor);
                battery
                    .apply_discharge(withdrawn)
                    .map_err(|source| self.invariant(index, source))?;
                out.battery_to_load_kwh = withdrawn;
            }
            out.buy_kwh = shortfall - delivered;
        }

        if let Some(target_pct) = self.load_shift.get(index) {
            let gap = battery.level_at(target_pct) - battery.soc();
            let stored = charge_budget.min(gap).max(0.0);
            if stored > 0.0 {
                battery
                    .apply_charge(stored)
                    .map_err(|source| self.invariant(index, source))?;
                let drawn = stored / eff.ac2dc;
                out.grid_to_battery_kwh = drawn;
                out.buy_kwh += drawn;
            }
        }

        if let Some(rule) = forced {
            // The window's rate caps all discharge in this interval.
            let to_load = out.battery_to_load_kwh / battery.loss_factor();
            let remaining_rate = (rule.rate_kwh - to_load).max(0.0);
            let room = (export_max - out.feed_kwh)
                .min(throughput - out.feed_kwh - out.pv_to_charge_kwh)
                .max(0.0);
            let deliverable = battery.discharge_capacity(Some(DischargeLimit {
                stop_pct: rule.stop_pct,
                rate_kwh: remaining_rate,
            }));
            let delivered = deliverable.min(room);
            if delivered > 0.0 {
                let withdrawn = battery.withdrawal_for(delivered, battery.level_at(rule.stop_pct));
                battery
                    .apply_discharge(withdrawn)
                    .map_err(|source| self.invariant(index, source))?;
                out.battery_to_grid_kwh = delivered;
                out.feed_kwh += delivered;
            }
        }

        debug_assert!(
            [
                out.buy_kwh,
                out.feed_kwh,
                out.battery_to_load_kwh,
                out.pv_to_charge_kwh,
                out.grid_to_battery_kwh,
                out.battery_to_grid_kwh,
            ]
            .iter()
            .all(|v| *v >= 0.0),
            "negative flow at interval {index}: {out:?}"
        );

        self.battery = battery;
        out.soc_kwh = battery.soc();
        Ok(out)
    }
}
