//! Simulation engine that steps every inverter and aggregates the results.

use tracing::{debug, info};

use super::calendar::ReferenceYear;
use super::context::InverterContext;
use super::types::{InverterStep, OutputRecord};
use crate::error::SimError;

/// Simulation engine owning all inverter contexts of one scenario.
///
/// Intervals must be processed once each, in ascending order starting at 0,
/// since every battery carries its SOC forward.
#[derive(Debug, Clone)]
pub struct Engine {
    contexts: Vec<InverterContext>,
    year: ReferenceYear,
    next: usize,
    steps: Vec<InverterStep>,
}

impl Engine {
    /// Creates a new simulation engine.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoInverters`] when `contexts` is empty.
    pub fn new(contexts: Vec<InverterContext>) -> Result<Self, SimError> {
        if contexts.is_empty() {
            return Err(SimError::NoInverters);
        }
        debug!(inverters = contexts.len(), "engine ready");
        Ok(Self {
            steps: Vec::with_capacity(contexts.len()),
            contexts,
            year: ReferenceYear::new(),
            next: 0,
        })
    }

    /// Executes interval `index` on every inverter and returns the summed record.
    ///
    /// # Arguments
    ///
    /// * `index` - Interval index; must equal [`Engine::next_interval`]
    ///
    /// # Errors
    ///
    /// * [`SimError::OutOfOrder`] for a skipped or repeated index
    /// * [`SimError::InsufficientInput`] when an inverter has no sample for `index`;
    ///   no inverter is stepped in that case
    pub fn process_interval(&mut self, index: usize) -> Result<OutputRecord, SimError> {
        if index != self.next {
            return Err(SimError::OutOfOrder {
                expected: self.next,
                got: index,
            });
        }
        self.preflight(index + 1)?;
        self.steps.clear();
        for context in &mut self.contexts {
            self.steps.push(context.step(index)?);
        }
        self.next += 1;
        Ok(OutputRecord::aggregate(self.year.slot(index), &self.steps))
    }

    /// Fails unless every inverter has input for `interval_count` intervals.
    pub fn preflight(&self, interval_count: usize) -> Result<(), SimError> {
        self.contexts
            .iter()
            .try_for_each(|c| c.ensure_covers(interval_count))
    }

    /// Executes intervals `0..interval_count` and returns every record.
    ///
    /// Input lengths are checked before the first interval is processed.
    pub fn run(&mut self, interval_count: usize) -> Result<Vec<OutputRecord>, SimError> {
        self.run_while(interval_count, || true)
    }

    /// Like [`Engine::run`], but asks `proceed` before each interval and stops
    /// early once it returns `false`.
    ///
    /// A stopped run returns fewer than `interval_count` records.
    pub fn run_while(
        &mut self,
        interval_count: usize,
        mut proceed: impl FnMut() -> bool,
    ) -> Result<Vec<OutputRecord>, SimError> {
        self.preflight(interval_count)?;
        info!(intervals = interval_count, inverters = self.contexts.len(), "run started");
        let mut records = Vec::with_capacity(interval_count);
        for index in 0..interval_count {
            if !proceed() {
                break;
            }
            records.push(self.process_interval(index)?);
        }
        info!(intervals = records.len(), "run finished");
        Ok(records)
    }

    /// Index the next call to [`Engine::process_interval`] must use.
    pub fn next_interval(&self) -> usize {
        self.next
    }

    pub fn contexts(&self) -> &[InverterContext] {
        &self.contexts
    }

    /// Total battery capacity across all inverters (kWh).
    pub fn total_capacity(&self) -> f64 {
        self.contexts.iter().map(|c| c.battery().capacity()).sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::devices::battery::{Battery, BatteryConfig, ChargeCurve, InitialSoc};
    use crate::devices::inverter::InverterConfig;
    use crate::sim::types::{Diversion, IntervalSample};

    fn samples(n: usize, load_kwh: f64, pv_kwh: f64) -> Vec<IntervalSample> {
        let year = ReferenceYear::new();
        (0..n)
            .map(|i| IntervalSample {
                slot: year.slot(i),
                load_kwh,
                pv_kwh,
                diversion: Diversion::default(),
            })
            .collect()
    }

    fn battery(capacity_kwh: f64) -> Battery {
        Battery::Installed(BatteryConfig {
            capacity_kwh,
            max_charge_kwh: 0.5,
            max_discharge_kwh: 0.5,
            discharge_stop_pct: 10.0,
            storage_loss_pct: 0.0,
            charge_curve: ChargeCurve {
                low: 100.0,
                mid: 100.0,
                high: 100.0,
                full: 0.0,
            },
        })
    }

    fn context(name: &str, battery: Battery, soc: f64, data: Vec<IntervalSample>) -> InverterContext {
        InverterContext::builder()
            .name(name)
            .limits(InverterConfig::IDEAL)
            .battery(battery)
            .initial_soc(InitialSoc::Kwh(soc))
            .samples(data)
            .build()
            .unwrap()
    }

    #[test]
    fn empty_scenario_is_rejected() {
        assert!(matches!(Engine::new(Vec::new()), Err(SimError::NoInverters)));
    }

    #[test]
    fn records_sum_across_inverters() {
        let mut engine = Engine::new(vec![
            context("a", battery(10.0), 5.0, samples(4, 1.0, 0.0)),
            context("b", battery(4.0), 2.0, samples(4, 0.2, 0.0)),
            context("c", Battery::Absent, 0.0, samples(4, 0.3, 0.0)),
        ])
        .unwrap();
        let record = engine.process_interval(0).unwrap();
        let t = record.totals;
        assert_abs_diff_eq!(t.load_kwh, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.battery_to_load_kwh, 0.5 + 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(t.buy_kwh, 0.5 + 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(t.soc_kwh, 4.5 + 1.8, epsilon = 1e-12);
        assert_eq!(record.slot.index, 0);
    }

    #[test]
    fn batteries_are_not_pooled() {
        // Inverter "a" has a full battery and no load; "b" has load and an empty one.
        let mut engine = Engine::new(vec![
            context("a", battery(10.0), 10.0, samples(1, 0.0, 0.0)),
            context("b", battery(10.0), 1.0, samples(1, 0.4, 0.0)),
        ])
        .unwrap();
        let t = engine.process_interval(0).unwrap().totals;
        assert_eq!(t.battery_to_load_kwh, 0.0);
        assert_abs_diff_eq!(t.buy_kwh, 0.4);
        assert_abs_diff_eq!(t.soc_kwh, 11.0);
    }

    #[test]
    fn intervals_must_be_ascending() {
        let mut engine = Engine::new(vec![context("a", battery(10.0), 5.0, samples(3, 0.1, 0.0))]).unwrap();
        assert!(matches!(
            engine.process_interval(1),
            Err(SimError::OutOfOrder { expected: 0, got: 1 })
        ));
        engine.process_interval(0).unwrap();
        assert!(matches!(
            engine.process_interval(0),
            Err(SimError::OutOfOrder { expected: 1, got: 0 })
        ));
        assert_eq!(engine.next_interval(), 1);
    }

    #[test]
    fn short_input_fails_before_first_interval() {
        let mut engine = Engine::new(vec![
            context("a", battery(10.0), 5.0, samples(10, 0.1, 0.0)),
            context("short", battery(10.0), 5.0, samples(5, 0.1, 0.0)),
        ])
        .unwrap();
        let err = engine.run(10).unwrap_err();
        match err {
            SimError::InsufficientInput {
                inverter,
                interval,
                available,
            } => {
                assert_eq!(inverter, "short");
                assert_eq!(interval, 9);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(engine.next_interval(), 0);
        assert_eq!(engine.contexts()[0].battery().soc(), 5.0);
    }

    #[test]
    fn short_input_leaves_every_inverter_unstepped() {
        let mut engine = Engine::new(vec![
            context("a", battery(10.0), 5.0, samples(3, 0.5, 0.0)),
            context("b", battery(10.0), 5.0, samples(1, 0.5, 0.0)),
        ])
        .unwrap();
        engine.process_interval(0).unwrap();
        let soc = engine.contexts()[0].battery().soc();

        match engine.process_interval(1).unwrap_err() {
            SimError::InsufficientInput {
                inverter,
                interval,
                available,
            } => {
                assert_eq!(inverter, "b");
                assert_eq!(interval, 1);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(engine.contexts()[0].battery().soc(), soc);
        assert_eq!(engine.next_interval(), 1);
    }

    #[test]
    fn run_while_stops_when_asked() {
        let mut engine = Engine::new(vec![context("a", battery(10.0), 5.0, samples(6, 0.5, 0.0))]).unwrap();
        let mut budget = 2;
        let records = engine
            .run_while(6, || {
                budget -= 1;
                budget >= 0
            })
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(engine.next_interval(), 2);
    }

    #[test]
    fn run_carries_soc_forward() {
        let mut engine = Engine::new(vec![context("a", battery(10.0), 5.0, samples(6, 0.5, 0.0))]).unwrap();
        let records = engine.run(6).unwrap();
        assert_eq!(records.len(), 6);
        assert_abs_diff_eq!(records[5].totals.soc_kwh, 2.0, epsilon = 1e-12);
        assert_eq!(engine.total_capacity(), 10.0);
    }

    #[test]
    fn zero_intervals_is_an_empty_run() {
        let mut engine = Engine::new(vec![context("a", Battery::Absent, 0.0, Vec::new())]).unwrap();
        assert!(engine.run(0).unwrap().is_empty());
    }
}
