//! Scenario runner: builds inverter contexts from a configuration and drives
//! the engine across all intervals.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{info, warn};

use crate::config::{InverterSpec, ProfileSource, ScenarioConfig};
use crate::devices::battery::Battery;
use crate::error::SimError;
use crate::io::import::load_samples;
use crate::io::synthetic::SyntheticProfile;
use crate::sim::calendar::ReferenceYear;
use crate::sim::context::InverterContext;
use crate::sim::engine::Engine;
use crate::sim::kpi::Summary;
use crate::sim::types::{IntervalSample, OutputRecord};

/// Shared flag asking running scenarios to stop between intervals.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag, e.g. for registering signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// What a cancelled run returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialPolicy {
    /// Fail with [`SimError::Cancelled`].
    #[default]
    Discard,
    /// Return the records produced so far.
    Keep,
}

/// Output of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub records: Vec<OutputRecord>,
    pub summary: Summary,
    /// `true` when the run stopped early and `records` is truncated.
    pub cancelled: bool,
}

/// Materialises the input samples of one inverter.
fn load_inputs(
    spec: &InverterSpec,
    year: &ReferenceYear,
    interval_count: usize,
    seed: u64,
) -> Result<Vec<IntervalSample>, SimError> {
    match &spec.profile {
        ProfileSource::Csv {
            path,
            source_minutes,
        } => load_samples(path, *source_minutes),
        ProfileSource::Synthetic {
            load,
            solar,
            seed_offset,
        } => {
            let profile = SyntheticProfile {
                load: *load,
                solar: *solar,
            };
            Ok(profile.generate(year, interval_count, seed.wrapping_add(*seed_offset)))
        }
    }
}

/// Validates `config`, loads every input sequence and builds the engine.
///
/// # Errors
///
/// Returns [`SimError::Config`] with every validation problem, or the first
/// I/O or data error met while loading inputs.
pub fn build_engine(config: &ScenarioConfig) -> Result<Engine, SimError> {
    SimError::check(config.validate())?;
    let year = ReferenceYear::new();
    let interval_count = config.interval_count();

    let contexts = config
        .inverter
        .iter()
        .map(|spec| {
            let samples = load_inputs(spec, &year, interval_count, config.simulation.seed)?;
            InverterContext::builder()
                .name(spec.name.as_str())
                .limits(spec.limits)
                .battery(Battery::from(spec.battery))
                .initial_soc(spec.initial_soc)
                .load_shift(spec.load_shift.clone())
                .forced_discharge(spec.forced_discharge.clone())
                .samples(samples)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Engine::new(contexts)
}

/// Drives `engine` over `0..interval_count`, checking `cancel` between intervals.
///
/// Returns the records and whether the run was cut short.
///
/// # Errors
///
/// Fails on insufficient input before the first interval, and with
/// [`SimError::Cancelled`] on cancellation under [`PartialPolicy::Discard`].
pub fn drive(
    engine: &mut Engine,
    interval_count: usize,
    cancel: &CancelToken,
    policy: PartialPolicy,
) -> Result<(Vec<OutputRecord>, bool), SimError> {
    let records = engine.run_while(interval_count, || !cancel.is_cancelled())?;
    if records.len() == interval_count {
        return Ok((records, false));
    }
    warn!(completed = records.len(), ?policy, "run cancelled");
    match policy {
        PartialPolicy::Discard => Err(SimError::Cancelled {
            completed: records.len(),
        }),
        PartialPolicy::Keep => Ok((records, true)),
    }
}

/// Runs one scenario from configuration to summary.
pub fn run_scenario(
    config: &ScenarioConfig,
    cancel: &CancelToken,
    policy: PartialPolicy,
) -> Result<ScenarioResult, SimError> {
    let name = config.simulation.name.clone();
    let interval_count = config.interval_count();
    let mut engine = build_engine(config)?;
    info!(
        scenario = %name,
        intervals = interval_count,
        inverters = engine.contexts().len(),
        "running scenario"
    );

    let (records, cancelled) = drive(&mut engine, interval_count, cancel, policy)?;
    let summary = Summary::from_records(&records, engine.total_capacity());
    info!(
        scenario = %name,
        intervals = records.len(),
        buy_kwh = summary.totals.buy_kwh,
        feed_kwh = summary.totals.feed_kwh,
        "scenario finished"
    );
    Ok(ScenarioResult {
        name,
        records,
        summary,
        cancelled,
    })
}

/// Runs independent scenarios in parallel, one worker thread each.
///
/// Results are returned in the order of `configs`.
pub fn run_scenarios(
    configs: &[ScenarioConfig],
    cancel: &CancelToken,
    policy: PartialPolicy,
) -> Vec<Result<ScenarioResult, SimError>> {
    thread::scope(|s| {
        let handles: Vec<_> = configs
            .iter()
            .map(|config| s.spawn(move || run_scenario(config, cancel, policy)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
