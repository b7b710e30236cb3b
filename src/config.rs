//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::devices::baseload::BaseLoadParams;
use crate::devices::battery::{BatteryConfig, ChargeCurve, InitialSoc};
use crate::devices::inverter::InverterConfig;
use crate::devices::solar::SolarParams;
use crate::error::{ConfigError, ConfigErrors, SimError};
use crate::io::import::validate_source_minutes;
use crate::io::synthetic::SyntheticProfile;
use crate::sim::calendar::{DAYS_PER_YEAR, INTERVAL_MINUTES, intervals_for_days};
use crate::sim::schedule::{ForcedDischargeRule, LoadShiftRule, MonthSet, ScheduleRule, WeekdaySet};

/// Top-level scenario configuration parsed from TOML.
///
/// Load from TOML with [`ScenarioConfig::from_toml_file`] or use one of the
/// built-in presets via [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run length and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// One entry per `[[inverter]]` table.
    #[serde(default)]
    pub inverter: Vec<InverterSpec>,
}

/// Run length and global parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Scenario name used in logs and reports.
    pub name: String,
    /// Number of days to simulate, `1..=365`.
    pub days: usize,
    /// Master random seed for synthetic profiles.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            days: DAYS_PER_YEAR,
            seed: 42,
        }
    }
}

/// One inverter+battery pair. Every field except the schedules is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InverterSpec {
    pub name: String,
    pub initial_soc: InitialSoc,
    pub limits: InverterConfig,
    /// Absent table selects the no-battery variant.
    pub battery: Option<BatteryConfig>,
    #[serde(default)]
    pub load_shift: Vec<LoadShiftRule>,
    #[serde(default)]
    pub forced_discharge: Vec<ForcedDischargeRule>,
    pub profile: ProfileSource,
}

/// Where an inverter's input samples come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ProfileSource {
    /// CSV file of readings, each `source_minutes` long.
    Csv {
        path: PathBuf,
        #[serde(default = "native_minutes")]
        source_minutes: u16,
    },
    /// Seeded synthetic household. `seed_offset` separates inverters that
    /// share a profile.
    Synthetic {
        load: BaseLoadParams,
        solar: SolarParams,
        #[serde(default)]
        seed_offset: u64,
    },
}

impl ProfileSource {
    pub fn synthetic(profile: SyntheticProfile, seed_offset: u64) -> Self {
        Self::Synthetic {
            load: profile.load,
            solar: profile.solar,
            seed_offset,
        }
    }
}

fn native_minutes() -> u16 {
    INTERVAL_MINUTES
}

impl ScenarioConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "no_battery", "night_rate", "dual_inverter"];

    /// One house, one 10 kWh battery, no schedules.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig {
                name: "baseline".to_string(),
                ..SimulationConfig::default()
            },
            inverter: vec![InverterSpec {
                name: "roof".to_string(),
                initial_soc: InitialSoc::DischargeFloor,
                limits: hybrid_inverter(),
                battery: Some(home_battery()),
                load_shift: Vec::new(),
                forced_discharge: Vec::new(),
                profile: ProfileSource::synthetic(SyntheticProfile::household(), 0),
            }],
        }
    }

    /// The baseline house without storage.
    pub fn no_battery() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.name = "no_battery".to_string();
        for inv in &mut cfg.inverter {
            inv.battery = None;
        }
        cfg
    }

    /// Baseline plus winter night-rate grid charging and an evening
    /// forced discharge on workdays.
    pub fn night_rate() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.name = "night_rate".to_string();
        for inv in &mut cfg.inverter {
            inv.load_shift = vec![LoadShiftRule {
                begin_hour: 23,
                end_hour: 6,
                target_soc_pct: 80.0,
                months: WINTER,
                weekdays: WeekdaySet::ALL,
            }];
            inv.forced_discharge = vec![ForcedDischargeRule {
                begin_hour: 17,
                end_hour: 19,
                stop_pct: 40.0,
                rate_kwh: 0.15,
                months: WINTER,
                weekdays: WeekdaySet::WORKDAYS,
            }];
        }
        cfg
    }

    /// Two arrays on one house: a battery-backed main inverter and a small
    /// second inverter without storage.
    pub fn dual_inverter() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.name = "dual_inverter".to_string();
        let mut garage_profile = SyntheticProfile::household();
        garage_profile.load.base_kw = 0.1;
        garage_profile.load.amp_kw = 0.05;
        garage_profile.solar.kw_peak = 2.5;
        cfg.inverter.push(InverterSpec {
            name: "garage".to_string(),
            initial_soc: InitialSoc::DischargeFloor,
            limits: InverterConfig {
                max_throughput_kw: 3.0,
                export_max_kwh: 0.25,
                ..hybrid_inverter()
            },
            battery: None,
            load_shift: Vec::new(),
            forced_discharge: Vec::new(),
            profile: ProfileSource::synthetic(garage_profile, 100),
        });
        cfg
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "no_battery" => Ok(Self::no_battery()),
            "night_rate" => Ok(Self::night_rate()),
            "dual_inverter" => Ok(Self::dual_inverter()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// Relative CSV paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Io`] if the file cannot be read and
    /// [`SimError::Config`] if the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&content)
            .map_err(|e| SimError::Config(ConfigErrors(vec![e])))?;
        if let Some(dir) = path.parent() {
            cfg.resolve_paths(dir);
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid, contains unknown
    /// fields or misses a required one.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Prefixes relative CSV paths with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for inv in &mut self.inverter {
            if let ProfileSource::Csv { path, .. } = &mut inv.profile {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    /// Number of intervals covered by `simulation.days`.
    pub fn interval_count(&self) -> usize {
        intervals_for_days(self.simulation.days)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !(1..=DAYS_PER_YEAR).contains(&s.days) {
            errors.push(ConfigError::new(
                "simulation.days",
                format!("must be in 1..={DAYS_PER_YEAR}"),
            ));
        }
        if self.inverter.is_empty() {
            errors.push(ConfigError::new(
                "inverter",
                "at least one [[inverter]] table is required",
            ));
        }

        let mut names = HashSet::new();
        for (i, inv) in self.inverter.iter().enumerate() {
            let prefix = format!("inverter[{i}]");
            if inv.name.trim().is_empty() {
                errors.push(ConfigError::new(format!("{prefix}.name"), "must not be empty"));
            } else if !names.insert(inv.name.as_str()) {
                errors.push(ConfigError::new(
                    format!("{prefix}.name"),
                    format!("duplicate inverter name \"{}\"", inv.name),
                ));
            }

            errors.extend(inv.limits.validate(&format!("{prefix}.limits")));
            let capacity = match &inv.battery {
                Some(battery) => {
                    errors.extend(battery.validate(&format!("{prefix}.battery")));
                    battery.capacity_kwh
                }
                None => 0.0,
            };
            if let InitialSoc::Kwh(kwh) = inv.initial_soc {
                if !(0.0..=capacity).contains(&kwh) {
                    errors.push(ConfigError::new(
                        format!("{prefix}.initial_soc"),
                        format!("{kwh} kWh is outside [0, {capacity}]"),
                    ));
                }
            }
            for (j, rule) in inv.load_shift.iter().enumerate() {
                errors.extend(rule.validate(&format!("{prefix}.load_shift[{j}]")));
            }
            for (j, rule) in inv.forced_discharge.iter().enumerate() {
                errors.extend(rule.validate(&format!("{prefix}.forced_discharge[{j}]")));
            }
            match &inv.profile {
                ProfileSource::Csv { source_minutes, .. } => errors.extend(validate_source_minutes(
                    *source_minutes,
                    &format!("{prefix}.profile.source_minutes"),
                )),
                ProfileSource::Synthetic { load, solar, .. } => {
                    let profile = SyntheticProfile {
                        load: *load,
                        solar: *solar,
                    };
                    errors.extend(profile.validate(&format!("{prefix}.profile")));
                }
            }
        }

        errors
    }
}

/// January to March and October to December.
const WINTER: MonthSet = MonthSet::from_bits(0b1_1100_0000_1110);

/// 10 kWh battery, 3 kW both ways, 10% reserve.
fn home_battery() -> BatteryConfig {
    BatteryConfig {
        capacity_kwh: 10.0,
        max_charge_kwh: 0.25,
        max_discharge_kwh: 0.25,
        discharge_stop_pct: 10.0,
        storage_loss_pct: 2.0,
        charge_curve: ChargeCurve {
            low: 100.0,
            mid: 100.0,
            high: 50.0,
            full: 0.0,
        },
    }
}

/// 5 kW hybrid inverter with a 5 kW export limit.
fn hybrid_inverter() -> InverterConfig {
    InverterConfig {
        ac2dc_loss_pct: 4.0,
        dc2ac_loss_pct: 3.0,
        dc2dc_loss_pct: 2.0,
        min_excess_kwh: 0.005,
        max_throughput_kw: 5.0,
        export_max_kwh: 5.0 / 12.0,
    }
}
