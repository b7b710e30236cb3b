use serde::Deserialize;

use crate::error::ConfigError;
use crate::sim::calendar::INTERVAL_HOURS;

/// Static inverter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InverterConfig {
    /// Conversion loss from grid AC into the battery, in percent.
    pub ac2dc_loss_pct: f64,
    /// Conversion loss from PV DC to household AC, in percent.
    pub dc2ac_loss_pct: f64,
    /// Conversion loss from PV DC into the battery, in percent.
    pub dc2dc_loss_pct: f64,
    /// Usable PV excess (kWh per interval) at or below which no charging is attempted.
    pub min_excess_kwh: f64,
    /// Maximum inverter power (kW) shared by grid feed and battery charging.
    pub max_throughput_kw: f64,
    /// Maximum energy (kWh per interval) fed to the grid.
    pub export_max_kwh: f64,
}

impl InverterConfig {
    /// Lossless inverter with no throughput or export limits.
    pub const IDEAL: Self = Self {
        ac2dc_loss_pct: 0.0,
        dc2ac_loss_pct: 0.0,
        dc2dc_loss_pct: 0.0,
        min_excess_kwh: 0.0,
        max_throughput_kw: f64::INFINITY,
        export_max_kwh: f64::INFINITY,
    };

    /// Throughput cap converted to energy per interval.
    pub fn max_throughput_kwh(&self) -> f64 {
        self.max_throughput_kw * INTERVAL_HOURS
    }

    pub fn efficiencies(&self) -> Efficiencies {
        Efficiencies {
            ac2dc: 1.0 - self.ac2dc_loss_pct / 100.0,
            dc2ac: 1.0 - self.dc2ac_loss_pct / 100.0,
            dc2dc: 1.0 - self.dc2dc_loss_pct / 100.0,
        }
    }

    /// Validates all fields, reporting errors under the dotted path `prefix`.
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (name, pct) in [
            ("ac2dc_loss_pct", self.ac2dc_loss_pct),
            ("dc2ac_loss_pct", self.dc2ac_loss_pct),
            ("dc2dc_loss_pct", self.dc2dc_loss_pct),
        ] {
            if !(0.0..100.0).contains(&pct) {
                errors.push(ConfigError::new(
                    format!("{prefix}.{name}"),
                    "must be in [0, 100)",
                ));
            }
        }
        if self.min_excess_kwh.is_nan() || self.min_excess_kwh < 0.0 {
            errors.push(ConfigError::new(
                format!("{prefix}.min_excess_kwh"),
                "must be >= 0",
            ));
        }
        // Infinity is allowed for both caps and means "unlimited".
        if self.max_throughput_kw.is_nan() || self.max_throughput_kw < 0.0 {
            errors.push(ConfigError::new(
                format!("{prefix}.max_throughput_kw"),
                "must be >= 0",
            ));
        }
        if self.export_max_kwh.is_nan() || self.export_max_kwh < 0.0 {
            errors.push(ConfigError::new(
                format!("{prefix}.export_max_kwh"),
                "must be >= 0",
            ));
        }
        errors
    }
}

/// Conversion efficiencies as fractions, `1 - loss / 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Efficiencies {
    pub ac2dc: f64,
    pub dc2ac: f64,
    pub dc2dc: f64,
}
