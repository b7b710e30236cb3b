//! Error types shared by the simulator library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"inverter[0].battery.capacity_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A non-empty list of configuration errors, rendered one per line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// A battery operation that would leave the SOC outside `[0, capacity]`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{operation} of {amount} kWh rejected at soc {soc} kWh (capacity {capacity} kWh)")]
pub struct SocViolation {
    pub operation: &'static str,
    pub amount: f64,
    pub soc: f64,
    pub capacity: f64,
}

/// Failures raised while building or running a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected at construction time, before any interval is processed.
    #[error("invalid configuration:\n{0}")]
    Config(ConfigErrors),

    #[error("scenario has no inverters")]
    NoInverters,

    /// The input sequence of an inverter does not cover the requested interval.
    #[error(
        "insufficient input data for inverter \"{inverter}\": interval {interval} requested, {available} samples available"
    )]
    InsufficientInput {
        inverter: String,
        interval: usize,
        available: usize,
    },

    /// Input sample tags do not match the reference calendar.
    #[error("input row {row} is misaligned: expected day {expected_day} minute {expected_minute}, got day {day} minute {minute}")]
    Misaligned {
        row: usize,
        expected_day: u16,
        expected_minute: u16,
        day: u16,
        minute: u16,
    },

    #[error("input row {row}: {message}")]
    InvalidSample { row: usize, message: String },

    /// Intervals must be processed once each, in ascending order.
    #[error("interval {got} processed out of order (expected {expected})")]
    OutOfOrder { expected: usize, got: usize },

    /// The dispatch of an interval broke a battery bound.
    #[error("inverter \"{inverter}\" at interval {interval}: {source}")]
    Invariant {
        inverter: String,
        interval: usize,
        #[source]
        source: SocViolation,
    },

    #[error("run cancelled after {completed} intervals")]
    Cancelled { completed: usize },

    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    /// Wraps a validation result, returning `Ok(())` when `errors` is empty.
    pub fn check(errors: Vec<ConfigError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Config(ConfigErrors(errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_error_list_passes() {
        assert!(SimError::check(Vec::new()).is_ok());
    }

    #[test]
    fn config_errors_render_one_per_line() {
        let err = SimError::check(vec![
            ConfigError::new("battery.capacity_kwh", "must be > 0"),
            ConfigError::new("limits.export_max_kwh", "must be >= 0"),
        ])
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("battery.capacity_kwh: must be > 0"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn insufficient_input_names_inverter_and_interval() {
        let err = SimError::InsufficientInput {
            inverter: "garage".into(),
            interval: 12,
            available: 10,
        };
        let text = err.to_string();
        assert!(text.contains("garage"));
        assert!(text.contains("interval 12"));
    }

    #[test]
    fn invariant_names_operation_and_bound() {
        let err = SimError::Invariant {
            inverter: "garage".into(),
            interval: 7,
            source: SocViolation {
                operation: "charge",
                amount: 1.0,
                soc: 5.5,
                capacity: 5.7,
            },
        };
        let text = err.to_string();
        assert!(text.contains("garage"));
        assert!(text.contains("interval 7"));
        assert!(text.contains("charge of 1 kWh"));
    }
}
