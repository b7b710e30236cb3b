//! Battery, inverter and input-profile models.

/// Residential base-load profile generator.
pub mod baseload;
/// Battery configuration and runtime state.
pub mod battery;
/// SOC-bracket charge acceptance.
pub mod charge_model;
/// Inverter loss factors and limits.
pub mod inverter;
/// Seasonal solar PV generation profile.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use battery::{Battery, BatteryConfig, BatteryState, ChargeCurve, DischargeLimit, InitialSoc};
pub use charge_model::max_charge_rate;
pub use inverter::{Efficiencies, InverterConfig};
pub use solar::SolarPv;
pub use types::Profile;
