//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use pv_battery_sim::devices::{Battery, BatteryConfig, ChargeCurve, InitialSoc, InverterConfig};
use pv_battery_sim::sim::calendar::ReferenceYear;
use pv_battery_sim::sim::context::InverterContext;
use pv_battery_sim::sim::types::{Diversion, IntervalSample};

/// 5.7 kWh battery, 0.225 kWh per interval both ways, 20% stop, 1% storage loss.
pub fn small_battery() -> BatteryConfig {
    BatteryConfig {
        capacity_kwh: 5.7,
        max_charge_kwh: 0.225,
        max_discharge_kwh: 0.225,
        discharge_stop_pct: 20.0,
        storage_loss_pct: 1.0,
        charge_curve: ChargeCurve {
            low: 100.0,
            mid: 100.0,
            high: 50.0,
            full: 0.0,
        },
    }
}

/// 10 kWh battery, 1 kWh per interval both ways, 10% stop, 2% storage loss.
pub fn home_battery() -> BatteryConfig {
    BatteryConfig {
        capacity_kwh: 10.0,
        max_charge_kwh: 1.0,
        max_discharge_kwh: 1.0,
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

/// Inverter with loss percentages `(ac2dc, dc2ac, dc2dc)` and otherwise no limits.
pub fn lossy_inverter(ac2dc: f64, dc2ac: f64, dc2dc: f64) -> InverterConfig {
    InverterConfig {
        ac2dc_loss_pct: ac2dc,
        dc2ac_loss_pct: dc2ac,
        dc2dc_loss_pct: dc2dc,
        ..InverterConfig::IDEAL
    }
}

/// Calendar-aligned samples from `(load, pv)` pairs, starting at interval 0.
pub fn samples(pairs: &[(f64, f64)]) -> Vec<IntervalSample> {
    let year = ReferenceYear::new();
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(load_kwh, pv_kwh))| IntervalSample {
            slot: year.slot(i),
            load_kwh,
            pv_kwh,
            diversion: Diversion::default(),
        })
        .collect()
}

/// A single-inverter context without schedules.
pub fn context(
    limits: InverterConfig,
    battery: Battery,
    initial_soc: InitialSoc,
    data: Vec<IntervalSample>,
) -> InverterContext {
    InverterContext::builder()
        .name("inv")
        .limits(limits)
        .battery(battery)
        .initial_soc(initial_soc)
        .samples(data)
        .build()
        .expect("fixture context should be valid")
}

/// A lossless single-inverter context without a battery.
pub fn no_battery(pairs: &[(f64, f64)]) -> InverterContext {
    context(
        InverterConfig::IDEAL,
        Battery::Absent,
        InitialSoc::DischargeFloor,
        samples(pairs),
    )
}
