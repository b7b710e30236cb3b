//! Property tests over arbitrary load/PV sequences.

mod common;

use approx::assert_abs_diff_eq;
use proptest::prelude::*;

use pv_battery_sim::devices::{Battery, InitialSoc, InverterConfig, max_charge_rate};
use pv_battery_sim::sim::calendar::{INTERVALS_PER_YEAR, ReferenceYear};
use pv_battery_sim::sim::context::InverterContext;
use pv_battery_sim::sim::schedule::{
    ForcedDischargeRule, LoadShiftRule, MonthSet, WeekdaySet, expand,
};

fn energy() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => 0.0..2.0_f64,
        1 => Just(0.0),
        1 => 1e3..1e6_f64,
    ]
}

fn pairs(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((energy(), energy()), 1..max_len)
}

fn load_shift_rule() -> impl Strategy<Value = LoadShiftRule> {
    (0u8..24, 1u8..=24, 0.0..=100.0_f64, 1u16..0x1FFF, 1u8..0x7F)
        .prop_filter("empty window", |(b, e, ..)| b != e)
        .prop_map(|(begin_hour, end_hour, target_soc_pct, months, weekdays)| LoadShiftRule {
            begin_hour,
            end_hour,
            target_soc_pct,
            months: months_from_bits(months),
            weekdays: weekdays_from_bits(weekdays),
        })
}

fn forced_rule() -> impl Strategy<Value = ForcedDischargeRule> {
    (0u8..24, 1u8..=24, 0.0..100.0_f64, 0.0..2.0_f64)
        .prop_filter("empty window", |(b, e, ..)| b != e)
        .prop_map(|(begin_hour, end_hour, stop_pct, rate_kwh)| ForcedDischargeRule {
            begin_hour,
            end_hour,
            stop_pct,
            rate_kwh,
            months: MonthSet::ALL,
            weekdays: WeekdaySet::ALL,
        })
}

fn months_from_bits(bits: u16) -> MonthSet {
    let months: Vec<u8> = (1..=12).filter(|m| bits & (1 << (m - 1)) != 0).collect();
    MonthSet::new(&months).unwrap_or(MonthSet::ALL)
}

fn weekdays_from_bits(bits: u8) -> WeekdaySet {
    let days: Vec<u8> = (0..7).filter(|d| bits & (1 << d) != 0).collect();
    WeekdaySet::new(&days).unwrap_or(WeekdaySet::ALL)
}

proptest! {
    #[test]
    fn soc_stays_within_bounds(
        data in pairs(200),
        start_pct in 0.0..=100.0_f64,
        load_shift in prop::collection::vec(load_shift_rule(), 0..3),
        forced in prop::collection::vec(forced_rule(), 0..3),
    ) {
        let battery = common::home_battery();
        let floor = battery.capacity_kwh * battery.discharge_stop_pct / 100.0;
        let start = start_pct / 100.0 * battery.capacity_kwh;
        let mut ctx = InverterContext::builder()
            .name("prop")
            .limits(InverterConfig {
                min_excess_kwh: 0.01,
                max_throughput_kw: 6.0,
                export_max_kwh: 0.4,
                ..common::lossy_inverter(5.0, 3.0, 2.0)
            })
            .battery(Battery::Installed(battery))
            .initial_soc(InitialSoc::Kwh(start))
            .load_shift(load_shift)
            .forced_discharge(forced)
            .samples(common::samples(&data))
            .build()
            .unwrap();

        let mut prev = start;
        for i in 0..data.len() {
            let step = ctx.step(i).unwrap();
            prop_assert!((0.0..=battery.capacity_kwh).contains(&step.soc_kwh));
            // Load discharge never goes below the battery floor.
            if step.battery_to_load_kwh > 0.0 && step.battery_to_grid_kwh == 0.0 {
                prop_assert!(step.soc_kwh >= floor.min(prev) - 1e-9);
            }
            for flow in [
                step.buy_kwh,
                step.feed_kwh,
                step.battery_to_load_kwh,
                step.pv_to_charge_kwh,
                step.grid_to_battery_kwh,
                step.battery_to_grid_kwh,
                step.curtailed_kwh,
            ] {
                prop_assert!(flow >= -1e-12, "negative flow in {step:?}");
            }
            prev = step.soc_kwh;
        }
    }

    #[test]
    fn unlimited_path_reduces_to_energy_balance(data in pairs(100)) {
        let mut ctx = common::no_battery(&data);
        for (i, &(load, pv)) in data.iter().enumerate() {
            let step = ctx.step(i).unwrap();
            assert_abs_diff_eq!(step.buy_kwh, (load - pv).max(0.0), epsilon = 1e-9);
            assert_abs_diff_eq!(step.feed_kwh, (pv - load).max(0.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn absent_battery_never_stores(data in pairs(100), export_max in 0.0..1.0_f64) {
        let limits = InverterConfig { export_max_kwh: export_max, ..InverterConfig::IDEAL };
        let mut ctx = common::context(
            limits,
            Battery::Absent,
            InitialSoc::DischargeFloor,
            common::samples(&data),
        );
        for (i, &(load, pv)) in data.iter().enumerate() {
            let step = ctx.step(i).unwrap();
            prop_assert_eq!(step.soc_kwh, 0.0);
            prop_assert_eq!(step.battery_to_load_kwh, 0.0);
            prop_assert_eq!(step.pv_to_charge_kwh, 0.0);
            assert_abs_diff_eq!(step.buy_kwh, (load - pv).max(0.0), epsilon = 1e-9);
            assert_abs_diff_eq!(step.feed_kwh, (pv - load).max(0.0).min(export_max), epsilon = 1e-9);
        }
    }

    #[test]
    fn balanced_interval_moves_nothing(energy in 0.0..5.0_f64, start_pct in 0.0..=100.0_f64) {
        let battery = common::home_battery();
        let start = start_pct / 100.0 * battery.capacity_kwh;
        let mut ctx = common::context(
            InverterConfig::IDEAL,
            Battery::Installed(battery),
            InitialSoc::Kwh(start),
            common::samples(&[(energy, energy)]),
        );
        let step = ctx.step(0).unwrap();
        prop_assert_eq!(step.buy_kwh, 0.0);
        prop_assert_eq!(step.feed_kwh, 0.0);
        prop_assert_eq!(step.battery_to_load_kwh, 0.0);
        prop_assert_eq!(step.pv_to_charge_kwh, 0.0);
        prop_assert_eq!(step.soc_kwh, start);
    }

    #[test]
    fn charge_rate_never_rises_with_soc(a in 0.0..=1.0_f64, b in 0.0..=1.0_f64) {
        let battery = common::home_battery();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let cap = battery.capacity_kwh;
        prop_assert!(max_charge_rate(lo * cap, &battery) >= max_charge_rate(hi * cap, &battery));
        prop_assert_eq!(max_charge_rate(cap, &battery), 0.0);
    }

    #[test]
    fn schedule_expansion_is_deterministic(rules in prop::collection::vec(load_shift_rule(), 0..5)) {
        let year = ReferenceYear::new();
        let a = expand(&year, INTERVALS_PER_YEAR, &rules);
        let b = expand(&year, INTERVALS_PER_YEAR, &rules);
        prop_assert_eq!(a.len(), INTERVALS_PER_YEAR);
        prop_assert_eq!(a.as_slice(), b.as_slice());
        if rules.is_empty() {
            prop_assert_eq!(a.active_count(), 0);
        }
    }
}
