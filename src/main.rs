//! PV + battery household simulator entry point.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pv_battery_sim::config::ScenarioConfig;
use pv_battery_sim::io::export::export_csv;
use pv_battery_sim::runner::{CancelToken, PartialPolicy, ScenarioResult, run_scenarios};

/// Simulate a household PV array, battery and grid connection in 5-minute
/// intervals over a reference year.
#[derive(Debug, Parser)]
#[command(name = "pv-battery-sim", version)]
struct Args {
    /// Scenario TOML file. Repeat to run several scenarios in parallel.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    scenario: Vec<PathBuf>,

    /// Built-in preset (baseline, no_battery, night_rate, dual_inverter).
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Override the random seed of synthetic profiles.
    #[arg(long, env = "PV_SIM_SEED")]
    seed: Option<u64>,

    /// Override the number of simulated days.
    #[arg(long)]
    days: Option<usize>,

    /// Export interval records to CSV (single scenario only).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print one line per interval record.
    #[arg(long)]
    print_steps: bool,

    /// Return partial results when interrupted instead of failing.
    #[arg(long)]
    keep_partial: bool,
}

fn load_configs(args: &Args) -> Result<Vec<ScenarioConfig>> {
    let mut configs = if args.scenario.is_empty() {
        let name = args.preset.as_deref().unwrap_or("baseline");
        vec![ScenarioConfig::from_preset(name).context("selecting preset")?]
    } else {
        args.scenario
            .iter()
            .map(|path| {
                ScenarioConfig::from_toml_file(path)
                    .with_context(|| format!("loading scenario {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    for cfg in &mut configs {
        if let Some(seed) = args.seed {
            cfg.simulation.seed = seed;
        }
        if let Some(days) = args.days {
            cfg.simulation.days = days;
        }
    }
    Ok(configs)
}

fn report(result: &ScenarioResult, print_steps: bool) {
    println!("=== {} ===", result.name);
    if result.cancelled {
        println!("(interrupted after {} intervals)", result.records.len());
    }
    if print_steps {
        for record in &result.records {
            println!("{record}");
        }
    }
    print!("{}", result.summary);
    println!();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let configs = load_configs(&args)?;
    if args.output.is_some() && configs.len() > 1 {
        bail!("--output needs exactly one scenario, got {}", configs.len());
    }

    let cancel = CancelToken::new();
    signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.flag())
        .context("registering SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, cancel.flag())
        .context("registering SIGTERM handler")?;

    let policy = if args.keep_partial {
        PartialPolicy::Keep
    } else {
        PartialPolicy::Discard
    };

    let mut results = Vec::with_capacity(configs.len());
    for (cfg, result) in configs.iter().zip(run_scenarios(&configs, &cancel, policy)) {
        let result =
            result.with_context(|| format!("running scenario \"{}\"", cfg.simulation.name))?;
        report(&result, args.print_steps);
        results.push(result);
    }

    if let (Some(path), [result]) = (&args.output, results.as_slice()) {
        export_csv(&result.records, path)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Exported {} records to {}", result.records.len(), path.display());
    }
    Ok(())
}
