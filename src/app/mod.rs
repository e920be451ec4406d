pub mod cli;
pub mod logging;
pub mod replay;
pub mod sim;

pub use cli::Args;

use crate::config::DamperConfig;
use crate::damper::SignalDamper;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, Write};

/// Pick the damper config: preset, explicit file, or the default location
pub fn resolve_config(args: &Args) -> Result<DamperConfig> {
    if let Some(mode) = args.mode {
        tracing::info!(?mode, "using performance preset");
        return Ok(DamperConfig::for_mode(mode));
    }
    match &args.config {
        Some(path) => DamperConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => DamperConfig::load_or_default().context("loading default config"),
    }
}

/// Run whichever action the arguments select
pub fn run(args: &Args) -> Result<()> {
    if args.generate_config {
        let text = DamperConfig::default().to_toml_string()?;
        print!("{}", text);
        return Ok(());
    }

    let config = resolve_config(args)?;
    let mut damper = SignalDamper::new(config).context("building damper")?;

    if let Some(path) = &args.replay {
        let file =
            File::open(path).with_context(|| format!("opening replay file {}", path.display()))?;
        let stdout = io::stdout();
        let count = replay::replay(&mut damper, BufReader::new(file), stdout.lock())?;
        tracing::info!(states = count, "replay finished");
        return Ok(());
    }

    let params = sim::SimulationParams {
        iterations: args.iterations,
        weights: args.weights,
        lr: args.lr,
        seed: args.seed,
        spike_every: args.spike_every,
        log_every: args.log_every,
    };
    tracing::info!(
        iterations = params.iterations,
        weights = params.weights,
        lr = params.lr,
        "starting simulation"
    );
    let report = sim::run(&mut damper, &params)?;

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        let s = &report.stats;
        writeln!(out, "iterations:        {}", report.iterations)?;
        writeln!(out, "cost:              {:.6} -> {:.6} (best {:.6})", report.initial_cost, report.final_cost, report.best_cost)?;
        writeln!(out, "weight error:      {:.6} -> {:.6}", report.initial_weight_error, report.weight_error)?;
        writeln!(out, "shocks injected:   {}", report.shocks_injected)?;
        writeln!(out, "lr scale:          {:.4}", s.lr_scale)?;
        writeln!(out, "clips applied:     {}", s.counters.clips_applied)?;
        writeln!(out, "deadzones applied: {}", s.counters.deadzones_applied)?;
        writeln!(out, "spikes detected:   {}", s.counters.spikes_detected)?;
        writeln!(out, "oscillations:      {}", s.counters.oscillations_detected)?;
        writeln!(out, "momentum applied:  {}", s.counters.momentum_applied)?;
    }
    Ok(())
}
