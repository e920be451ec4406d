use crate::config::PerformanceMode;
use clap::Parser;
use std::path::PathBuf;

/// signal-damper - drive a toy online-learning loop through the anti-oscillation damper
#[derive(Parser, Debug)]
#[command(name = "signal-damper", version, about)]
pub struct Args {
    /// Damper config file (default: <config dir>/signal-damper/damper.toml)
    #[arg(long, short = 'c', conflicts_with = "mode")]
    pub config: Option<PathBuf>,

    /// Use a performance preset instead of a config file
    #[arg(long, short = 'm', value_enum)]
    pub mode: Option<PerformanceMode>,

    /// Print the default config.toml to stdout and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Replay JSON-lines iteration states through the damper instead of simulating
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Simulated iterations
    #[arg(long, default_value_t = 2000)]
    pub iterations: usize,

    /// Number of weights in the simulated model
    #[arg(long, default_value_t = 128)]
    pub weights: usize,

    /// Base learning rate
    #[arg(long, default_value_t = 0.05)]
    pub lr: f64,

    /// Seed for the simulated features
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Inject a cost shock every N iterations (0 = never)
    #[arg(long, default_value_t = 250)]
    pub spike_every: usize,

    /// Log progress every N iterations (0 = never)
    #[arg(long, default_value_t = 200)]
    pub log_every: usize,

    /// Print final stats as JSON
    #[arg(long)]
    pub json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
