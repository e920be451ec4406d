use anyhow::Result;
use clap::Parser;
use human_panic::setup_panic;
use signal_damper::app::{self, logging, Args};

fn main() -> Result<()> {
    setup_panic!();

    let args = Args::parse();
    let _log_guard = logging::init(args.log_file.as_deref())?;

    if let Err(e) = app::run(&args) {
        tracing::error!(error = %format!("{:#}", e), "signal-damper failed");
        return Err(e);
    }
    Ok(())
}
