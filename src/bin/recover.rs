//! Model Recovery Binary
//!
//! Coerces the legacy artifact into the current format, trying each load
//! strategy in turn, and writes the result next to it.

use clap::Parser;
use colored::Colorize;
use prognose::model::Options;
use prognose::recovery::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Recover a legacy model artifact", long_about = None)]
struct Args {
    /// artifact to recover
    #[arg(default_value = prognose::MODEL_PATH)]
    input: PathBuf,
    /// where the recovered model is written
    #[arg(long, short, default_value = prognose::FIXED_PATH)]
    output: PathBuf,
    /// images per forward pass in the reconstruction probe
    #[arg(long, default_value_t = prognose::BATCH_SIZE)]
    batch_size: usize,
}

fn main() -> ExitCode {
    prognose::log();
    let args = Args::parse();
    let options = Options {
        batch_size: args.batch_size,
        ..Options::default()
    };
    let recovery = Recovery::new(&args.input, &args.output).options(options);
    match recovery.run() {
        Ok(recovered) => {
            log::info!("{}", "=".repeat(60));
            log::info!("{}", "model converted successfully".green());
            log::info!("{}", "=".repeat(60));
            for attempt in recovered.attempts.iter() {
                log::info!("{}", attempt);
            }
            log::info!("new model saved as {}", recovery.output().display());
            log::info!("next steps:");
            log::info!("1. remove the old model: {}", recovery.input().display());
            log::info!(
                "2. rename the new model: {} -> {}",
                recovery.output().display(),
                recovery.input().display()
            );
            log::info!("3. commit the replaced model");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}
