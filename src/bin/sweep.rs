//! Diagnostic Sweep Binary
//!
//! Probes a model with several preprocessing schemes and synthetic inputs
//! to spot degenerate output. Prints statistics; passes no verdict.

use clap::Parser;
use prognose::model::Options;
use prognose::sweep::Sweep;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Probe a model for degenerate output", long_about = None)]
struct Args {
    /// artifact to probe
    #[arg(default_value = prognose::MODEL_PATH)]
    model: PathBuf,
    /// directory of sample images
    #[arg(long, short, default_value = prognose::SAMPLES_DIR)]
    samples: PathBuf,
    /// seed for synthetic images and noise probes
    #[arg(long)]
    seed: Option<u64>,
    /// images per forward pass
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
    match Sweep::new(args.model, args.samples)
        .options(options)
        .seed(args.seed)
        .run()
    {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
