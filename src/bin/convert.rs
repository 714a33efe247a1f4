//! Model Conversion Binary
//!
//! Re-serializes an artifact that already loads under the current layer
//! schema. No fallbacks; use `recover` for legacy artifacts.

use clap::Parser;
use colored::Colorize;
use prognose::recovery::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Re-save a model in the current format", long_about = None)]
struct Args {
    #[arg(default_value = prognose::MODEL_PATH)]
    input: PathBuf,
    #[arg(long, short, default_value = prognose::CONVERTED_PATH)]
    output: PathBuf,
}

fn main() -> ExitCode {
    prognose::log();
    let args = Args::parse();
    let conversion = Recovery::new(&args.input, &args.output).strategies(vec![Strategy::Direct]);
    match conversion.run() {
        Ok(_) => {
            log::info!("{}", "conversion complete".green());
            log::info!("next steps:");
            log::info!(
                "1. replace {} with {}",
                args.input.display(),
                args.output.display()
            );
            log::info!("2. commit the replaced model");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e.to_string().red());
            log::error!("the model needs to be retrained or recovered with `recover`");
            ExitCode::FAILURE
        }
    }
}
