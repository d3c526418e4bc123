// src/bin/jsonl_to_csv.rs
// Normalize reviewed OCR annotations (one file or a directory of .jsonl) into the dataset CSV.

use anyhow::Result;
use clap::Parser;
use ocr_dataset_prep::normalize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// A .jsonl file, or a directory whose .jsonl files are combined
    #[arg(long, default_value = "data/recheck_b11_to_b18")]
    input: PathBuf,

    /// Output CSV
    #[arg(long, default_value = "data/output_csv/ocr_validation_data.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(input = %args.input.display(), "converting");

    let summary = normalize::convert_path(&args.input, &args.output)?;
    info!(
        files = summary.files,
        rows = summary.rows,
        "Conversion complete. CSV saved to {}",
        args.output.display()
    );
    Ok(())
}
