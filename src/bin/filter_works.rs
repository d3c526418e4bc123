// src/bin/filter_works.rs
// Keep manuscript works whose categories all fall inside the allowed set.

use anyhow::Result;
use clap::Parser;
use ocr_dataset_prep::{config::Settings, filter};
use std::{collections::HashSet, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// CSV with `work_id,category` header
    #[arg(long, default_value = "data/manuscript_works.csv")]
    input: PathBuf,

    /// Text file receiving one work id per line
    #[arg(long, default_value = "data/umay_work_ids.txt")]
    output: PathBuf,

    /// Optional YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allowed category; repeat to replace the configured set
    #[arg(long = "allow")]
    allow: Vec<String>,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let allowed: HashSet<String> = if args.allow.is_empty() {
        settings.allowed_set()
    } else {
        args.allow.iter().cloned().collect()
    };
    info!(input = %args.input.display(), allowed = ?allowed, "filtering works");

    let summary = filter::filter_work_ids(&args.input, &args.output, &allowed)?;
    info!(
        seen = summary.works_seen,
        kept = summary.works_kept,
        "done → {}",
        args.output.display()
    );
    Ok(())
}
