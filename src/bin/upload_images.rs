use anyhow::Result;
use clap::Parser;
use ocr_dataset_prep::{
    config::Settings,
    upload::{self, GcsStore},
};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line args: inputs, output, and optional overrides of the settings file
#[derive(Parser, Debug)]
struct Args {
    /// JSON array of `{image_name, text}` objects
    #[arg(long, default_value = "data/ume_data/image_coordinates_and_text.json")]
    items: PathBuf,

    /// Directory holding the line images
    #[arg(long, default_value = "data/ume_data/line_segmented_images")]
    images_dir: PathBuf,

    /// Output CSV
    #[arg(long, default_value = "data/ume_data/ume_output.csv")]
    output: PathBuf,

    /// Optional YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bucket (overrides settings)
    #[arg(long)]
    bucket: Option<String>,

    /// Key prefix inside bucket (overrides settings)
    #[arg(long)]
    prefix: Option<String>,

    /// Concurrent uploads (overrides settings; default = CPU count)
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bucket) = args.bucket {
        settings.bucket = bucket;
    }
    if let Some(prefix) = args.prefix {
        settings.prefix = prefix;
    }
    if args.workers.is_some() {
        settings.workers = args.workers;
    }
    let workers = settings.worker_count();
    info!(bucket = %settings.bucket, prefix = %settings.prefix, workers, "Configuration");

    let items = upload::load_items(&args.items)?;
    info!("{} items in {}", items.len(), args.items.display());

    let store = Arc::new(GcsStore::connect(&settings.bucket, &settings.storage_host).await?);

    let start = Instant::now();
    let report =
        upload::process_images(store, items, &settings.prefix, &args.images_dir, workers).await?;
    info!(elapsed = ?start.elapsed(), "uploads joined");

    if report.summary.skipped() > 0 {
        warn!(
            missing = report.summary.missing,
            failed = report.summary.failed,
            "{} of {} images left out of the CSV",
            report.summary.skipped(),
            report.summary.submitted
        );
    }

    upload::write_to_csv(&args.output, &report.rows)?;
    Ok(())
}
