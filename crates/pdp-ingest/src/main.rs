//! PDP Ingest - Public dataset pipeline runner

use anyhow::Result;
use clap::Parser;
use pdp_common::logging::{init_logging, LogConfig, LogLevel};
use pdp_ingest::retry::{self, RetryPolicy};
use pdp_ingest::trafficvision::{TrafficVisionParams, TrafficVisionPipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pdp-ingest")]
#[command(author, version, about = "PDP dataset pipeline runner")]
struct Cli {
    /// Pipeline to run
    #[command(subcommand)]
    pipeline: Pipeline,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Pipeline {
    /// Run one phase of the TrafficVision batch pipeline
    Trafficvision(TrafficVisionParams),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("pdp-ingest".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    match cli.pipeline {
        Pipeline::Trafficvision(params) => {
            info!(
                project_id = %params.project_id,
                pipeline = %params.pipeline,
                "Starting TrafficVision pipeline"
            );

            let pipeline = TrafficVisionPipeline::new(params).await?;
            retry::with_retry(RetryPolicy::default(), || pipeline.run()).await?;
        },
    }

    info!("Pipeline complete");
    Ok(())
}
