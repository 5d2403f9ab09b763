use std::path::PathBuf;

use clap::Parser;
use spark_common::ModelVersion;

/// spark: a terminal chat client for the Spark conversational service.
#[derive(Parser, Debug)]
#[command(name = "spark", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (e.g. `debug`, `spark_client=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Model version for this run (1.5, 2.0, 3.0, 3.5).
    #[arg(short, long)]
    pub model: Option<ModelVersion>,

    /// Re-run interactive setup even if the config is complete.
    #[arg(long)]
    pub setup: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
