mod app;
mod args;

use std::process::ExitCode;

use clap::Parser;
use hn_core::ReaderConfig;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args);
    match app::run(config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "reader failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(args: &Args) -> ReaderConfig {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => match ReaderConfig::default_path() {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(error = %err, "using built-in configuration");
                None
            }
        },
    };
    let mut config = path
        .map(ReaderConfig::load_or_default)
        .unwrap_or_default();

    if let Some(feed) = args.feed {
        config.api.feed = feed;
    }
    if let Some(rows) = args.rows {
        config.loading.visible_rows = rows;
    }
    config
}
