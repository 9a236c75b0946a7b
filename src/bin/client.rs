//! # Top-K Client - Entry Point
//! src/bin/client.rs
//!
//! `topk-client NUM_THREADS FILE_NAME`: manda cada URL del archivo al
//! servidor e imprime las respuestas.

use clap::Parser;
use topk_server::client::run_batch;
use topk_server::config::ClientConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::parse();
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(2);
    }

    match run_batch(&config) {
        Ok(summary) => info!(
            sent = summary.sent,
            answered = summary.answered,
            empty = summary.empty,
            errors = summary.errors,
            "done"
        ),
        Err(e) => {
            error!(file = %config.file_name, error = %e, "could not read URL file");
            std::process::exit(1);
        }
    }
}
