//! # Top-K Word Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, levanta el master y lo detiene con Ctrl+C.

use topk_server::config::Config;
use topk_server::server::{Master, ShutdownHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Crear configuración (CLI + env)
    let config = Config::new();

    info!(
        address = %config.address(),
        workers = config.num_workers,
        top_k = config.top_k,
        "starting top-k word server"
    );

    let shutdown = ShutdownHandle::new();
    let handle = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handle.shutdown()) {
        warn!(error = %e, "could not install signal handler; shutdown only by killing the process");
    }

    // Bloquea hasta que llegue la señal
    match Master::start(config, shutdown) {
        Ok(snapshot) => info!(processed = snapshot.processed, "bye"),
        Err(e) => {
            error!(error = %e, "fatal error");
            std::process::exit(1);
        }
    }
}
