//! # Cliente del Protocolo
//! src/client.rs
//!
//! Habla el mismo protocolo que el master: un request `GET <url> HTTP/1.1`
//! y una respuesta que termina cuando el servidor cierra la conexión.
//! Cero bytes significa que la tarea falló.

use crate::config::ClientConfig;
use crate::text::WordCounts;
use std::fs;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error talking to server: {0}")]
    Io(#[from] io::Error),

    #[error("server sent an invalid mapping: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Arma el request tal como lo espera el master
pub fn build_request(host: &str, url: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n",
        url, host
    )
}

/// Envía un request y lee hasta EOF
///
/// Retorna `None` si el servidor cerró sin escribir nada.
pub fn send_request(server: &str, url: &str, timeout: Duration) -> Result<Option<WordCounts>, ClientError> {
    let body = exchange(server, url, timeout)?;

    if body.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_slice(&body)?))
}

fn exchange(server: &str, url: &str, timeout: Duration) -> Result<Vec<u8>, ClientError> {
    let mut stream = TcpStream::connect(server).map_err(|source| ClientError::Connect {
        server: server.to_string(),
        source,
    })?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let host = server.rsplit_once(':').map_or(server, |(host, _)| host);
    stream.write_all(build_request(host, url).as_bytes())?;
    stream.flush()?;

    let mut body = Vec::new();
    stream.read_to_end(&mut body)?;
    Ok(body)
}

/// Resumen de una corrida de `run_batch`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub sent: usize,

    /// Respuestas con un mapping válido
    pub answered: usize,

    /// Conexiones cerradas sin bytes
    pub empty: usize,

    pub errors: usize,
}

/// Lee una URL por línea de `config.file_name` y las envía con
/// `config.num_threads` threads. Imprime `"<url>: <respuesta>"` por cada una.
pub fn run_batch(config: &ClientConfig) -> io::Result<BatchSummary> {
    let contents = fs::read_to_string(&config.file_name)?;
    let urls: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    info!(urls = urls.len(), threads = config.num_threads, server = %config.server, "starting batch");

    let next = AtomicUsize::new(0);
    let summary = Mutex::new(BatchSummary::default());
    let threads = config.num_threads.clamp(1, urls.len().max(1));

    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::SeqCst);
                let Some(url) = urls.get(i) else { break };

                let result = exchange(&config.server, url, config.timeout());
                let mut summary = summary.lock().unwrap_or_else(|e| e.into_inner());
                summary.sent += 1;

                match result {
                    Ok(body) if body.is_empty() => {
                        summary.empty += 1;
                        println!("{}: ", url);
                    }
                    Ok(body) => {
                        summary.answered += 1;
                        println!("{}: {}", url, String::from_utf8_lossy(&body));
                    }
                    Err(e) => {
                        summary.errors += 1;
                        warn!(url = %url, error = %e, "request failed");
                    }
                }
            });
        }
    });

    let summary = summary.into_inner().unwrap_or_else(|e| e.into_inner());
    debug!(?summary, "batch finished");
    Ok(summary)
}
