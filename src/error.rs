//! # Errores fatales del servidor
//! src/error.rs
//!
//! Solo los errores que abortan el arranque o el master llegan hasta aquí.
//! Los errores por conexión ([`RequestError`](crate::http::RequestError)) y por
//! tarea ([`TaskError`](crate::jobs::TaskError)) se contienen en quien los detecta.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// No se pudo hacer bind (dirección en uso o inválida)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// No se pudo construir el cliente HTTP de los workers
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_message() {
        let err = ServerError::Bind {
            addr: "localhost:8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("localhost:8080"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn test_io_error_from() {
        let err: ServerError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
