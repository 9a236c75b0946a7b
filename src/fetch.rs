//! # Descarga de Páginas
//! src/fetch.rs
//!
//! Colaborador que trae los bytes de una URL con un timeout acotado. Un
//! timeout se trata igual que cualquier otro fallo de descarga.

use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Colaborador que descarga el contenido de una URL
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Cliente HTTP bloqueante; un solo `Client` compartido por todos los workers
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        // Un status 4xx/5xx igual trae una página con texto; se cuenta
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| classify(url, e, false))?;

        let body = response.bytes().map_err(|e| classify(url, e, true))?;

        Ok(body.to_vec())
    }
}

fn classify(url: &Url, source: reqwest::Error, reading_body: bool) -> FetchError {
    let url = url.to_string();
    if source.is_timeout() {
        FetchError::Timeout { url }
    } else if reading_body {
        FetchError::Body { url, source }
    } else {
        FetchError::Network { url, source }
    }
}
