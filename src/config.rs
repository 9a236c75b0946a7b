//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor master/worker y del
//! cliente de carga, con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./topk-server --num-workers 4 --top-k 20 --fetch-timeout-ms 3000
//! ./topk-client 8 urls.txt
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! TOPK_PORT=9090 TOPK_WORKERS=8 ./topk-server
//! ```

use clap::Parser;
use std::time::Duration;

/// User-Agent de navegador de escritorio; muchos sitios rechazan clientes sin él.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "topk-server")]
#[command(about = "Servidor master/worker que devuelve las K palabras más frecuentes de una URL")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "localhost", env = "TOPK_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "TOPK_PORT")]
    pub port: u16,

    // === Workers ===

    /// Número de workers del pool (fijo durante toda la vida del master)
    #[arg(short = 'w', long = "num-workers", default_value = "1", env = "TOPK_WORKERS")]
    pub num_workers: usize,

    /// Cantidad de palabras a devolver
    #[arg(short = 'k', long = "top-k", default_value = "10", env = "TOPK_K")]
    pub top_k: usize,

    // === Timeouts ===

    /// Timeout de descarga de cada URL en milisegundos
    #[arg(long = "fetch-timeout-ms", default_value = "5000", env = "FETCH_TIMEOUT_MS")]
    pub fetch_timeout_ms: u64,

    /// Tiempo máximo para leer el request de una conexión, en milisegundos.
    ///
    /// El master lee cada request en el accept loop: un cliente que conecta
    /// y no manda nada frena las demás conexiones (y un apagado pendiente)
    /// hasta este tiempo.
    #[arg(long = "read-timeout-ms", default_value = "1000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Máximo de bytes que se leen buscando el fin del request
    #[arg(long = "max-request-bytes", default_value = "8192", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Intervalo con el que el accept loop revisa si se pidió el apagado
    #[arg(long = "accept-poll-ms", default_value = "50", env = "ACCEPT_POLL_MS")]
    pub accept_poll_ms: u64,

    /// User-Agent usado al descargar páginas
    #[arg(long = "user-agent", default_value = DEFAULT_USER_AGENT, env = "FETCH_USER_AGENT")]
    pub user_agent: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use topk_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "localhost:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.num_workers == 0 {
            return Err("Number of workers must be >= 1".to_string());
        }
        if self.top_k == 0 {
            return Err("Top-k must be >= 1".to_string());
        }

        // Validar timeouts
        if self.fetch_timeout_ms == 0 {
            return Err("Fetch timeout must be > 0".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        if self.accept_poll_ms == 0 {
            return Err("Accept poll interval must be > 0".to_string());
        }

        // "GET / HTTP/1.0\r\n" ya ocupa 16 bytes
        if self.max_request_bytes < 16 {
            return Err("Max request bytes must be >= 16".to_string());
        }

        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            num_workers: 1,
            top_k: 10,
            fetch_timeout_ms: 5_000,
            read_timeout_ms: 1_000,
            max_request_bytes: 8192,
            accept_poll_ms: 50,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Configuración del cliente de carga (`topk-client`)
#[derive(Debug, Clone, Parser)]
#[command(name = "topk-client")]
#[command(about = "Envía las URLs de un archivo al servidor usando varios threads")]
#[command(version = "0.1.0")]
pub struct ClientConfig {
    /// Número de threads que envían requests en paralelo
    pub num_threads: usize,

    /// Archivo con una URL por línea
    pub file_name: String,

    /// Dirección del servidor
    #[arg(long, default_value = "localhost:8080", env = "TOPK_SERVER")]
    pub server: String,

    /// Timeout de lectura de cada respuesta en milisegundos
    #[arg(long = "timeout-ms", default_value = "30000", env = "TOPK_CLIENT_TIMEOUT_MS")]
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.num_threads == 0 {
            return Err("Number of threads must be >= 1".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Client timeout must be > 0".to_string());
        }
        Ok(())
    }
}
