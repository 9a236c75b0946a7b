//! # Top-K Word Server
//! src/lib.rs
//!
//! Servidor TCP master/worker: cada cliente manda `GET <url> HTTP/1.1`, un
//! worker descarga la página, extrae el texto y responde con las K palabras
//! más frecuentes como objeto JSON antes de cerrar la conexión.
//!
//! ## Arquitectura
//!
//! - `config`: CLI y variables de entorno (servidor y cliente)
//! - `http`: framing y parsing del request
//! - `server`: master (accept loop), conexiones y señal de apagado
//! - `jobs`: cola FIFO de tareas y pool de workers
//! - `fetch`: colaborador que descarga una URL
//! - `text`: extracción de texto y conteo de frecuencias
//! - `metrics`: contador compartido de tareas y estadísticas
//! - `client`: cliente del protocolo y driver de carga
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use topk_server::config::Config;
//! use topk_server::server::Master;
//!
//! let master = Master::bind(Config::default()).expect("bind");
//! let handle = master.shutdown_handle();
//! ctrlc::set_handler(move || handle.shutdown()).expect("signal handler");
//! master.run().expect("master");
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod jobs;
pub mod metrics;
pub mod server;
pub mod text;
