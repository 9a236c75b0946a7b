//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! El master escucha en un puerto, acepta conexiones, enmarca cada request
//! y lo encola como tarea. Nunca escribe respuestas: eso es de los workers.

pub mod connection;
pub mod shutdown;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::Connection;
pub use shutdown::ShutdownHandle;
pub use tcp::Master;
