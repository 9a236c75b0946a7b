//! # Módulo HTTP
//!
//! Framing mínimo del protocolo de entrada. No es un servidor HTTP/1.1:
//! no hay keep-alive, chunked ni redirecciones. De cada conexión se lee
//! un único request:
//!
//! ```text
//! GET <url> HTTP/1.1\r\n
//! Host: <host>\r\n
//! Content-Type: text/plain; charset=utf-8\r\n
//! \r\n
//! ```
//!
//! La respuesta no lleva status line ni headers: es el JSON con las
//! palabras, y el fin de la respuesta lo marca el cierre de la conexión.

pub mod request;

// Permite usar `http::Request` en vez de `http::request::Request`
pub use request::{read_request, Request, RequestError};
