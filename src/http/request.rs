//! # Framing y Parsing de Requests
//! src/http/request.rs
//!
//! El master lee una conexión hasta ver el terminador `\r\n\r\n` (o hasta
//! agotar el límite de bytes / tiempo) y parsea el resultado.
//!
//! ## Formato esperado
//!
//! ```text
//! GET http://example.test/a HTTP/1.1\r\n
//! Host: localhost\r\n
//! Content-Type: text/plain; charset=utf-8\r\n
//! \r\n
//! ```
//!
//! Solo el token entre `GET ` y ` HTTP` tiene significado; el resto de
//! headers se guarda pero nadie lo usa.

use std::collections::HashMap;
use std::io::{self, Read};
use thiserror::Error;
use url::Url;

/// Fin de la sección de headers
const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Tamaño de cada lectura del socket
const CHUNK_SIZE: usize = 1024;

/// Errores de un request malformado o ilegible (MalformedRequestError)
#[derive(Debug, Error)]
pub enum RequestError {
    /// La conexión se cerró (o expiró) sin mandar nada
    #[error("empty request")]
    Empty,

    #[error("request is not valid UTF-8")]
    InvalidUtf8,

    /// No llegó una request line completa
    #[error("incomplete request")]
    IncompleteRequest,

    #[error("invalid request line: {0}")]
    InvalidRequestLine(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),
}

/// Request ya enmarcado y parseado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Token que sigue a `GET ` (la URL a descargar)
    target: String,

    /// Versión HTTP (`HTTP/1.0` o `HTTP/1.1`)
    version: String,

    /// Headers (ignorados por el core)
    headers: HashMap<String, String>,
}

/// Lee bytes de `stream` hasta encontrar el terminador, el EOF o `max_bytes`.
///
/// Un timeout de lectura (configurado en el socket) cuenta como techo de
/// tiempo: se devuelve lo leído hasta ese momento.
pub fn read_request<R: Read>(stream: &mut R, max_bytes: usize) -> Result<Vec<u8>, RequestError> {
    let mut buffer = Vec::with_capacity(CHUNK_SIZE.min(max_bytes));
    let mut chunk = [0u8; CHUNK_SIZE];

    while buffer.len() < max_bytes {
        let want = CHUNK_SIZE.min(max_bytes - buffer.len());
        match stream.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => {
                // El terminador puede quedar partido entre dos lecturas
                let scan_from = buffer.len().saturating_sub(TERMINATOR.len() - 1);
                buffer.extend_from_slice(&chunk[..n]);
                if contains_terminator(&buffer[scan_from..]) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(RequestError::Read(e)),
        }
    }

    if buffer.is_empty() {
        return Err(RequestError::Empty);
    }

    Ok(buffer)
}

fn contains_terminator(bytes: &[u8]) -> bool {
    bytes.windows(TERMINATOR.len()).any(|w| w == TERMINATOR)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

impl Request {
    /// Parsea un request desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use topk_server::http::Request;
    ///
    /// let raw = b"GET http://example.test/a HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.target(), "http://example.test/a");
    /// assert_eq!(request.header("Host"), Some("x"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, RequestError> {
        let request_str = std::str::from_utf8(buffer).map_err(|_| RequestError::InvalidUtf8)?;

        if request_str.trim().is_empty() {
            return Err(RequestError::Empty);
        }

        // La request line debe estar terminada; una línea cortada por el
        // límite de bytes no se adivina
        let Some((request_line, rest)) = request_str.split_once("\r\n") else {
            return Err(RequestError::IncompleteRequest);
        };

        let (target, version) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(rest);

        Ok(Request {
            target,
            version,
            headers,
        })
    }

    /// Formato: `GET <url> HTTP/<versión>`
    fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Exactamente un token de URL entre el método y la versión
        if parts.len() != 3 {
            return Err(RequestError::InvalidRequestLine(line.to_string()));
        }

        if parts[0] != "GET" {
            return Err(RequestError::UnsupportedMethod(parts[0].to_string()));
        }

        // Cualquier versión HTTP/x sirve; solo importa el token de URL
        let version = parts[2];
        if !version.starts_with("HTTP/") {
            return Err(RequestError::InvalidHttpVersion(version.to_string()));
        }

        Ok((parts[1].to_string(), version.to_string()))
    }

    /// Cada header tiene formato "Name: Value". Solo se consideran líneas
    /// completas; un fragmento final sin `\r\n` se descarta. Las líneas
    /// sin `:` se ignoran: los headers no afectan el resultado.
    fn parse_headers(rest: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        let mut lines: Vec<&str> = rest.split("\r\n").collect();
        // Lo que quede después del último \r\n no es una línea completa
        lines.pop();

        for line in lines {
            if line.is_empty() {
                break;
            }

            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        headers
    }

    /// Token de URL tal como llegó
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Parsea el target como URL absoluta `http`/`https`
    pub fn target_url(&self) -> Result<Url, RequestError> {
        let url = Url::parse(&self.target).map_err(|e| RequestError::InvalidUrl {
            url: self.target.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(RequestError::InvalidUrl {
                url: self.target.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }
}
