//! # Conexión de Cliente
//! src/server/connection.rs
//!
//! Envuelve el `TcpStream` aceptado por el master. Quien la posea la cierra
//! siempre: explícitamente con [`Connection::close`] o al salir de scope.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    closed: bool,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            closed: false,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Escribe el cuerpo completo de la respuesta
    pub fn respond(&mut self, body: &[u8]) -> io::Result<()> {
        self.stream.write_all(body)?;
        self.stream.flush()
    }

    /// Cierra ambos sentidos; el cliente ve EOF
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // El peer puede haberse ido ya; no hay nada más que hacer
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// El master solo lee (framing); nunca escribe en la conexión
impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}
