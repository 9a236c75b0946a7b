//! # Señal de Apagado
//! src/server/shutdown.rs
//!
//! Bandera compartida entre el master y quien quiera detenerlo (el handler
//! de Ctrl+C, un test). El master la revisa entre intentos de `accept`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pide al master que deje de aceptar conexiones. Idempotente.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_clear() {
        assert!(!ShutdownHandle::new().is_shutdown_requested());
    }

    #[test]
    fn test_clones_share_flag() {
        let handle = ShutdownHandle::new();
        let other = handle.clone();

        thread::spawn(move || other.shutdown()).join().unwrap();

        assert!(handle.is_shutdown_requested());
        handle.shutdown();
        assert!(handle.is_shutdown_requested());
    }
}
