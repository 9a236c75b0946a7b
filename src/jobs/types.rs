//! # Tipos del Sistema de Tareas
//! src/jobs/types.rs
//!
//! Define la unidad de trabajo que el master entrega a los workers y el
//! resultado que cada worker reporta.

use crate::http::Request;
use crate::server::Connection;
use std::time::{Duration, Instant};

/// Una unidad de trabajo: el request enmarcado y la conexión que debe
/// recibir la respuesta. Inmutable una vez creada; se consume una sola vez.
#[derive(Debug)]
pub struct Job {
    /// ID secuencial asignado por el master
    id: u64,

    request: Request,

    /// Dueño exclusivo del socket del cliente
    connection: Connection,

    /// Momento en que el master la encoló
    enqueued_at: Instant,
}

impl Job {
    pub fn new(id: u64, request: Request, connection: Connection) -> Self {
        Self {
            id,
            request,
            connection,
            enqueued_at: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Tiempo que lleva esperando en la cola
    pub fn queued_for(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Separa la tarea en sus partes para procesarla
    pub fn into_parts(self) -> (Request, Connection) {
        (self.request, self.connection)
    }
}

/// Elemento de la cola: trabajo normal o señal de terminación.
///
/// `Terminate` no lleva request ni conexión; cada worker que la recibe
/// sale de su loop para siempre.
#[derive(Debug)]
pub enum Task<J = Job> {
    Process(J),
    Terminate,
}

impl<J> Task<J> {
    pub fn is_terminate(&self) -> bool {
        matches!(self, Task::Terminate)
    }
}

/// Resultado de un ciclo de worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Se escribió el JSON con `words` entradas y se cerró la conexión
    Responded { words: usize },

    /// Se cerró la conexión sin escribir nada
    Failed { kind: &'static str },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Responded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_terminate() {
        let task: Task<u32> = Task::Terminate;
        assert!(task.is_terminate());
        assert!(!Task::Process(7u32).is_terminate());
    }

    #[test]
    fn test_outcome_success() {
        assert!(TaskOutcome::Responded { words: 0 }.is_success());
        assert!(!TaskOutcome::Failed { kind: "fetch" }.is_success());
    }
}
