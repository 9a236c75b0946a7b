//! # Sistema de Tareas
//!
//! Cola FIFO compartida entre el master (productor) y un pool fijo de
//! workers (consumidores).
//!
//! ## Ciclo de una tarea
//!
//! 1. El master acepta la conexión, enmarca el request y encola un [`Job`]
//! 2. Un worker la toma, descarga la URL, cuenta palabras y responde
//! 3. El worker cierra la conexión, incrementa el contador y marca la tarea
//!    como terminada
//!
//! Al apagar se encola exactamente una [`Task::Terminate`] por worker.

pub mod queue;
pub mod types;
pub mod worker;

pub use queue::{QueueClosed, QueueStats, TaskQueue};
pub use types::{Job, Task, TaskOutcome};
pub use worker::{TaskError, Worker, WorkerContext, WorkerPool, WorkerState};
