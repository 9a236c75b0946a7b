//! # Cola FIFO de Tareas
//! src/jobs/queue.rs
//!
//! Cola thread-safe sin límite entre el accept loop (productor) y el pool
//! de workers (consumidores). Además de encolar y desencolar lleva la cuenta
//! de trabajos sin terminar, para que el apagado pueda esperar a que todo lo
//! encolado se procese antes de mandar las señales de terminación.

use crate::jobs::types::{Job, Task};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// La cola ya fue cerrada; se devuelve el trabajo rechazado
#[derive(Debug, Error)]
#[error("task queue is closed")]
pub struct QueueClosed<J>(pub J);

struct QueueState<J> {
    items: VecDeque<Task<J>>,

    /// Trabajos encolados cuyo `task_done` todavía no llegó
    unfinished: usize,

    /// Después de `close` no se acepta más trabajo
    closed: bool,
}

/// Cola FIFO thread-safe
pub struct TaskQueue<J = Job> {
    state: Arc<Mutex<QueueState<J>>>,

    /// Notifica a los workers cuando hay elementos
    available: Arc<Condvar>,

    /// Notifica a `join` cuando `unfinished` llega a cero
    all_done: Arc<Condvar>,
}

impl<J> TaskQueue<J> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
                closed: false,
            })),
            available: Arc::new(Condvar::new()),
            all_done: Arc::new(Condvar::new()),
        }
    }

    // Un holder que hizo panic no deja la cola inconsistente: cada mutación
    // se completa dentro de una sola sección crítica
    fn lock(&self) -> MutexGuard<'_, QueueState<J>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola un trabajo al final. Nunca bloquea; solo falla si la cola ya
    /// fue cerrada
    pub fn enqueue(&self, job: J) -> Result<(), QueueClosed<J>> {
        let mut state = self.lock();

        if state.closed {
            return Err(QueueClosed(job));
        }

        state.items.push_back(Task::Process(job));
        state.unfinished += 1;

        // Notificar a un worker esperando
        self.available.notify_one();

        Ok(())
    }

    /// Desencola el primer elemento
    ///
    /// Bloquea hasta que haya uno disponible
    pub fn dequeue(&self) -> Task<J> {
        let mut state = self.lock();

        loop {
            if let Some(task) = state.items.pop_front() {
                return task;
            }

            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marca como terminado un trabajo obtenido con `dequeue`
    pub fn task_done(&self) {
        let mut state = self.lock();

        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Bloquea hasta que cada trabajo encolado tenga su `task_done`
    pub fn join(&self) {
        let mut state = self.lock();

        while state.unfinished > 0 {
            state = self
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cierra la cola y encola exactamente una señal de terminación por worker.
    ///
    /// Las señales quedan detrás de todo lo ya encolado. Llamarla de nuevo
    /// no encola nada más; retorna si esta llamada fue la que cerró.
    pub fn close(&self, workers: usize) -> bool {
        let mut state = self.lock();

        if state.closed {
            return false;
        }

        state.closed = true;
        for _ in 0..workers {
            state.items.push_back(Task::Terminate);
        }

        self.available.notify_all();

        true
    }

    /// Elementos en la cola (incluye señales de terminación)
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trabajos encolados que aún no terminaron (en cola o en proceso)
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    /// Obtiene estadísticas de la cola
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();

        QueueStats {
            queued: state.items.iter().filter(|t| !t.is_terminate()).count(),
            unfinished: state.unfinished,
            closed: state.closed,
        }
    }
}

impl<J> Default for TaskQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> Clone for TaskQueue<J> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            available: Arc::clone(&self.available),
            all_done: Arc::clone(&self.all_done),
        }
    }
}

/// Estadísticas de la cola
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub queued: usize,
    pub unfinished: usize,
    pub closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn take(task: Task<u32>) -> u32 {
        match task {
            Task::Process(n) => n,
            Task::Terminate => panic!("unexpected terminate"),
        }
    }

    #[test]
    fn test_queue_fifo_ordering() {
        let queue = TaskQueue::new();

        queue.enqueue(1u32).unwrap();
        queue.enqueue(2).unwrap();
        queue.enqueue(3).unwrap();

        assert_eq!(take(queue.dequeue()), 1);
        assert_eq!(take(queue.dequeue()), 2);
        assert_eq!(take(queue.dequeue()), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || take(queue.dequeue()))
        };

        thread::sleep(Duration::from_millis(50));
        queue.enqueue(42).unwrap();

        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn test_close_enqueues_one_signal_per_worker() {
        let queue = TaskQueue::new();
        queue.enqueue(1u32).unwrap();

        assert!(queue.close(3));
        assert_eq!(queue.len(), 4);

        // Lo encolado antes sale primero
        assert_eq!(take(queue.dequeue()), 1);
        for _ in 0..3 {
            assert!(queue.dequeue().is_terminate());
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        assert!(queue.close(2));
        assert!(!queue.close(2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_enqueue_after_close_rejected() {
        let queue = TaskQueue::new();
        queue.close(1);

        let err = queue.enqueue(9u32).unwrap_err();
        assert_eq!(err.0, 9);
        assert_eq!(queue.unfinished(), 0);
        assert_eq!(queue.stats().queued, 0);
    }

    #[test]
    fn test_join_waits_for_task_done() {
        let queue = TaskQueue::new();
        queue.enqueue(1u32).unwrap();
        queue.enqueue(2).unwrap();
        assert_eq!(queue.unfinished(), 2);

        let finished = Arc::new(AtomicUsize::new(0));
        let worker = {
            let queue = queue.clone();
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                for _ in 0..2 {
                    take(queue.dequeue());
                    thread::sleep(Duration::from_millis(20));
                    finished.fetch_add(1, Ordering::SeqCst);
                    queue.task_done();
                }
            })
        };

        queue.join();
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(queue.unfinished(), 0);
        worker.join().unwrap();
    }

    #[test]
    fn test_join_on_empty_queue_returns() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        queue.join();
    }

    #[test]
    fn test_concurrent_consumers_never_share_items() {
        let queue = TaskQueue::new();
        for i in 0..200u32 {
            queue.enqueue(i).unwrap();
        }
        queue.close(4);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match queue.dequeue() {
                            Task::Process(n) => {
                                seen.push(n);
                                queue.task_done();
                            }
                            Task::Terminate => return seen,
                        }
                    }
                })
            })
            .collect();

        let mut all = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            for n in consumer.join().unwrap() {
                all.insert(n);
                total += 1;
            }
        }

        assert_eq!(total, 200);
        assert_eq!(all.len(), 200);
        assert_eq!(queue.unfinished(), 0);
    }

    #[test]
    fn test_stats() {
        let queue = TaskQueue::new();
        queue.enqueue(1u32).unwrap();
        queue.enqueue(2).unwrap();
        take(queue.dequeue());
        queue.close(2);

        let stats = queue.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.unfinished, 2);
        assert!(stats.closed);
    }
}
