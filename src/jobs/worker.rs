//! # Workers
//! src/jobs/worker.rs
//!
//! Cada worker es un thread de larga vida que toma una tarea a la vez de la
//! cola compartida y recorre:
//!
//! ```text
//! Idle → Fetching → Extracting → Counting → Responding → Idle
//!   └──(señal de terminación)──→ Stopped
//! ```
//!
//! Ninguna tarea se reintenta. Un fallo cierra la conexión sin escribir
//! nada y el worker sigue con la siguiente; solo `Task::Terminate` termina
//! el loop.

use crate::error::ServerError;
use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, RequestError};
use crate::jobs::queue::TaskQueue;
use crate::jobs::types::{Job, Task, TaskOutcome};
use crate::metrics::MetricsCollector;
use crate::server::Connection;
use crate::text::{top_k_words, TextExtractor};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Por qué falló un ciclo de worker
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] RequestError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write response: {0}")]
    Respond(#[source] io::Error),

    #[error("worker panicked while processing: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Etiqueta corta para logs y métricas
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::MalformedRequest(_) => "malformed_request",
            TaskError::Fetch(e) if e.is_timeout() => "fetch_timeout",
            TaskError::Fetch(_) => "fetch",
            TaskError::Serialize(_) => "serialize",
            TaskError::Respond(_) => "respond",
            TaskError::Panicked(_) => "panic",
        }
    }
}

/// Estado del worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Extracting,
    Counting,
    Responding,
    Stopped,
}

/// Todo lo que un worker comparte con el master y con los demás workers
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: TaskQueue,
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn TextExtractor>,
    pub metrics: MetricsCollector,
    pub top_k: usize,
    pub fetch_timeout: Duration,
}

pub struct Worker {
    id: usize,
    ctx: WorkerContext,
    state: WorkerState,
}

impl Worker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        Self {
            id,
            ctx,
            state: WorkerState::Idle,
        }
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = self.id, from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    /// Loop principal del worker. Retorna cuántas tareas procesó.
    pub fn run(&mut self) -> u64 {
        info!(worker = self.id, "worker started");

        let mut handled = 0;

        loop {
            // Esperar por una tarea
            match self.ctx.queue.dequeue() {
                Task::Terminate => {
                    self.transition(WorkerState::Stopped);
                    break;
                }
                Task::Process(job) => {
                    self.handle(job);
                    handled += 1;
                }
            }
        }

        info!(worker = self.id, handled, "worker stopped");
        handled
    }

    /// Procesa una tarea completa: siempre cierra la conexión, siempre
    /// incrementa el contador y siempre marca la tarea como terminada
    fn handle(&mut self, job: Job) {
        let started = Instant::now();
        let job_id = job.id();
        debug!(worker = self.id, job = job_id, queued_ms = job.queued_for().as_millis() as u64, "picked up task");

        let (request, mut connection) = job.into_parts();
        let peer = connection.peer();

        let result = self.process(&request, &mut connection);

        // Éxito o fallo: la conexión se cierra aquí
        connection.close();

        let outcome = match &result {
            Ok(words) => TaskOutcome::Responded { words: *words },
            Err(e) => TaskOutcome::Failed { kind: e.kind() },
        };

        let processed = self.ctx.metrics.record_task(self.id, &outcome, started.elapsed());

        match result {
            Ok(words) => info!(
                worker = self.id,
                job = job_id,
                url = request.target(),
                words,
                processed,
                "Processed by Worker {}: {}",
                self.id,
                processed
            ),
            Err(e) => warn!(
                worker = self.id,
                job = job_id,
                url = request.target(),
                %peer,
                kind = e.kind(),
                error = %e,
                processed,
                "task failed, connection closed without response"
            ),
        }

        self.ctx.queue.task_done();
        self.transition(WorkerState::Idle);
    }

    /// Pasos 2 a 5 del ciclo. Un panic dentro de los colaboradores se
    /// convierte en error para que el loop no muera.
    fn process(&mut self, request: &Request, connection: &mut Connection) -> Result<usize, TaskError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.fetch_count_respond(request, connection)))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))))
    }

    fn fetch_count_respond(&mut self, request: &Request, connection: &mut Connection) -> Result<usize, TaskError> {
        let url = request.target_url()?;

        self.transition(WorkerState::Fetching);
        let bytes = self.ctx.fetcher.fetch(&url, self.ctx.fetch_timeout)?;

        self.transition(WorkerState::Extracting);
        let text = self.ctx.extractor.extract_text(&bytes);

        self.transition(WorkerState::Counting);
        let counts = top_k_words(&text, self.ctx.top_k);
        let body = counts.to_json_bytes()?;

        self.transition(WorkerState::Responding);
        connection.respond(&body).map_err(TaskError::Respond)?;

        Ok(counts.len())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Pool de tamaño fijo; el tamaño no cambia durante la vida del master
pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<u64>)>,
}

impl WorkerPool {
    /// Lanza `size` workers (IDs desde 1) que comparten `ctx`
    pub fn spawn(size: usize, ctx: WorkerContext) -> Result<Self, ServerError> {
        let mut handles = Vec::with_capacity(size);

        for id in 1..=size {
            let mut worker = Worker::new(id, ctx.clone());
            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker.run())
                .map_err(ServerError::Spawn)?;
            handles.push((id, handle));
        }

        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Workers cuyo thread sigue vivo
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|(_, h)| !h.is_finished()).count()
    }

    /// Espera a que todos los workers salgan; retorna el total de tareas
    /// que procesaron
    pub fn join(self) -> u64 {
        let mut total = 0;

        for (id, handle) in self.handles {
            match handle.join() {
                Ok(handled) => total += handled,
                Err(payload) => error!(
                    worker = id,
                    panic = %panic_message(payload.as_ref()),
                    "worker thread panicked"
                ),
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::HtmlTextExtractor;
    use std::io::Read;
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Fetcher de prueba: "fail" en la URL → error, "boom" → panic
    struct StubFetcher {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, url: &Url, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.path().contains("boom") {
                panic!("collaborator exploded");
            }
            if url.path().contains("fail") {
                return Err(FetchError::Timeout { url: url.to_string() });
            }
            Ok(self.body.as_bytes().to_vec())
        }
    }

    fn context(fetcher: Arc<StubFetcher>, top_k: usize) -> WorkerContext {
        WorkerContext {
            queue: TaskQueue::new(),
            fetcher,
            extractor: Arc::new(HtmlTextExtractor),
            metrics: MetricsCollector::new(),
            top_k,
            fetch_timeout: Duration::from_secs(1),
        }
    }

    /// Crea un job cuya conexión está unida a un cliente de prueba
    fn job(id: u64, target: &str) -> (Job, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();

        let raw = format!("GET {} HTTP/1.1\r\nHost: x\r\n\r\n", target);
        let request = Request::parse(raw.as_bytes()).unwrap();

        (Job::new(id, request, Connection::new(server, peer)), client)
    }

    fn read_all(mut client: TcpStream) -> String {
        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_worker_scenario_response() {
        let fetcher = StubFetcher::new("the cat sat on the mat the cat ran");
        let ctx = context(fetcher.clone(), 2);

        let (job, client) = job(1, "http://example.test/a");
        ctx.queue.enqueue(job).unwrap();
        ctx.queue.close(1);

        let mut worker = Worker::new(1, ctx.clone());
        assert_eq!(worker.run(), 1);

        assert_eq!(read_all(client), r#"{"the": 3, "cat": 2}"#);
        assert_eq!(ctx.metrics.processed(), 1);
        assert_eq!(ctx.queue.unfinished(), 0);
    }

    #[test]
    fn test_fetch_failure_closes_without_bytes() {
        let fetcher = StubFetcher::new("unused");
        let ctx = context(fetcher.clone(), 10);

        let (job, client) = job(1, "http://example.test/fail");
        ctx.queue.enqueue(job).unwrap();
        ctx.queue.close(1);

        Worker::new(7, ctx.clone()).run();

        assert_eq!(read_all(client), "");
        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.failures_by_kind.get("fetch_timeout"), Some(&1));
        assert_eq!(snapshot.tasks_per_worker.get(&7), Some(&1));
    }

    #[test]
    fn test_invalid_url_skips_fetch() {
        let fetcher = StubFetcher::new("unused");
        let ctx = context(fetcher.clone(), 10);

        let (job, client) = job(1, "/relative/path");
        ctx.queue.enqueue(job).unwrap();
        ctx.queue.close(1);

        Worker::new(1, ctx.clone()).run();

        assert_eq!(read_all(client), "");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.metrics.snapshot().failures_by_kind.get("malformed_request"), Some(&1));
    }

    #[test]
    fn test_panic_in_collaborator_does_not_kill_loop() {
        let fetcher = StubFetcher::new("hello hello world");
        let ctx = context(fetcher.clone(), 10);

        let (boom, boom_client) = job(1, "http://example.test/boom");
        let (ok, ok_client) = job(2, "http://example.test/ok");
        ctx.queue.enqueue(boom).unwrap();
        ctx.queue.enqueue(ok).unwrap();
        ctx.queue.close(1);

        let mut worker = Worker::new(1, ctx.clone());
        assert_eq!(worker.run(), 2);

        assert_eq!(read_all(boom_client), "");
        assert_eq!(read_all(ok_client), r#"{"hello": 2, "world": 1}"#);
        assert_eq!(ctx.metrics.processed(), 2);
    }

    #[test]
    fn test_empty_page_gives_empty_mapping() {
        let fetcher = StubFetcher::new("<html><body>123 456</body></html>");
        let ctx = context(fetcher, 10);

        let (job, client) = job(1, "http://example.test/");
        ctx.queue.enqueue(job).unwrap();
        ctx.queue.close(1);
        Worker::new(1, ctx).run();

        assert_eq!(read_all(client), "{}");
    }

    #[test]
    fn test_pool_processes_each_task_once() {
        let fetcher = StubFetcher::new("alpha beta alpha");
        let ctx = context(fetcher.clone(), 10);

        let pool = WorkerPool::spawn(3, ctx.clone()).unwrap();
        assert_eq!(pool.size(), 3);

        let clients: Vec<TcpStream> = (0..10)
            .map(|i| {
                let (job, client) = job(i, "http://example.test/page");
                ctx.queue.enqueue(job).unwrap();
                client
            })
            .collect();

        ctx.queue.join();
        assert!(ctx.queue.close(pool.live()));
        assert_eq!(pool.join(), 10);

        for client in clients {
            assert_eq!(read_all(client), r#"{"alpha": 2, "beta": 1}"#);
        }
        assert_eq!(ctx.metrics.processed(), 10);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_error_kinds() {
        let timeout = TaskError::Fetch(FetchError::Timeout { url: "u".into() });
        assert_eq!(timeout.kind(), "fetch_timeout");
        assert_eq!(TaskError::MalformedRequest(RequestError::Empty).kind(), "malformed_request");
        assert_eq!(TaskError::Panicked("x".into()).kind(), "panic");
    }
}
