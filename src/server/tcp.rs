//! # Master
//! src/server/tcp.rs
//!
//! Dueño del listener. Acepta conexiones, lee y parsea cada request y lo
//! encola como tarea para el pool de workers. Un request mal formado se
//! cierra aquí mismo sin respuesta y nunca llega a la cola.
//!
//! ## Apagado
//!
//! 1. Alguien llama [`ShutdownHandle::shutdown`]
//! 2. El accept loop sale en el siguiente intervalo de polling
//! 3. Se espera a que la cola se vacíe (cada tarea con su `task_done`)
//! 4. Se encola una señal de terminación por worker vivo
//! 5. Se hace join de los workers y recién entonces se libera el listener

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::http::{read_request, Request, RequestError};
use crate::jobs::{Job, TaskQueue, WorkerContext, WorkerPool};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::server::{Connection, ShutdownHandle};
use crate::text::{HtmlTextExtractor, TextExtractor};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

pub struct Master {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    queue: TaskQueue,
    pool: WorkerPool,
    metrics: MetricsCollector,
    shutdown: ShutdownHandle,
    next_job_id: u64,
}

impl Master {
    /// Bind con los colaboradores de producción (reqwest + scraper)
    pub fn bind(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Self::bind_with(config, Arc::new(fetcher), Arc::new(HtmlTextExtractor))
    }

    /// Bind con colaboradores inyectados; lanza el pool antes de retornar
    pub fn bind_with(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        config.validate().map_err(ServerError::InvalidConfig)?;

        let address = config.address();
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            addr: address.clone(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        // Accept no bloqueante: el loop puede revisar la señal de apagado
        listener.set_nonblocking(true)?;

        let queue = TaskQueue::new();
        let metrics = MetricsCollector::new();

        let ctx = WorkerContext {
            queue: queue.clone(),
            fetcher,
            extractor,
            metrics: metrics.clone(),
            top_k: config.top_k,
            fetch_timeout: config.fetch_timeout(),
        };
        let pool = WorkerPool::spawn(config.num_workers, ctx)?;

        info!(
            addr = %local_addr,
            workers = config.num_workers,
            top_k = config.top_k,
            fetch_timeout_ms = config.fetch_timeout_ms,
            "master listening"
        );

        Ok(Self {
            config,
            listener,
            local_addr,
            queue,
            pool,
            metrics,
            shutdown: ShutdownHandle::new(),
            next_job_id: 0,
        })
    }

    /// Bind + run con colaboradores de producción. Bloquea hasta que
    /// alguien llame `shutdown.shutdown()`.
    pub fn start(config: Config, shutdown: ShutdownHandle) -> Result<MetricsSnapshot> {
        let mut master = Self::bind(config)?;
        master.shutdown = shutdown;
        master.run()
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Accept loop. Al pedirse el apagado drena la cola, detiene los
    /// workers y retorna las métricas finales.
    pub fn run(mut self) -> Result<MetricsSnapshot> {
        let poll = self.config.accept_poll_interval();

        while !self.shutdown.is_shutdown_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    self.handle_connection(stream, peer);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(poll);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Errores por conexión (p. ej. ECONNABORTED) no detienen al master
                    error!(error = %e, "accept failed");
                    thread::sleep(poll);
                }
            }
        }

        info!("shutdown requested, no longer accepting connections");

        Ok(self.shutdown())
    }

    /// Enmarca el request y lo encola; si no es válido, cierra sin responder
    fn handle_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        let mut connection = match self.prepare(stream, peer) {
            Ok(connection) => connection,
            Err(e) => {
                warn!(%peer, error = %e, "failed to configure connection");
                return;
            }
        };

        let request = read_request(&mut connection, self.config.max_request_bytes)
            .and_then(|raw| Request::parse(&raw));

        match request {
            Ok(request) => self.dispatch(request, connection),
            Err(e) => self.reject(connection, e),
        }
    }

    fn prepare(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<Connection> {
        // Algunas plataformas heredan el modo no bloqueante del listener
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.config.read_timeout()))?;
        stream.set_write_timeout(Some(self.config.read_timeout()))?;
        Ok(Connection::new(stream, peer))
    }

    fn dispatch(&mut self, request: Request, connection: Connection) {
        self.next_job_id += 1;
        let id = self.next_job_id;
        let url = request.target().to_string();
        debug!(
            job = id,
            version = request.version(),
            host = request.header("Host").unwrap_or("-"),
            "request framed"
        );

        match self.queue.enqueue(Job::new(id, request, connection)) {
            Ok(()) => {
                let enqueued = self.metrics.record_enqueued();
                debug!(job = id, url = %url, enqueued, queued = self.queue.len(), "task enqueued");
            }
            Err(closed) => {
                // La conexión se cierra al soltar el job rechazado
                warn!(job = id, url = %url, error = %closed, "dropping task");
                self.metrics.record_rejected();
            }
        }
    }

    fn reject(&self, connection: Connection, e: RequestError) {
        let rejected = self.metrics.record_rejected();
        warn!(peer = %connection.peer(), error = %e, rejected, "malformed request, closing connection");
        connection.close();
    }

    /// Drena la cola, manda una señal de terminación por worker, hace join
    /// del pool y libera el listener
    pub fn shutdown(self) -> MetricsSnapshot {
        let Master {
            listener,
            queue,
            pool,
            metrics,
            ..
        } = self;

        let pending = queue.stats();
        info!(queued = pending.queued, unfinished = pending.unfinished, "draining task queue");
        queue.join();

        let live = pool.live();
        if live < pool.size() {
            warn!(live, size = pool.size(), "some workers exited early");
        }
        queue.close(live);

        let handled = pool.join();
        drop(listener);

        let snapshot = metrics.snapshot();
        match metrics.summary_json() {
            Ok(summary) => info!(handled, summary = %summary, "master stopped"),
            Err(e) => info!(handled, processed = snapshot.processed, error = %e, "master stopped"),
        }

        snapshot
    }
}
