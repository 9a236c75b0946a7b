//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contador compartido de tareas procesadas más estadísticas por resultado.
//! Todo vive detrás de un único `Mutex`: incrementar y leer el contador es
//! una sola operación indivisible.

use crate::jobs::TaskOutcome;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Latencias guardadas para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    /// Contador compartido: tareas completadas o intentadas
    processed: u64,

    succeeded: u64,
    failed: u64,

    /// Tareas que el master entregó a la cola
    enqueued: u64,

    /// Requests malformados que el master cerró sin crear tarea
    rejected: u64,

    failures_by_kind: BTreeMap<&'static str, u64>,

    tasks_per_worker: BTreeMap<usize, u64>,

    /// Latencias de las últimas tareas (en microsegundos)
    latencies: VecDeque<u64>,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra el fin de una tarea y retorna el nuevo valor del contador
    pub fn record_task(&self, worker: usize, outcome: &TaskOutcome, latency: Duration) -> u64 {
        let mut data = self.lock();

        data.processed += 1;

        if outcome.is_success() {
            data.succeeded += 1;
        } else {
            data.failed += 1;
        }
        if let TaskOutcome::Failed { kind } = outcome {
            *data.failures_by_kind.entry(*kind).or_insert(0) += 1;
        }

        *data.tasks_per_worker.entry(worker).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        data.processed
    }

    /// Registra una tarea entregada a la cola
    pub fn record_enqueued(&self) -> u64 {
        let mut data = self.lock();
        data.enqueued += 1;
        data.enqueued
    }

    /// Registra un request rechazado por el master
    pub fn record_rejected(&self) -> u64 {
        let mut data = self.lock();
        data.rejected += 1;
        data.rejected
    }

    /// Valor actual del contador compartido
    pub fn processed(&self) -> u64 {
        self.lock().processed
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let (p50, p95, p99, avg) = calculate_percentiles(&data.latencies);

        MetricsSnapshot {
            processed: data.processed,
            succeeded: data.succeeded,
            failed: data.failed,
            enqueued: data.enqueued,
            rejected: data.rejected,
            uptime_secs: self.start_time.elapsed().as_secs(),
            failures_by_kind: data
                .failures_by_kind
                .iter()
                .map(|(kind, count)| (kind.to_string(), *count))
                .collect(),
            tasks_per_worker: data.tasks_per_worker.clone(),
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
        }
    }

    /// Snapshot en JSON para el log de apagado
    pub fn summary_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }
}

/// Calcula percentiles de latencia
fn calculate_percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];

    let sum: u64 = sorted.iter().sum();
    let avg = sum / len as u64;

    (p50, p95, p99, avg)
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub enqueued: u64,
    pub rejected: u64,
    pub uptime_secs: u64,
    pub failures_by_kind: BTreeMap<String, u64>,
    pub tasks_per_worker: BTreeMap<usize, u64>,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
}
