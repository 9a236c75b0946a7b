//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo mantiene el contador compartido de tareas procesadas y
//! estadísticas para observabilidad:
//! - Tareas exitosas / fallidas (por tipo de error)
//! - Requests rechazados por el master
//! - Tareas por worker
//! - Latencias (p50, p95, p99)
//!
//! Nada aquí participa en decisiones de control.

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
