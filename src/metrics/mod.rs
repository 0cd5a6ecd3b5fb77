//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Métricas de la capa HTTP:
//! - Contadores de requests por ruta y por código de estado
//! - Latencias (p50, p95, p99)
//! - Conexiones cerradas y requests sobre conexiones reutilizadas
//!
//! Las métricas del dispatcher (threads, cola, rechazos) salen de
//! `DispatcherStats`.

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
