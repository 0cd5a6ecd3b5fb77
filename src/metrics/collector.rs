//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas HTTP en tiempo real. Lo comparten todas las
//! conexiones (es `Clone` sobre un `Arc`).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Latencias que se guardan para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Rutas que aparecen en el snapshot
const TOP_PATHS: usize = 10;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
struct MetricsData {
    total_requests: u64,

    /// Requests por código de estado
    status_codes: BTreeMap<u16, u64>,

    /// Últimas latencias registradas (en microsegundos)
    latencies: VecDeque<u64>,

    requests_per_path: HashMap<String, u64>,

    /// Conexiones HTTP terminadas
    connections: u64,

    /// Requests atendidos sobre una conexión ya usada
    reused_requests: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                total_requests: 0,
                status_codes: BTreeMap::new(),
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                requests_per_path: HashMap::new(),
                connections: 0,
                reused_requests: 0,
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registra un request atendido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_path.entry(path.to_string()).or_insert(0) += 1;
    }

    /// Registra el cierre de una conexión que atendió `requests` requests
    pub fn record_connection(&self, requests: usize) {
        let mut data = self.lock();
        data.connections += 1;
        data.reused_requests += requests.saturating_sub(1) as u64;
    }

    pub fn total_requests(&self) -> u64 {
        self.lock().total_requests
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let latencies: Vec<u64> = data.latencies.iter().copied().collect();
        let (p50, p95, p99, avg) = calculate_percentiles(&latencies);

        let mut paths: Vec<_> = data.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths = paths
            .into_iter()
            .take(TOP_PATHS)
            .map(|(path, count)| PathCount {
                path: path.clone(),
                count: *count,
            })
            .collect();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: data.total_requests,
            connections: data.connections,
            reused_requests: data.reused_requests,
            status_codes: data.status_codes.clone(),
            top_paths,
            latency_us: LatencySummary {
                p50,
                p95,
                p99,
                avg,
                stddev: calculate_stddev(&latencies, avg),
                samples: latencies.len(),
            },
        }
    }

    /// Snapshot serializado como JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calcula p50, p95, p99 y promedio
fn calculate_percentiles(latencies: &[u64]) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

fn calculate_stddev(latencies: &[u64], avg: u64) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }

    let variance = latencies
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / latencies.len() as f64;

    variance.sqrt()
}

/// Snapshot de métricas, es lo que sirve `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub connections: u64,
    pub reused_requests: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_paths: Vec<PathCount>,
    pub latency_us: LatencySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}
