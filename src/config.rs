//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./tcp_server --port 8080 \
//!   --max-threads 16 \
//!   --max-queued 64 \
//!   --thread-idle-ms 10000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! SERVER_PORT=8080 SERVER_HOST=0.0.0.0 RUST_LOG=debug ./tcp_server
//! ```

use crate::http::HttpParams;
use crate::server::DispatcherParams;
use clap::Parser;
use std::time::Duration;
use tracing::info;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "tcp_server")]
#[command(about = "Servidor TCP multi-thread con cola acotada y framing HTTP/1.1")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "SERVER_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "SERVER_HOST")]
    pub host: String,

    // === Dispatcher ===
    /// Máximo de threads worker
    #[arg(long = "max-threads", default_value = "16", env = "MAX_THREADS")]
    pub max_threads: usize,

    /// Máximo de conexiones esperando un worker
    #[arg(long = "max-queued", default_value = "64", env = "MAX_QUEUED")]
    pub max_queued: usize,

    /// Tiempo que un worker espera trabajo antes de terminar (ms)
    #[arg(long = "thread-idle-ms", default_value = "10000", env = "THREAD_IDLE_MS")]
    pub thread_idle_ms: u64,

    // === HTTP ===
    /// Permitir conexiones persistentes
    #[arg(long = "keep-alive", default_value = "true", env = "KEEP_ALIVE", action = clap::ArgAction::Set)]
    pub keep_alive: bool,

    /// Requests por conexión persistente (0 = sin límite)
    #[arg(long = "max-keep-alive-requests", default_value = "100", env = "MAX_KEEP_ALIVE_REQUESTS")]
    pub max_keep_alive_requests: usize,

    /// Tiempo máximo esperando datos del cliente (ms)
    #[arg(long = "keep-alive-timeout-ms", default_value = "5000", env = "KEEP_ALIVE_TIMEOUT_MS")]
    pub keep_alive_timeout_ms: u64,

    /// Tamaño máximo de un request en bytes
    #[arg(long = "max-request-bytes", default_value = "1048576", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    // === Observabilidad ===
    /// Cada cuántos segundos loguear las estadísticas (0 = nunca)
    #[arg(long = "stats-interval-secs", default_value = "0", env = "STATS_INTERVAL_SECS")]
    pub stats_interval_secs: u64,

    /// Filtro de logs si no hay `RUST_LOG` (ej: info, tcp_server=debug)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use tcp_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.max_threads == 0 {
            return Err("Max threads must be >= 1".to_string());
        }
        if self.max_queued == 0 {
            return Err("Max queued must be >= 1".to_string());
        }
        if self.thread_idle_ms == 0 {
            return Err("Thread idle time must be > 0".to_string());
        }
        if self.keep_alive_timeout_ms == 0 {
            return Err("Keep-alive timeout must be > 0".to_string());
        }
        if self.max_request_bytes == 0 {
            return Err("Max request bytes must be >= 1".to_string());
        }

        Ok(())
    }

    /// Parámetros del dispatcher
    pub fn dispatcher_params(&self) -> DispatcherParams {
        DispatcherParams::default()
            .with_max_threads(self.max_threads)
            .with_max_queued(self.max_queued)
            .with_thread_idle_time(Duration::from_millis(self.thread_idle_ms))
    }

    /// Parámetros de la capa HTTP
    pub fn http_params(&self) -> HttpParams {
        HttpParams {
            keep_alive: self.keep_alive,
            max_keep_alive_requests: self.max_keep_alive_requests,
            keep_alive_timeout: Duration::from_millis(self.keep_alive_timeout_ms),
            max_request_bytes: self.max_request_bytes,
        }
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            max_threads = self.max_threads,
            max_queued = self.max_queued,
            thread_idle_ms = self.thread_idle_ms,
            "dispatcher"
        );
        info!(
            keep_alive = self.keep_alive,
            max_keep_alive_requests = self.max_keep_alive_requests,
            keep_alive_timeout_ms = self.keep_alive_timeout_ms,
            max_request_bytes = self.max_request_bytes,
            "http"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            max_threads: 16,
            max_queued: 64,
            thread_idle_ms: 10_000,
            keep_alive: true,
            max_keep_alive_requests: 100,
            keep_alive_timeout_ms: 5_000,
            max_request_bytes: 1024 * 1024,
            stats_interval_secs: 0,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_threads, 16);
        assert_eq!(config.max_queued, 64);
        assert!(config.keep_alive);
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_max_threads() {
        let mut config = Config::default();
        config.max_threads = 0;
        assert!(config.validate().unwrap_err().contains("Max threads"));
    }

    #[test]
    fn test_validate_invalid_max_queued() {
        let mut config = Config::default();
        config.max_queued = 0;
        assert!(config.validate().unwrap_err().contains("Max queued"));
    }

    #[test]
    fn test_validate_invalid_idle_time() {
        let mut config = Config::default();
        config.thread_idle_ms = 0;
        assert!(config.validate().unwrap_err().contains("idle"));
    }

    #[test]
    fn test_validate_invalid_keep_alive_timeout() {
        let mut config = Config::default();
        config.keep_alive_timeout_ms = 0;
        assert!(config.validate().unwrap_err().contains("Keep-alive timeout"));
    }

    #[test]
    fn test_validate_invalid_max_request_bytes() {
        let mut config = Config::default();
        config.max_request_bytes = 0;
        assert!(config.validate().unwrap_err().contains("Max request bytes"));
    }

    // ==================== Conversions ====================

    #[test]
    fn test_dispatcher_params() {
        let mut config = Config::default();
        config.max_threads = 4;
        config.max_queued = 8;
        config.thread_idle_ms = 250;

        let params = config.dispatcher_params();
        assert_eq!(params.max_threads, 4);
        assert_eq!(params.max_queued, 8);
        assert_eq!(params.thread_idle_time, Duration::from_millis(250));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_http_params() {
        let mut config = Config::default();
        config.keep_alive = false;
        config.keep_alive_timeout_ms = 1500;

        let params = config.http_params();
        assert!(!params.keep_alive);
        assert_eq!(params.keep_alive_timeout, Duration::from_millis(1500));
        assert_eq!(params.max_request_bytes, config.max_request_bytes);
    }

    // ==================== CLI ====================

    #[test]
    fn test_parse_cli_args() {
        let config = Config::try_parse_from([
            "tcp_server",
            "--port",
            "9000",
            "--max-threads",
            "2",
            "--keep-alive",
            "false",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.max_threads, 2);
        assert!(!config.keep_alive);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Config::try_parse_from(["tcp_server", "--max-threads", "many"]).is_err());
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        Config::default().log_summary();
    }
}
