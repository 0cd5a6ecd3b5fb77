//! # Parámetros del Dispatcher
//! src/server/params.rs

use crate::error::{Result, ServerError};
use std::time::Duration;

/// Tamaño del pool y de la cola del dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherParams {
    /// Máximo de workers vivos al mismo tiempo
    pub max_threads: usize,

    /// Máximo de conexiones esperando en la cola
    pub max_queued: usize,

    /// Tiempo que un worker espera trabajo antes de revisar si debe terminar
    pub thread_idle_time: Duration,

    /// Prefijo del nombre de los threads de los workers
    pub thread_name: String,

    /// Tamaño del stack de cada worker (`None` = el del sistema)
    pub thread_stack_size: Option<usize>,
}

impl Default for DispatcherParams {
    fn default() -> Self {
        Self {
            max_threads: 16,
            max_queued: 64,
            thread_idle_time: Duration::from_secs(10),
            thread_name: "tcp-worker".to_string(),
            thread_stack_size: None,
        }
    }
}

impl DispatcherParams {
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    pub fn with_thread_idle_time(mut self, idle: Duration) -> Self {
        self.thread_idle_time = idle;
        self
    }

    pub fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = Some(size);
        self
    }

    /// Valida los parámetros
    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(ServerError::InvalidConfig("max threads must be >= 1".to_string()));
        }
        if self.max_queued == 0 {
            return Err(ServerError::InvalidConfig("max queued must be >= 1".to_string()));
        }
        if self.thread_idle_time.is_zero() {
            return Err(ServerError::InvalidConfig("thread idle time must be > 0".to_string()));
        }
        Ok(())
    }
}
