//! # Manejador de Errores del Proceso
//! src/server/error_handler.rs
//!
//! Todo error o pánico que escapa de una conexión termina aquí, nunca en el
//! loop del worker. La política (loguear, ignorar, escalar) la decide el
//! manejador instalado; por defecto se loguea con `tracing`.

use crate::error::ServerError;
use std::any::Any;
use std::sync::{Arc, RwLock};

/// Receptor de errores que escapan de las conexiones
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &ServerError);
}

/// Manejador por defecto: loguea el error
#[derive(Debug, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, error: &ServerError) {
        tracing::error!(%error, "error no manejado en conexión");
    }
}

static HANDLER: RwLock<Option<Arc<dyn ErrorHandler>>> = RwLock::new(None);

/// Instala el manejador global y retorna el anterior (si había)
pub fn set_error_handler(handler: Arc<dyn ErrorHandler>) -> Option<Arc<dyn ErrorHandler>> {
    let mut slot = HANDLER.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.replace(handler)
}

/// Retorna el manejador global actual
pub fn error_handler() -> Arc<dyn ErrorHandler> {
    let slot = HANDLER.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    match slot.as_ref() {
        Some(handler) => Arc::clone(handler),
        None => Arc::new(LoggingErrorHandler),
    }
}

/// Reporta un error al manejador global
pub fn handle(error: &ServerError) {
    error_handler().handle(error);
}

/// Convierte el payload de un pánico en un `ServerError`
pub fn panic_error(payload: Box<dyn Any + Send>) -> ServerError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    ServerError::HandlerPanicked(message)
}
