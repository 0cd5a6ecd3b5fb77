//! # Errores del Servidor
//! src/error.rs
//!
//! Errores que cruzan los límites entre módulos: construcción del dispatcher,
//! ejecución de conexiones y el loop HTTP.

use crate::http::framer::FramingError;
use crate::http::request::ParseError;

/// Errores a nivel de servidor
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("connection handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request too large: {0} bytes (max: {1})")]
    RequestTooLarge(usize, usize),
}

/// Alias para resultados del servidor
pub type Result<T> = std::result::Result<T, ServerError>;
