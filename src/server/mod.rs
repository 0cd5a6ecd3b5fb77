//! # Módulo del Servidor TCP
//! src/server/mod.rs
//!
//! Este módulo implementa la admisión y el reparto de conexiones:
//! 1. `tcp`: acepta conexiones y las pasa por un filtro opcional
//! 2. `queue`: cola FIFO acotada de conexiones pendientes
//! 3. `dispatcher`: pool de workers que crece bajo demanda
//! 4. `connection`: interfaz entre el dispatcher y cada protocolo
//! 5. `error_handler`: destino de los errores que escapan de una conexión

pub mod connection;
pub mod dispatcher;
pub mod error_handler;
pub mod params;
pub mod queue;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::{Connection, ConnectionFactory, FnConnectionFactory, StopFlag};
pub use dispatcher::{Dispatcher, DispatcherStats};
pub use error_handler::{set_error_handler, ErrorHandler, LoggingErrorHandler};
pub use params::DispatcherParams;
pub use queue::{ConnectionQueue, Notification};
pub use tcp::{ConnectionFilter, TcpServer};
