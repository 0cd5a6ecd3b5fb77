//! # Conexiones y Fábricas de Conexiones
//! src/server/connection.rs
//!
//! El dispatcher no sabe qué protocolo habla cada conexión. Para cada socket
//! aceptado le pide a una `ConnectionFactory` un objeto `Connection` y lo
//! ejecuta de forma síncrona en el thread del worker.
//!
//! ```text
//! socket → ConnectionFactory::create_connection → Connection::run
//! ```

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};

/// Manejador de una conexión aceptada
///
/// `run` ocupa el thread del worker durante toda la vida de la conexión.
pub trait Connection: Send {
    fn run(&mut self) -> Result<()>;
}

/// Fábrica que produce un `Connection` por socket aceptado
///
/// `create_connection` se llama concurrentemente desde varios workers.
/// Retornar `None` descarta el socket: como se movió a la llamada, se
/// cierra al liberarse.
pub trait ConnectionFactory<S>: Send + Sync {
    fn create_connection(&self, socket: S) -> Option<Box<dyn Connection>>;

    /// Detiene la fábrica (idempotente)
    fn stop(&self);

    fn is_stopped(&self) -> bool;
}

/// Bandera de parada reutilizable por las fábricas
#[derive(Debug, Default)]
pub struct StopFlag {
    stopped: AtomicBool,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

type BuildFn<S> = dyn Fn(S) -> Option<Box<dyn Connection>> + Send + Sync;

/// Fábrica construida a partir de una closure
///
/// Después de `stop` todas las llamadas retornan `None` sin invocar la closure.
///
/// # Ejemplo
/// ```
/// use tcp_server::server::{Connection, ConnectionFactory, FnConnectionFactory};
///
/// struct Noop;
///
/// impl Connection for Noop {
///     fn run(&mut self) -> tcp_server::error::Result<()> {
///         Ok(())
///     }
/// }
///
/// let factory = FnConnectionFactory::new(|_socket: u32| {
///     Some(Box::new(Noop) as Box<dyn Connection>)
/// });
/// assert!(factory.create_connection(1).is_some());
///
/// factory.stop();
/// assert!(factory.create_connection(2).is_none());
/// ```
pub struct FnConnectionFactory<S> {
    build: Box<BuildFn<S>>,
    stop_flag: StopFlag,
}

impl<S> FnConnectionFactory<S> {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(S) -> Option<Box<dyn Connection>> + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            stop_flag: StopFlag::new(),
        }
    }
}

impl<S> ConnectionFactory<S> for FnConnectionFactory<S> {
    fn create_connection(&self, socket: S) -> Option<Box<dyn Connection>> {
        if self.stop_flag.is_stopped() {
            return None;
        }
        (self.build)(socket)
    }

    fn stop(&self) {
        self.stop_flag.stop();
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag.is_stopped()
    }
}
