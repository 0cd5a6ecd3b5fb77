//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Acceptor que escucha en un `TcpListener` y entrega cada conexión
//! aceptada al `Dispatcher`. El acceptor corre en su propio thread; los
//! workers del dispatcher son los que hablan con los clientes.
//!
//! ```text
//! TcpListener → [filtro] → Dispatcher::enqueue → worker → Connection::run
//! ```

use crate::error::Result;
use crate::server::connection::ConnectionFactory;
use crate::server::dispatcher::{Dispatcher, DispatcherStats};
use crate::server::params::DispatcherParams;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cada cuánto revisa el acceptor si debe detenerse
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Filtro aplicado a cada conexión antes de encolarla
///
/// Las conexiones rechazadas se cierran y no cuentan en ningún contador.
pub trait ConnectionFilter: Send + Sync {
    fn accept(&self, stream: &TcpStream) -> bool;
}

/// Servidor TCP multi-thread con cola acotada
pub struct TcpServer {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher<TcpStream>>,
    filter: Option<Arc<dyn ConnectionFilter>>,
    stopped: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl TcpServer {
    /// Crea un servidor sobre un listener ya creado
    pub fn new(
        factory: Box<dyn ConnectionFactory<TcpStream>>,
        listener: TcpListener,
        params: DispatcherParams,
    ) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        let dispatcher = Dispatcher::new(factory, params)?;

        Ok(Self {
            listener: Some(listener),
            local_addr,
            dispatcher,
            filter: None,
            stopped: Arc::new(AtomicBool::new(false)),
            acceptor: None,
        })
    }

    /// Crea el listener en `address` y el servidor
    pub fn bind(
        factory: Box<dyn ConnectionFactory<TcpStream>>,
        address: &str,
        params: DispatcherParams,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address)?;
        Self::new(factory, listener, params)
    }

    /// Instala un filtro de conexiones (debe llamarse antes de `start`)
    pub fn set_connection_filter(&mut self, filter: Arc<dyn ConnectionFilter>) {
        self.filter = Some(filter);
    }

    /// Inicia el thread del acceptor
    ///
    /// Llamadas posteriores no hacen nada.
    pub fn start(&mut self) -> Result<()> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Ok(()),
        };

        listener.set_nonblocking(true)?;

        let dispatcher = Arc::clone(&self.dispatcher);
        let filter = self.filter.clone();
        let stopped = Arc::clone(&self.stopped);

        let handle = thread::Builder::new()
            .name("tcp-acceptor".to_string())
            .spawn(move || accept_loop(listener, dispatcher, filter, stopped))?;

        self.acceptor = Some(handle);
        info!(address = %self.local_addr, "servidor escuchando");

        Ok(())
    }

    /// Inicia el servidor y bloquea hasta que el acceptor termine
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Detiene el acceptor, el dispatcher y la fábrica
    ///
    /// Las conexiones en curso terminan por su cuenta.
    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.acceptor.take() {
            let _ = handle.join();
        }

        self.dispatcher.stop();
        self.dispatcher.factory().stop();
        info!(address = %self.local_addr, "servidor detenido");
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<TcpStream>> {
        &self.dispatcher
    }

    pub fn current_threads(&self) -> usize {
        self.dispatcher.current_threads()
    }

    pub fn max_threads(&self) -> usize {
        self.dispatcher.max_threads()
    }

    pub fn total_connections(&self) -> u64 {
        self.dispatcher.total_connections()
    }

    pub fn current_connections(&self) -> usize {
        self.dispatcher.current_connections()
    }

    pub fn max_concurrent_connections(&self) -> usize {
        self.dispatcher.max_concurrent_connections()
    }

    pub fn queued_connections(&self) -> usize {
        self.dispatcher.queued_connections()
    }

    pub fn refused_connections(&self) -> u64 {
        self.dispatcher.refused_connections()
    }

    pub fn stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher<TcpStream>>,
    filter: Option<Arc<dyn ConnectionFilter>>,
    stopped: Arc<AtomicBool>,
) {
    while !stopped.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Some(filter) = &filter {
                    if !filter.accept(&stream) {
                        debug!(%peer, "conexión rechazada por el filtro");
                        continue;
                    }
                }

                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "no se pudo configurar el socket");
                    continue;
                }
                let _ = stream.set_nodelay(true);

                debug!(%peer, "nueva conexión");
                if !dispatcher.enqueue(stream) {
                    debug!(%peer, "conexión rechazada por el dispatcher");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(e) => {
                warn!(error = %e, "error al aceptar conexión");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::connection::{Connection, FnConnectionFactory};

    struct Noop;

    impl Connection for Noop {
        fn run(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn noop_factory() -> Box<dyn ConnectionFactory<TcpStream>> {
        Box::new(FnConnectionFactory::new(|_: TcpStream| {
            Some(Box::new(Noop) as Box<dyn Connection>)
        }))
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let server = TcpServer::bind(noop_factory(), "127.0.0.1:0", DispatcherParams::default()).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.current_threads(), 0);
    }

    #[test]
    fn test_invalid_params_fail_construction() {
        let params = DispatcherParams::default().with_max_queued(0);
        assert!(TcpServer::bind(noop_factory(), "127.0.0.1:0", params).is_err());
    }

    #[test]
    fn test_stop_stops_factory() {
        let mut server = TcpServer::bind(noop_factory(), "127.0.0.1:0", DispatcherParams::default()).unwrap();
        server.start().unwrap();
        server.stop();

        assert!(server.dispatcher().is_stopped());
        assert!(server.dispatcher().factory().is_stopped());
    }
}
