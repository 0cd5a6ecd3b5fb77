//! # Dispatcher de Conexiones TCP
//! src/server/dispatcher.rs
//!
//! Recibe sockets aceptados, los encola y los reparte entre un pool de
//! workers que crece bajo demanda hasta `max_threads`. Un worker recién
//! creado recibe su primer socket directamente, sin pasar por la cola.
//!
//! ## Ciclo de vida
//!
//! ```text
//! IDLE (sin workers) → RUNNING (1..max_threads) → STOPPING (centinelas) → STOPPED
//! ```
//!
//! Cada worker guarda un `Arc<Dispatcher>`: el dispatcher vive mientras lo
//! necesite algún worker o algún dueño externo.
//!
//! Un worker termina cuando el dispatcher está detenido o, después de
//! procesar (o de agotar el tiempo de espera), si hay más de un worker vivo
//! y la cola está vacía. El último worker solo termina con `stop`.

use crate::error::{Result, ServerError};
use crate::server::connection::ConnectionFactory;
use crate::server::error_handler::{self, panic_error, ErrorHandler};
use crate::server::params::DispatcherParams;
use crate::server::queue::{ConnectionQueue, Notification};
use serde::Serialize;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Contadores protegidos por un único mutex
#[derive(Debug, Default)]
struct DispatcherState {
    current_threads: usize,
    current_connections: usize,
    max_concurrent_connections: usize,
    total_connections: u64,
    stopped: bool,

    /// Workers creados desde el inicio (para nombrar threads)
    spawned: u64,
}

/// Snapshot de los contadores del dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub current_threads: usize,
    pub max_threads: usize,
    pub current_connections: usize,
    pub max_concurrent_connections: usize,
    pub total_connections: u64,
    pub queued_connections: usize,
    pub refused_connections: u64,
    pub stopped: bool,
}

/// Dispatcher con cola acotada y pool de workers
pub struct Dispatcher<S> {
    factory: Box<dyn ConnectionFactory<S>>,
    queue: ConnectionQueue<S>,
    params: DispatcherParams,
    state: Mutex<DispatcherState>,

    /// Si es `None` se usa el manejador global del proceso
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl<S: Send + 'static> Dispatcher<S> {
    /// Crea un dispatcher sin workers
    ///
    /// Falla solo si los parámetros son inválidos.
    pub fn new(factory: Box<dyn ConnectionFactory<S>>, params: DispatcherParams) -> Result<Arc<Self>> {
        Self::build(factory, params, None)
    }

    /// Igual que `new` pero reportando errores a `handler` en vez del global
    pub fn with_error_handler(
        factory: Box<dyn ConnectionFactory<S>>,
        params: DispatcherParams,
        handler: Arc<dyn ErrorHandler>,
    ) -> Result<Arc<Self>> {
        Self::build(factory, params, Some(handler))
    }

    fn build(
        factory: Box<dyn ConnectionFactory<S>>,
        params: DispatcherParams,
        error_handler: Option<Arc<dyn ErrorHandler>>,
    ) -> Result<Arc<Self>> {
        params.validate()?;

        Ok(Arc::new(Self {
            factory,
            queue: ConnectionQueue::new(params.max_queued),
            params,
            state: Mutex::new(DispatcherState::default()),
            error_handler,
        }))
    }

    fn lock(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Encola un socket aceptado
    ///
    /// Nunca bloquea. Retorna `false` si la conexión fue rechazada (cola
    /// llena o dispatcher detenido); el socket se cierra al liberarse.
    ///
    /// Si hace falta un worker nuevo, el socket se le entrega directamente
    /// y no ocupa lugar en la cola.
    pub fn enqueue(self: &Arc<Self>, socket: S) -> bool {
        let mut state = self.lock();

        if state.stopped {
            self.queue.record_refused();
            debug!("dispatcher detenido, conexión rechazada");
            return false;
        }

        let needs_worker =
            !self.queue.has_idle_threads() && state.current_threads < self.params.max_threads;

        if !needs_worker {
            return self.push(socket);
        }

        let first = Arc::new(Mutex::new(Some(socket)));
        let spawn_error = match self.spawn_worker(&mut state, Arc::clone(&first)) {
            Ok(()) => return true,
            Err(e) => e,
        };

        // El thread no llegó a correr: el socket vuelve a la cola
        let queued = match take_slot(&first) {
            Some(socket) => self.push(socket),
            None => false,
        };
        drop(state);

        warn!(error = %spawn_error, queued, "no se pudo iniciar un worker");
        self.report(&ServerError::Io(spawn_error));
        queued
    }

    fn push(&self, socket: S) -> bool {
        if self.queue.enqueue(socket) {
            true
        } else {
            warn!(max_queued = self.params.max_queued, "cola llena, conexión rechazada");
            false
        }
    }

    /// Lanza un worker nuevo que comparte la propiedad del dispatcher
    ///
    /// El worker atiende primero el socket de `first`.
    fn spawn_worker(
        self: &Arc<Self>,
        state: &mut DispatcherState,
        first: Arc<Mutex<Option<S>>>,
    ) -> io::Result<()> {
        let worker = Arc::clone(self);
        let name = format!("{}-{}", self.params.thread_name, state.spawned);

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = self.params.thread_stack_size {
            builder = builder.stack_size(size);
        }

        builder.spawn(move || {
            let socket = take_slot(&first);
            worker.run(socket)
        })?;

        state.current_threads += 1;
        state.spawned += 1;
        debug!(thread = %name, current_threads = state.current_threads, "worker iniciado");
        Ok(())
    }

    /// Loop principal del worker
    fn run(self: Arc<Self>, first: Option<S>) {
        if let Some(socket) = first {
            self.serve(socket);
        }

        let idle = self.params.thread_idle_time;

        loop {
            if let Some(Notification::Connection { socket, enqueued_at }) =
                self.queue.dequeue_timeout(idle)
            {
                debug!(waited_us = enqueued_at.elapsed().as_micros() as u64, "conexión desencolada");
                self.serve(socket);
            }

            let mut state = self.lock();
            if state.stopped || (state.current_threads > 1 && self.queue.is_empty()) {
                state.current_threads -= 1;
                debug!(current_threads = state.current_threads, "worker terminado");
                break;
            }
        }
    }

    /// Construye y ejecuta la conexión de un socket
    ///
    /// Errores y pánicos se reportan al manejador de errores; nunca llegan
    /// al loop del worker.
    fn serve(&self, socket: S) {
        let created = panic::catch_unwind(AssertUnwindSafe(|| self.factory.create_connection(socket)));

        let mut connection = match created {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                debug!("la fábrica descartó la conexión");
                return;
            }
            Err(payload) => {
                self.report(&panic_error(payload));
                return;
            }
        };

        self.begin_connection();
        let result = panic::catch_unwind(AssertUnwindSafe(|| connection.run()));
        self.end_connection();

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.report(&e),
            Err(payload) => self.report(&panic_error(payload)),
        }
    }

    fn report(&self, error: &ServerError) {
        match &self.error_handler {
            Some(handler) => handler.handle(error),
            None => error_handler::handle(error),
        }
    }

    fn begin_connection(&self) {
        let mut state = self.lock();
        state.total_connections += 1;
        state.current_connections += 1;
        if state.current_connections > state.max_concurrent_connections {
            state.max_concurrent_connections = state.current_connections;
        }
    }

    fn end_connection(&self) {
        let mut state = self.lock();
        state.current_connections = state.current_connections.saturating_sub(1);
    }

    /// Detiene el dispatcher
    ///
    /// Vacía la cola e inserta un centinela por worker. No espera a que los
    /// workers terminen: las conexiones en curso siguen hasta completarse.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }

        state.stopped = true;
        self.queue.clear_and_stop(state.current_threads);
        info!(workers = state.current_threads, "dispatcher detenido");
    }

    /// Espera hasta que no quede ningún worker o se agote `timeout`
    ///
    /// Retorna `true` si todos los workers terminaron.
    pub fn wait_for_workers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.current_threads() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn take_slot<S>(slot: &Mutex<Option<S>>) -> Option<S> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
}

impl<S> Dispatcher<S> {
    pub fn current_threads(&self) -> usize {
        self.snapshot().current_threads
    }

    pub fn max_threads(&self) -> usize {
        self.params.max_threads
    }

    pub fn total_connections(&self) -> u64 {
        self.snapshot().total_connections
    }

    pub fn current_connections(&self) -> usize {
        self.snapshot().current_connections
    }

    pub fn max_concurrent_connections(&self) -> usize {
        self.snapshot().max_concurrent_connections
    }

    pub fn queued_connections(&self) -> usize {
        self.queue.len()
    }

    pub fn refused_connections(&self) -> u64 {
        self.queue.refused()
    }

    pub fn is_stopped(&self) -> bool {
        self.snapshot().stopped
    }

    pub fn params(&self) -> &DispatcherParams {
        &self.params
    }

    pub fn factory(&self) -> &dyn ConnectionFactory<S> {
        self.factory.as_ref()
    }

    /// Lee todos los contadores de una vez
    pub fn stats(&self) -> DispatcherStats {
        let snapshot = self.snapshot();
        DispatcherStats {
            current_threads: snapshot.current_threads,
            max_threads: self.params.max_threads,
            current_connections: snapshot.current_connections,
            max_concurrent_connections: snapshot.max_concurrent_connections,
            total_connections: snapshot.total_connections,
            queued_connections: self.queue.len(),
            refused_connections: self.queue.refused(),
            stopped: snapshot.stopped,
        }
    }

    fn snapshot(&self) -> DispatcherState {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        DispatcherState {
            current_threads: state.current_threads,
            current_connections: state.current_connections,
            max_concurrent_connections: state.max_concurrent_connections,
            total_connections: state.total_connections,
            stopped: state.stopped,
            spawned: state.spawned,
        }
    }
}
