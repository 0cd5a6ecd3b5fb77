//! # Cola de Conexiones Pendientes
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe y acotada donde el acceptor deja los sockets
//! aceptados y de donde los workers del dispatcher los sacan.
//!
//! - `enqueue` nunca bloquea: si la cola está llena el socket se descarta
//!   y se cuenta como rechazado.
//! - `dequeue_timeout` bloquea como máximo el tiempo de inactividad y
//!   retorna `None` si no llegó nada (no es un error).
//! - `clear_and_stop` vacía la cola y deja un centinela de parada por worker.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Elemento de la cola
#[derive(Debug)]
pub enum Notification<S> {
    /// Conexión aceptada esperando un worker
    Connection {
        socket: S,
        enqueued_at: Instant,
    },

    /// Centinela: el worker que lo recibe debe terminar
    Stop,
}

/// Estado protegido por el mutex
struct QueueState<S> {
    items: VecDeque<Notification<S>>,

    /// Conexiones descartadas por cola llena
    refused: u64,

    /// Workers bloqueados actualmente en `dequeue_timeout`
    waiting: usize,
}

/// Cola FIFO acotada de conexiones
pub struct ConnectionQueue<S> {
    state: Mutex<QueueState<S>>,

    /// Condvar para despertar a un worker cuando llega algo
    condvar: Condvar,

    /// Profundidad máxima de la cola
    max_queued: usize,
}

impl<S> ConnectionQueue<S> {
    /// Crea una cola vacía con capacidad máxima
    pub fn new(max_queued: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                refused: 0,
                waiting: 0,
            }),
            condvar: Condvar::new(),
            max_queued,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<S>> {
        // Un worker que entra en pánico nunca lo hace con este lock tomado
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Encola un socket aceptado
    ///
    /// Retorna `true` si quedó encolado. Si la cola está llena incrementa
    /// el contador de rechazados y el socket se libera (se cierra).
    pub fn enqueue(&self, socket: S) -> bool {
        let mut state = self.lock();

        if state.items.len() >= self.max_queued {
            state.refused += 1;
            return false;
        }

        state.items.push_back(Notification::Connection {
            socket,
            enqueued_at: Instant::now(),
        });

        // Notificar a un worker esperando
        self.condvar.notify_one();

        true
    }

    /// Desencola la siguiente notificación esperando como máximo `timeout`
    ///
    /// Retorna `None` si el tiempo se agotó sin que llegara nada.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Notification<S>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if let Some(notification) = state.items.pop_front() {
                return Some(notification);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            state.waiting += 1;
            let (guard, _) = self
                .condvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
            state.waiting -= 1;
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<Notification<S>> {
        self.lock().items.pop_front()
    }

    /// Vacía la cola e inserta `workers` centinelas de parada
    ///
    /// Los sockets pendientes se liberan (el cliente ve la conexión cerrada).
    pub fn clear_and_stop(&self, workers: usize) {
        let mut state = self.lock();
        state.items.clear();

        for _ in 0..workers {
            state.items.push_back(Notification::Stop);
        }

        self.condvar.notify_all();
    }

    /// Número de elementos en la cola
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retorna la capacidad máxima
    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    /// Total de conexiones rechazadas por cola llena
    pub fn refused(&self) -> u64 {
        self.lock().refused
    }

    /// Verifica si hay algún worker bloqueado esperando trabajo
    ///
    /// Un worker ya despertado por un elemento pendiente no cuenta como libre.
    pub fn has_idle_threads(&self) -> bool {
        let state = self.lock();
        state.waiting > state.items.len()
    }

    /// Marca un rechazo que ocurrió fuera de la cola (ej: servidor detenido)
    pub(crate) fn record_refused(&self) {
        self.lock().refused += 1;
    }
}
