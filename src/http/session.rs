//! # Sesión HTTP sobre un Socket
//! src/http/session.rs
//!
//! Une un socket con el buffer de la conexión y un `RequestFramer`:
//!
//! 1. `receive` agrega al buffer lo que llegue del socket
//! 2. `check_request_complete` corre el framer sobre el buffer
//! 3. El parser lee solo `[0, end)` del request completo (`get`, `peek`, `Read`)
//! 4. `pop_completed_request` descarta esos bytes y deja el resto
//!    (requests pipelined) para la siguiente vuelta
//!
//! El buffer vive fuera de la sesión para que los bytes acumulados
//! sobrevivan aunque la sesión se recree.

use crate::http::framer::{FrameStatus, FramingError, RequestFramer};
use std::io::{self, Read, Write};

/// Tamaño de cada lectura del socket
const READ_CHUNK: usize = 4096;

/// Sesión HTTP de una conexión
pub struct HttpServerSession<'a, S> {
    socket: S,
    buf: &'a mut Vec<u8>,
    framer: RequestFramer,

    /// Fin del request completo, si hay uno
    complete: Option<usize>,

    /// Posición de lectura dentro de `[0, complete)`
    read_pos: usize,

    framing_error: Option<FramingError>,

    /// Último error de escritura
    error: Option<io::Error>,

    keep_alive: bool,

    /// 0 = sin límite
    max_keep_alive_requests: usize,

    requests_served: usize,
}

impl<'a, S: Read + Write> HttpServerSession<'a, S> {
    /// Crea una sesión sobre `socket` que acumula bytes en `buf`
    pub fn new(socket: S, buf: &'a mut Vec<u8>) -> Self {
        Self {
            socket,
            buf,
            framer: RequestFramer::new(),
            complete: None,
            read_pos: 0,
            framing_error: None,
            error: None,
            keep_alive: false,
            max_keep_alive_requests: 0,
            requests_served: 0,
        }
    }

    /// Lee una vez del socket y agrega los bytes al buffer
    ///
    /// Retorna `Ok(0)` si el peer cerró la conexión.
    pub fn receive(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match self.socket.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Verifica si el buffer ya contiene un request completo
    ///
    /// Un error de framing se guarda en `framing_error` y retorna `false`:
    /// el request no se va a completar nunca.
    pub fn check_request_complete(&mut self) -> bool {
        if self.complete.is_some() {
            return true;
        }

        match self.framer.check(&self.buf[..]) {
            Ok(FrameStatus::Complete(end)) => {
                self.complete = Some(end);
                self.read_pos = 0;
                true
            }
            Ok(FrameStatus::Incomplete) => false,
            Err(e) => {
                self.framing_error = Some(e);
                false
            }
        }
    }

    /// Descarta el request completo del buffer
    ///
    /// No hace nada si no hay un request completo.
    pub fn pop_completed_request(&mut self) {
        let end = match self.complete.take() {
            Some(end) => end,
            None => return,
        };

        if end >= self.buf.len() {
            self.buf.clear();
        } else {
            self.buf.drain(..end);
        }

        self.framer.reset();
        self.read_pos = 0;
        self.requests_served += 1;
    }

    /// Bytes del request completo
    pub fn completed_request(&self) -> Option<&[u8]> {
        self.complete.map(|end| &self.buf[..end])
    }

    /// Siguiente byte del request completo, o `None` al llegar al límite
    pub fn get(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.read_pos += 1;
        Some(byte)
    }

    /// Como `get` pero sin avanzar
    pub fn peek(&self) -> Option<u8> {
        let end = self.complete?;
        if self.read_pos < end {
            Some(self.buf[self.read_pos])
        } else {
            None
        }
    }

    /// Escribe en el socket
    ///
    /// Retorna los bytes escritos. Si falla, el error queda guardado en
    /// `error()` y retorna 0.
    pub fn send(&mut self, data: &[u8]) -> usize {
        match self.socket.write_all(data).and_then(|_| self.socket.flush()) {
            Ok(()) => data.len(),
            Err(e) => {
                self.error = Some(e);
                0
            }
        }
    }

    pub fn framing_error(&self) -> Option<&FramingError> {
        self.framing_error.as_ref()
    }

    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn framer(&self) -> &RequestFramer {
        &self.framer
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buf[..]
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    // === Keep-alive ===

    pub fn set_keep_alive(&mut self, keep_alive: bool, max_requests: usize) {
        self.keep_alive = keep_alive;
        self.max_keep_alive_requests = max_requests;
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Requests ya descartados con `pop_completed_request`
    pub fn requests_served(&self) -> usize {
        self.requests_served
    }

    /// Verifica si la conexión puede atender un request más después del actual
    pub fn can_keep_alive(&self) -> bool {
        if !self.keep_alive {
            return false;
        }
        self.max_keep_alive_requests == 0 || self.requests_served + 1 < self.max_keep_alive_requests
    }
}

impl<S: Read + Write> Read for HttpServerSession<'_, S> {
    /// Lee del request completo; 0 bytes al llegar a su fin
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let end = match self.complete {
            Some(end) => end,
            None => return Ok(0),
        };

        let available = end.saturating_sub(self.read_pos);
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }
}
