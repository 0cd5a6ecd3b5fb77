//! # Conexión HTTP
//! src/http/connection.rs
//!
//! `Connection` que habla HTTP/1.x sobre un socket:
//!
//! ```text
//! receive ─► framer completo? ─► Request::parse ─► Router ─► Response
//!    ▲                                                          │
//!    └──────────── pop_completed_request (keep-alive) ◄─────────┘
//! ```
//!
//! - Request (o buffer sin completar) mayor a `max_request_bytes` → 413 y cierre
//! - Error de framing o de parsing → 400 y cierre (501 si el método no existe)
//! - EOF del cliente o timeout de lectura → cierre
//! - `GET /metrics` se responde desde el `MetricsCollector`

use crate::error::{Result, ServerError};
use crate::http::request::{Method, ParseError, Request};
use crate::http::session::HttpServerSession;
use crate::http::{Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::Router;
use crate::server::connection::{Connection, ConnectionFactory, StopFlag};
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Parámetros de la capa HTTP
#[derive(Debug, Clone)]
pub struct HttpParams {
    /// Permitir conexiones persistentes
    pub keep_alive: bool,

    /// Requests por conexión (0 = sin límite)
    pub max_keep_alive_requests: usize,

    /// Tiempo máximo esperando bytes del cliente
    pub keep_alive_timeout: Duration,

    /// Bytes máximos acumulados sin completar un request
    pub max_request_bytes: usize,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            keep_alive: true,
            max_keep_alive_requests: 100,
            keep_alive_timeout: Duration::from_secs(5),
            max_request_bytes: 1024 * 1024,
        }
    }
}

/// Conexión HTTP sobre un socket
pub struct HttpServerConnection<S> {
    socket: Option<S>,
    buffer: Vec<u8>,
    router: Arc<Router>,
    metrics: MetricsCollector,
    params: HttpParams,
    stop: Arc<StopFlag>,
}

impl<S: Read + Write + Send> HttpServerConnection<S> {
    pub fn new(
        socket: S,
        router: Arc<Router>,
        metrics: MetricsCollector,
        params: HttpParams,
        stop: Arc<StopFlag>,
    ) -> Self {
        Self {
            socket: Some(socket),
            buffer: Vec::new(),
            router,
            metrics,
            params,
            stop,
        }
    }
}

impl<S: Read + Write + Send> Connection for HttpServerConnection<S> {
    fn run(&mut self) -> Result<()> {
        let socket = self.socket.take().ok_or(ServerError::ConnectionClosed)?;

        let mut session = HttpServerSession::new(socket, &mut self.buffer);
        session.set_keep_alive(self.params.keep_alive, self.params.max_keep_alive_requests);

        let result = serve(&mut session, &self.router, &self.metrics, &self.params, &self.stop);
        self.metrics.record_connection(session.requests_served());
        result
    }
}

/// Resultado de esperar el siguiente request
enum Next {
    Ready,
    Closed,
}

/// Atiende requests hasta que la conexión deba cerrarse
fn serve<S: Read + Write>(
    session: &mut HttpServerSession<'_, S>,
    router: &Router,
    metrics: &MetricsCollector,
    params: &HttpParams,
    stop: &StopFlag,
) -> Result<()> {
    loop {
        // 1. Esperar un request completo
        match fill_request(session, metrics, params)? {
            Next::Ready => {}
            Next::Closed => return Ok(()),
        }

        let started = Instant::now();

        // 2. Parsear
        let parsed = match session.completed_request() {
            Some(raw) => Request::parse(raw),
            None => return Ok(()),
        };
        let request = match parsed {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "request inválido");
                let status = match e {
                    ParseError::UnsupportedMethod(_) => StatusCode::NotImplemented,
                    _ => StatusCode::BadRequest,
                };
                let response = Response::error(status, &e.to_string());
                send_response(session, response, "HTTP/1.1", false, false);
                metrics.record_request("-", status.as_u16(), started.elapsed());
                return Ok(());
            }
        };

        // 3. Rutear
        let response = if request.method() == Method::GET && request.path() == "/metrics" {
            Response::json(&metrics.to_json())
        } else {
            router.route(&request)
        };
        let status = response.status();

        // 4. Responder
        let keep_alive = request.keep_alive() && session.can_keep_alive() && !stop.is_stopped();
        let head_only = request.method() == Method::HEAD;
        let sent = send_response(session, response, request.version(), keep_alive, head_only);

        metrics.record_request(request.path(), status.as_u16(), started.elapsed());
        debug!(
            method = request.method().as_str(),
            path = request.path(),
            status = status.as_u16(),
            keep_alive,
            "request atendido"
        );

        session.pop_completed_request();

        if !sent {
            return match session.take_error() {
                Some(e) if is_disconnect(&e) => Ok(()),
                Some(e) => Err(e.into()),
                None => Ok(()),
            };
        }
        if !keep_alive {
            return Ok(());
        }
    }
}

/// Lee del socket hasta que el framer encuentre un request completo
fn fill_request<S: Read + Write>(
    session: &mut HttpServerSession<'_, S>,
    metrics: &MetricsCollector,
    params: &HttpParams,
) -> Result<Next> {
    while !session.check_request_complete() {
        if let Some(e) = session.framing_error().cloned() {
            debug!(error = %e, "error de framing");
            let response = Response::error(StatusCode::BadRequest, &e.to_string());
            send_response(session, response, "HTTP/1.1", false, false);
            metrics.record_request("-", StatusCode::BadRequest.as_u16(), Duration::ZERO);
            return Ok(Next::Closed);
        }

        let buffered = session.buffer().len();
        if buffered > params.max_request_bytes {
            reject_too_large(session, metrics, buffered, params.max_request_bytes);
            return Ok(Next::Closed);
        }

        match session.receive() {
            Ok(0) => return Ok(Next::Closed),
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {
                debug!(buffered, "timeout esperando request");
                return Ok(Next::Closed);
            }
            Err(e) if is_disconnect(&e) => return Ok(Next::Closed),
            Err(e) => return Err(e.into()),
        }
    }

    let size = session.framer().end().unwrap_or(0);
    if size > params.max_request_bytes {
        reject_too_large(session, metrics, size, params.max_request_bytes);
        return Ok(Next::Closed);
    }

    Ok(Next::Ready)
}

fn reject_too_large<S: Read + Write>(
    session: &mut HttpServerSession<'_, S>,
    metrics: &MetricsCollector,
    size: usize,
    max: usize,
) {
    let e = ServerError::RequestTooLarge(size, max);
    warn!(error = %e, "request rechazado");
    let response = Response::error(StatusCode::PayloadTooLarge, &e.to_string());
    send_response(session, response, "HTTP/1.1", false, false);
    metrics.record_request("-", StatusCode::PayloadTooLarge.as_u16(), Duration::ZERO);
}

/// Envía la respuesta; retorna `false` si la escritura falló
fn send_response<S: Read + Write>(
    session: &mut HttpServerSession<'_, S>,
    mut response: Response,
    version: &str,
    keep_alive: bool,
    head_only: bool,
) -> bool {
    response.set_version(version);
    response.set_keep_alive(keep_alive);

    let bytes = if head_only {
        response.head_bytes()
    } else {
        response.to_bytes()
    };

    session.send(&bytes) == bytes.len()
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof
    )
}

/// Fábrica de conexiones HTTP para sockets TCP
pub struct HttpConnectionFactory {
    router: Arc<Router>,
    metrics: MetricsCollector,
    params: HttpParams,
    stop: Arc<StopFlag>,
}

impl HttpConnectionFactory {
    pub fn new(router: Router, metrics: MetricsCollector, params: HttpParams) -> Self {
        Self {
            router: Arc::new(router),
            metrics,
            params,
            stop: Arc::new(StopFlag::new()),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn params(&self) -> &HttpParams {
        &self.params
    }
}

impl ConnectionFactory<TcpStream> for HttpConnectionFactory {
    fn create_connection(&self, socket: TcpStream) -> Option<Box<dyn Connection>> {
        if self.stop.is_stopped() {
            return None;
        }

        if let Err(e) = socket.set_read_timeout(Some(self.params.keep_alive_timeout)) {
            warn!(error = %e, "no se pudo configurar el timeout de lectura");
            return None;
        }

        Some(Box::new(HttpServerConnection::new(
            socket,
            Arc::clone(&self.router),
            self.metrics.clone(),
            self.params.clone(),
            Arc::clone(&self.stop),
        )))
    }

    fn stop(&self) {
        self.stop.stop();
    }

    fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }
}
