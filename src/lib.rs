//! # TCP Server
//! src/lib.rs
//!
//! Servidor TCP multi-thread con una cola acotada de conexiones y una capa
//! HTTP/1.1 que separa requests pipelined sobre conexiones persistentes.
//!
//! ## Arquitectura
//!
//! ```text
//! TcpServer (acceptor) ─► ConnectionQueue ─► Dispatcher (workers)
//!                                                 │
//!                                  ConnectionFactory::create_connection
//!                                                 │
//!                          HttpServerConnection ─► HttpServerSession ─► RequestFramer
//! ```
//!
//! Módulos:
//! - `server`: acceptor, cola, dispatcher, fábricas de conexiones, errores
//! - `http`: framing incremental, sesión, parsing y respuestas
//! - `router`: enrutamiento de peticiones a handlers
//! - `commands`: comandos de demostración
//! - `metrics`: métricas HTTP
//! - `config`: CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use tcp_server::commands;
//! use tcp_server::http::{HttpConnectionFactory, HttpParams};
//! use tcp_server::metrics::MetricsCollector;
//! use tcp_server::server::{DispatcherParams, TcpServer};
//!
//! let factory = HttpConnectionFactory::new(commands::router(), MetricsCollector::new(), HttpParams::default());
//! let mut server = TcpServer::bind(Box::new(factory), "127.0.0.1:8080", DispatcherParams::default())?;
//! server.run()?;
//! # Ok::<(), tcp_server::error::ServerError>(())
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;
