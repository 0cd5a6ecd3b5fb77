//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Capa HTTP/1.x sobre el dispatcher TCP:
//!
//! - `framer`: detecta dónde termina cada request en el buffer
//! - `session`: une socket, buffer y framer; expone solo el request completo
//! - `request` / `response` / `status`: parsing y construcción de mensajes
//! - `connection`: el `Connection` que atiende requests con keep-alive
//!
//! ### Formato de Request
//!
//! ```text
//! POST /echo HTTP/1.1\r\n
//! Content-Length: 5\r\n
//! \r\n
//! Hello
//! ```
//!
//! Varios requests pueden llegar pegados en el mismo segmento TCP
//! (pipelining); el framer separa el primero y deja el resto en el buffer.

pub mod connection;
pub mod framer;
pub mod request;
pub mod response;
pub mod session;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
pub use connection::{HttpConnectionFactory, HttpParams, HttpServerConnection};
pub use framer::{FrameStatus, FramingError, RequestFramer};
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use session::HttpServerSession;
pub use status::StatusCode;
