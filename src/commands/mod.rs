//! # Comandos del Servidor
//! src/commands/mod.rs
//!
//! Handlers que el servidor expone por HTTP. Cada comando es una función
//! que recibe un `Request` y retorna una `Response`.
//!
//! `GET /metrics` no está aquí: lo responde la conexión HTTP directamente.

pub mod basic;

pub use basic::*;

use crate::http::Method;
use crate::router::Router;

/// Router con todos los comandos registrados
///
/// `/echo` y `/hash` aceptan el dato por query (`GET`) o por body.
pub fn router() -> Router {
    let mut router = Router::new();
    router.register_methods("/status", &[Method::GET], status_handler);
    router.register_methods("/echo", &[Method::GET, Method::POST, Method::PUT], echo_handler);
    router.register_methods("/hash", &[Method::GET, Method::POST, Method::PUT], hash_handler);
    router.register_methods("/sleep", &[Method::GET], sleep_handler);
    router.register_methods("/help", &[Method::GET], help_handler);
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, StatusCode};

    #[test]
    fn test_router_has_all_commands() {
        let router = router();

        for path in ["/status", "/echo?text=x", "/hash?text=x", "/sleep?ms=0", "/help"] {
            let raw = format!("GET {} HTTP/1.1\r\n\r\n", path);
            let request = Request::parse(raw.as_bytes()).unwrap();
            assert_eq!(router.route(&request).status(), StatusCode::Ok, "{}", path);
        }
    }

    #[test]
    fn test_read_only_commands_reject_post() {
        let router = router();

        for path in ["/status", "/sleep?ms=0", "/help"] {
            let raw = format!("POST {} HTTP/1.1\r\nContent-Length: 1\r\n\r\nx", path);
            let request = Request::parse(raw.as_bytes()).unwrap();
            let response = router.route(&request);

            assert_eq!(response.status(), StatusCode::MethodNotAllowed, "{}", path);
            assert_eq!(response.header("Allow"), Some("GET, HEAD, OPTIONS"));
        }
    }

    #[test]
    fn test_echo_accepts_body_methods() {
        let router = router();

        let request = Request::parse(b"PUT /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nok").unwrap();
        let response = router.route(&request);

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"ok");
    }
}
