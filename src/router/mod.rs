//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea `(método, path)` a handlers.
//!
//! ```text
//! Request → Router ─┬─ path desconocido ───────────► 404 Not Found
//!                   ├─ método no registrado ────────► 405 Method Not Allowed (+ Allow)
//!                   ├─ OPTIONS sin handler propio ──► 204 No Content (+ Allow)
//!                   └─ handler(request) ────────────► Response
//! ```
//!
//! Una ruta que acepta `GET` acepta también `HEAD`; la conexión HTTP se
//! encarga de no enviar el body.

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!("tcp_server/", env!("CARGO_PKG_VERSION"));

/// Tipo de función handler
///
/// Un handler recibe un Request y retorna una Response
pub type Handler = fn(&Request) -> Response;

/// Handlers de un path
struct Route {
    /// `None` = cualquier método
    methods: Option<Vec<Method>>,
    handler: Handler,
}

impl Route {
    fn accepts(&self, method: Method) -> bool {
        match &self.methods {
            None => true,
            Some(methods) => {
                methods.contains(&method) || (method == Method::HEAD && methods.contains(&Method::GET))
            }
        }
    }

    /// Valor del header `Allow`
    fn allow(&self) -> String {
        let methods = match &self.methods {
            Some(methods) => methods.clone(),
            None => vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
        };

        let mut names: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            names.push("HEAD");
        }
        if !methods.contains(&Method::OPTIONS) {
            names.push("OPTIONS");
        }
        names.join(", ")
    }
}

/// Router que mapea paths a handlers
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registra un handler para cualquier método
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::router::Router;
    /// use tcp_server::http::{Request, Response};
    ///
    /// fn hello_handler(_req: &Request) -> Response {
    ///     Response::json(r#"{"message": "Hello"}"#)
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register("/hello", hello_handler);
    /// assert!(router.has_route("/hello"));
    /// ```
    pub fn register(&mut self, path: &str, handler: Handler) {
        self.routes.insert(path.to_string(), Route { methods: None, handler });
    }

    /// Registra un handler que solo acepta `methods`
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::router::Router;
    /// use tcp_server::http::{Method, Request, Response, StatusCode};
    ///
    /// fn status(_req: &Request) -> Response {
    ///     Response::json("{}")
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register_methods("/status", &[Method::GET], status);
    ///
    /// let post = Request::parse(b"POST /status HTTP/1.1\r\n\r\n").unwrap();
    /// let response = router.route(&post);
    /// assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    /// assert_eq!(response.header("Allow"), Some("GET, HEAD, OPTIONS"));
    /// ```
    pub fn register_methods(&mut self, path: &str, methods: &[Method], handler: Handler) {
        let route = Route {
            methods: Some(methods.to_vec()),
            handler,
        };
        self.routes.insert(path.to_string(), route);
    }

    pub fn has_route(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::router::Router;
    /// use tcp_server::http::Request;
    ///
    /// let router = Router::new();
    /// let request = Request::parse(b"GET /test HTTP/1.1\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request).status().as_u16(), 404);
    /// ```
    pub fn route(&self, request: &Request) -> Response {
        let method = request.method();

        let mut response = match self.routes.get(request.path()) {
            None => Response::error(StatusCode::NotFound, &format!("Route not found: {}", request.path())),
            Some(route) if route.accepts(method) => (route.handler)(request),
            Some(route) if method == Method::OPTIONS => {
                Response::new(StatusCode::NoContent).with_header("Allow", &route.allow())
            }
            Some(route) => Response::error(
                StatusCode::MethodNotAllowed,
                &format!("{} not allowed on {}", method.as_str(), request.path()),
            )
            .with_header("Allow", &route.allow()),
        };

        // `Connection` lo decide la conexión HTTP según keep-alive
        response.add_header("Server", SERVER_NAME);
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
