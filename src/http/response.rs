//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas HTTP/1.x y convertirlas a bytes.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use tcp_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"message": "Hello"}"#);
//!
//! let bytes = response.to_bytes();
//! // Ahora puedes enviar `bytes` por el socket
//! ```

use super::StatusCode;
use std::collections::HashMap;

/// Versión usada si no se indica otra
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// "HTTP/1.0" o "HTTP/1.1", normalmente la del request
    version: String,
    
    /// Headers HTTP (Content-Type, Content-Length, etc.)
    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,
    
    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta con el código de estado especificado
    /// 
    /// Por defecto, la respuesta no tiene headers ni body.
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let response = Response::new(StatusCode::Ok);
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            version: DEFAULT_VERSION.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }
    
    /// Agrega un header a la respuesta
    /// 
    /// Si el header ya existe, se sobrescribe.
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_header("Content-Type", "application/json");
    /// ```
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
    
    /// Usa la versión HTTP del request en la status line
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }

    /// Agrega el header `Connection` según si la conexión sigue abierta
    pub fn set_keep_alive(&mut self, keep_alive: bool) {
        let value = if keep_alive { "keep-alive" } else { "close" };
        self.add_header("Connection", value);
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let mut response = Response::new(StatusCode::Ok);
    /// response.add_header("Content-Type", "application/json");
    /// ```
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }
    
    /// Establece el cuerpo de la respuesta desde un string
    /// 
    /// Automáticamente calcula y agrega el header `Content-Length`.
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_body("Hello World");
    /// ```
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers.insert(
            "Content-Length".to_string(),
            self.body.len().to_string()
        );
        self
    }
    
    /// Establece el cuerpo de la respuesta desde bytes
    /// 
    /// Útil para respuestas binarias (imágenes, archivos comprimidos, etc.)
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let binary_data = vec![0x89, 0x50, 0x4E, 0x47]; // PNG header
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_body_bytes(binary_data);
    /// ```
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers.insert(
            "Content-Length".to_string(),
            self.body.len().to_string()
        );
        self
    }
    
    /// Crea una respuesta JSON exitosa (200 OK)
    /// 
    /// Automáticamente establece `Content-Type: application/json`.
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::Response;
    /// 
    /// let response = Response::json(r#"{"status": "ok"}"#);
    /// ```
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }
    
    /// Crea una respuesta de error con mensaje JSON
    /// 
    /// Formato del JSON: `{"error": "mensaje"}`
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    /// 
    /// let response = Response::error(
    ///     StatusCode::BadRequest,
    ///     "Invalid parameter: num must be positive"
    /// );
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body)
    }
    
    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_body("Hello");
    ///
    /// let text = String::from_utf8(response.to_bytes()).unwrap();
    /// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    /// assert!(text.ends_with("\r\n\r\nHello"));
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Status line y headers, sin body (respuesta a `HEAD`)
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        result.extend_from_slice(format!("{} {}\r\n", self.version, self.status).as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        result
    }
    
    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }
    
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
    
    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
