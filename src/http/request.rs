//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Parsea los bytes de un request que el framer ya delimitó.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /echo?upper=true HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Transfer-Encoding: chunked\r\n
//! \r\n
//! 5\r\nHello\r\n0\r\n\r\n
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.x`
//! 2. **Headers**: Pares `Name: Value`, el nombre no distingue mayúsculas
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: según `Content-Length` o decodificado de chunks

use crate::http::framer::{head_info, parse_chunk_size, HeadInfo};
use std::collections::HashMap;

/// Máximo de headers por request
const MAX_HEADERS: usize = 100;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP desde un string
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("incomplete HTTP request")]
    IncompleteRequest,

    #[error("invalid request line format")]
    InvalidRequestLine,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("empty request")]
    EmptyRequest,
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path de la petición (ej: "/echo")
    path: String,

    query_params: HashMap<String, String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// "HTTP/1.0" o "HTTP/1.1"
    version: String,

    /// Body ya decodificado (sin framing de chunks)
    body: Vec<u8>,
}

impl Request {
    /// Parsea un request completo desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use tcp_server::http::Request;
    ///
    /// let raw = b"GET /hash?text=hola HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/hash");
    /// assert_eq!(request.query_param("text"), Some("hola"));
    /// assert!(request.keep_alive());
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyRequest);
        }

        // 1. Request line y headers, con el mismo escáner que el framer
        let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut raw_headers);
        let body_start = match raw.parse(buffer) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => return Err(ParseError::IncompleteRequest),
            Err(e) => return Err(scan_error(e)),
        };

        let method = Method::from_str(raw.method.ok_or(ParseError::InvalidRequestLine)?)?;
        let target = raw.path.ok_or(ParseError::InvalidRequestLine)?;
        let (path, query_params) = Self::parse_path_and_query(target);
        let version = match raw.version {
            Some(0) => "HTTP/1.0".to_string(),
            Some(1) => "HTTP/1.1".to_string(),
            other => return Err(ParseError::InvalidHttpVersion(format!("{:?}", other))),
        };

        let headers = Self::collect_headers(&*raw.headers);

        // 2. Body, según el mismo framing que delimitó el request
        let info =
            head_info(&*raw.headers, body_start).map_err(|e| ParseError::InvalidHeader(e.to_string()))?;
        let body = Self::parse_body(&info, &buffer[body_start..])?;

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Ejemplo: "/hash?text=abc&upper" → ("/hash", {"text": "abc", "upper": ""})
    fn parse_path_and_query(path_with_query: &str) -> (String, HashMap<String, String>) {
        match path_with_query.find('?') {
            Some(query_start) => {
                let path = path_with_query[..query_start].to_string();
                let query_params = Self::parse_query_string(&path_with_query[query_start + 1..]);
                (path, query_params)
            }
            None => (path_with_query.to_string(), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }

            match param.find('=') {
                Some(eq_pos) => {
                    let key = &param[..eq_pos];
                    let value = Self::url_decode(&param[eq_pos + 1..]);
                    params.insert(key.to_string(), value);
                }
                None => {
                    params.insert(param.to_string(), String::new());
                }
            }
        }

        params
    }

    /// Decodifica `%XX` y `+` en un valor de query
    fn url_decode(s: &str) -> String {
        let bytes = s.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'+' => out.push(b' '),
                b'%' if i + 2 < bytes.len() => {
                    let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                    match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                        Some(b) => {
                            out.push(b);
                            i += 2;
                        }
                        None => out.push(b'%'),
                    }
                }
                b => out.push(b),
            }
            i += 1;
        }

        String::from_utf8_lossy(&out).into_owned()
    }

    /// Nombres en minúsculas; un header repetido junta sus valores con `, `
    fn collect_headers(raw: &[httparse::Header<'_>]) -> HashMap<String, String> {
        let mut headers: HashMap<String, String> = HashMap::new();

        for h in raw {
            let value = String::from_utf8_lossy(h.value).trim().to_string();
            headers
                .entry(h.name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        headers
    }

    fn parse_body(info: &HeadInfo, rest: &[u8]) -> Result<Vec<u8>, ParseError> {
        if info.chunked {
            return decode_chunked(rest);
        }

        let length = match info.content_length {
            Some(length) => {
                usize::try_from(length).map_err(|_| ParseError::InvalidBody(length.to_string()))?
            }
            None => return Ok(Vec::new()),
        };

        if rest.len() < length {
            return Err(ParseError::IncompleteRequest);
        }
        Ok(rest[..length].to_vec())
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::Request;
    ///
    /// let raw = b"GET /test?num=42 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Headers con los nombres en minúsculas
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header sin distinguir mayúsculas en el nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Verifica si el cliente pidió mantener la conexión abierta
    ///
    /// HTTP/1.1 mantiene la conexión salvo `Connection: close`;
    /// HTTP/1.0 solo con `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.header("Connection")
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        };

        if has_token("close") {
            false
        } else if has_token("keep-alive") {
            true
        } else {
            self.version == "HTTP/1.1"
        }
    }
}

/// Traduce un error del escáner de headers
fn scan_error(e: httparse::Error) -> ParseError {
    match e {
        httparse::Error::Version => ParseError::InvalidHttpVersion(e.to_string()),
        httparse::Error::HeaderName | httparse::Error::HeaderValue | httparse::Error::TooManyHeaders => {
            ParseError::InvalidHeader(e.to_string())
        }
        _ => ParseError::InvalidRequestLine,
    }
}

/// Busca `needle` en `data`
fn find(data: &[u8], needle: &[u8]) -> Option<usize> {
    data.windows(needle.len()).position(|w| w == needle)
}

/// Decodifica un body chunked, descartando extensiones y trailers
fn decode_chunked(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut decoded = Vec::new();
    let mut pos = 0;

    loop {
        let line_end = find(&data[pos..], b"\r\n")
            .map(|idx| pos + idx)
            .ok_or(ParseError::IncompleteRequest)?;

        let size =
            parse_chunk_size(&data[pos..line_end]).map_err(|e| ParseError::InvalidBody(e.to_string()))?;

        pos = line_end + 2;
        if size == 0 {
            return Ok(decoded);
        }

        let end = pos.checked_add(size).ok_or(ParseError::IncompleteRequest)?;
        if end + 2 > data.len() {
            return Err(ParseError::IncompleteRequest);
        }
        decoded.extend_from_slice(&data[pos..end]);
        pos = end + 2;
    }
}
