//! # Comandos Básicos
//! src/commands/basic.rs
//!
//! Comandos de demostración del servidor:
//! - /status: Estado del servidor
//! - /echo: Devuelve el body o el parámetro `text`
//! - /hash: Hash SHA256 del body o del parámetro `text`
//! - /sleep: Ocupa el worker N milisegundos
//! - /help: Ayuda sobre comandos disponibles

use crate::http::{Request, Response, StatusCode};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Máximo de `/sleep` en milisegundos
const MAX_SLEEP_MS: u64 = 10_000;

/// Datos de entrada de un comando: el body si hay, si no `?text=`
fn input_of(req: &Request) -> Option<Vec<u8>> {
    if !req.body().is_empty() {
        return Some(req.body().to_vec());
    }
    req.query_param("text").map(|t| t.as_bytes().to_vec())
}

/// Handler para /status
///
/// # Ejemplo de response
/// ```json
/// {"status": "running", "version": "0.1.0", "pid": 4242, "timestamp": 1700000000}
/// ```
pub fn status_handler(_req: &Request) -> Response {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let body = json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "pid": std::process::id(),
        "timestamp": timestamp,
    });

    Response::json(&body.to_string())
}

/// Handler para /echo
///
/// Con body (`POST`/`PUT`) lo devuelve tal cual; con `?text=` devuelve el texto.
pub fn echo_handler(req: &Request) -> Response {
    match input_of(req) {
        Some(data) => {
            let content_type = req.header("Content-Type").unwrap_or("application/octet-stream");
            Response::new(StatusCode::Ok)
                .with_header("Content-Type", content_type)
                .with_body_bytes(data)
        }
        None => Response::error(StatusCode::BadRequest, "Missing body or parameter: text"),
    }
}

/// Handler para /hash
///
/// # Ejemplo de response
/// ```json
/// {"algorithm": "sha256", "size": 5, "hash": "2cf24dba..."}
/// ```
pub fn hash_handler(req: &Request) -> Response {
    let data = match input_of(req) {
        Some(data) => data,
        None => return Response::error(StatusCode::BadRequest, "Missing body or parameter: text"),
    };

    let body = json!({
        "algorithm": "sha256",
        "size": data.len(),
        "hash": sha256_hex(&data),
    });

    Response::json(&body.to_string())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Handler para /sleep?ms=N
///
/// Mantiene ocupado al worker; sirve para ver el pool crecer y la cola llenarse.
pub fn sleep_handler(req: &Request) -> Response {
    let ms: u64 = match req.query_param("ms") {
        Some(s) => match s.parse() {
            Ok(n) if n <= MAX_SLEEP_MS => n,
            _ => {
                return Response::error(
                    StatusCode::BadRequest,
                    &format!("Parameter 'ms' must be between 0 and {}", MAX_SLEEP_MS),
                );
            }
        },
        None => return Response::error(StatusCode::BadRequest, "Missing required parameter: ms"),
    };

    std::thread::sleep(Duration::from_millis(ms));

    Response::json(&json!({ "slept_ms": ms }).to_string())
}

/// Handler para /help
pub fn help_handler(_req: &Request) -> Response {
    let body = json!({
        "commands": [
            {"path": "/status", "description": "Estado del servidor"},
            {"path": "/echo", "description": "Devuelve el body o ?text="},
            {"path": "/hash", "description": "SHA256 del body o de ?text="},
            {"path": "/sleep?ms=N", "description": "Ocupa el worker N ms"},
            {"path": "/metrics", "description": "Métricas HTTP en JSON"},
            {"path": "/help", "description": "Esta ayuda"},
        ]
    });

    Response::json(&body.to_string())
}
