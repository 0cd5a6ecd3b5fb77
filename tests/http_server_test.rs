//! Tests de integración del servidor HTTP
//! tests/http_server_test.rs
//!
//! Servidor completo (acceptor + dispatcher + conexión HTTP + comandos)
//! en un puerto efímero de loopback.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};
use tcp_server::commands;
use tcp_server::http::{HttpConnectionFactory, HttpParams};
use tcp_server::metrics::MetricsCollector;
use tcp_server::server::{DispatcherParams, TcpServer};

fn start_server(http: HttpParams) -> (TcpServer, MetricsCollector) {
    let metrics = MetricsCollector::new();
    let factory = HttpConnectionFactory::new(commands::router(), metrics.clone(), http);
    let mut server = TcpServer::bind(Box::new(factory), "127.0.0.1:0", DispatcherParams::default()).unwrap();
    server.start().unwrap();
    (server, metrics)
}

fn connect(server: &TcpServer) -> TcpStream {
    let stream = TcpStream::connect(server.local_addr()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

/// Envía `raw` y lee hasta que el servidor cierre
fn exchange(server: &TcpServer, raw: &[u8]) -> String {
    let mut stream = connect(server);
    stream.write_all(raw).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Body de la última respuesta
fn last_body(response: &str) -> &str {
    response.rsplit("\r\n\r\n").next().unwrap_or("")
}

#[test]
fn test_single_request_http10() {
    let (server, _) = start_server(HttpParams::default());

    let response = exchange(&server, b"GET /status HTTP/1.0\r\n\r\n");

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"), "{}", response);
    assert!(response.contains("Connection: close\r\n"));
    let body: serde_json::Value = serde_json::from_str(last_body(&response)).unwrap();
    assert_eq!(body["status"], "running");
}

#[test]
fn test_pipelined_requests_on_one_connection() {
    let (server, metrics) = start_server(HttpParams::default());

    let raw = b"GET /echo?text=uno HTTP/1.1\r\nHost: x\r\n\r\n\
POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 3\r\n\r\ndos\
GET /echo?text=tres HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n";
    let response = exchange(&server, raw);

    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 3);
    assert_eq!(response.matches("Connection: keep-alive").count(), 2);
    assert!(response.contains("\r\n\r\nuno"));
    assert!(response.contains("\r\n\r\ndos"));
    assert!(response.ends_with("\r\n\r\ntres"));

    assert_eq!(server.total_connections(), 1);
    assert_eq!(metrics.total_requests(), 3);
}

#[test]
fn test_keep_alive_across_writes() {
    let (server, _) = start_server(HttpParams::default());
    let mut stream = connect(&server);

    for i in 0..3 {
        let raw = format!("GET /echo?text=msg{} HTTP/1.1\r\nHost: x\r\n\r\n", i);
        stream.write_all(raw.as_bytes()).unwrap();

        let expected_body = format!("msg{}", i);
        let mut buf = vec![0u8; 4096];
        let mut got = String::new();
        while !got.ends_with(&expected_body) {
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "el servidor cerró la conexión");
            got.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        assert!(got.contains("Connection: keep-alive"));
    }

    assert_eq!(server.total_connections(), 1);
}

#[test]
fn test_chunked_request_in_fragments() {
    let (server, _) = start_server(HttpParams::default());
    let mut stream = connect(&server);

    let parts: [&[u8]; 5] = [
        b"POST /hash HTTP/1.1\r\nHost: x\r\nTransfer-Enc",
        b"oding: chunked\r\nConnection: close\r\n\r\n3\r\nhe",
        b"l\r\n2\r\n",
        b"lo\r\n0\r\n",
        b"\r\n",
    ];
    for part in parts {
        stream.write_all(part).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(20));
    }

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    let body: serde_json::Value = serde_json::from_str(last_body(&response)).unwrap();
    assert_eq!(body["hash"], "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
    assert_eq!(body["size"], 5);
}

#[test]
fn test_metrics_endpoint() {
    let (server, _) = start_server(HttpParams::default());

    exchange(&server, b"GET /help HTTP/1.0\r\n\r\n");
    exchange(&server, b"GET /missing HTTP/1.0\r\n\r\n");
    let response = exchange(&server, b"GET /metrics HTTP/1.0\r\n\r\n");

    let body: serde_json::Value = serde_json::from_str(last_body(&response)).unwrap();
    assert_eq!(body["total_requests"], 2);
    assert_eq!(body["status_codes"]["200"], 1);
    assert_eq!(body["status_codes"]["404"], 1);
    assert_eq!(body["connections"], 2);
}

#[test]
fn test_malformed_request_gets_400() {
    let (server, _) = start_server(HttpParams::default());

    let response = exchange(&server, b"POST /echo HTTP/1.1\r\nContent-Length: abc\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{}", response);
    assert!(response.contains("Connection: close\r\n"));
}

#[test]
fn test_method_errors() {
    let (server, _) = start_server(HttpParams::default());

    let response = exchange(&server, b"DELETE /status HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 405 Method Not Allowed\r\n"), "{}", response);
    assert!(response.contains("Allow: GET, HEAD, OPTIONS\r\n"));

    let response = exchange(&server, b"BREW /status HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"), "{}", response);
}

#[test]
fn test_idle_client_is_closed_after_timeout() {
    let http = HttpParams {
        keep_alive_timeout: Duration::from_millis(200),
        ..HttpParams::default()
    };
    let (server, _) = start_server(http);
    let mut stream = connect(&server);

    // Request incompleto que nunca termina
    stream.write_all(b"GET /status HTTP/1.1\r\nHost").unwrap();

    let started = Instant::now();
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).unwrap_or(0);

    assert_eq!(n, 0);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(server.total_connections(), 1);
}

#[test]
fn test_stop_reports_stats() {
    let (mut server, _) = start_server(HttpParams::default());

    exchange(&server, b"GET /status HTTP/1.0\r\n\r\n");
    server.stop();

    let stats = server.stats();
    assert!(stats.stopped);
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.refused_connections, 0);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["total_connections"], 1);
}
