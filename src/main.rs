//! # TCP Server - Entry Point
//! src/main.rs
//!
//! Arma el servidor HTTP desde la configuración CLI/env y lo ejecuta.

use clap::Parser;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tcp_server::commands;
use tcp_server::config::Config;
use tcp_server::error::Result;
use tcp_server::http::HttpConnectionFactory;
use tcp_server::metrics::MetricsCollector;
use tcp_server::server::{Dispatcher, TcpServer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::parse();
    init_tracing(&config.log_level);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuración inválida");
        std::process::exit(2);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "error fatal");
        std::process::exit(1);
    }
}

/// `RUST_LOG` tiene prioridad sobre `--log-level`
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

fn run(config: Config) -> Result<()> {
    config.log_summary();

    let metrics = MetricsCollector::new();
    let factory = HttpConnectionFactory::new(commands::router(), metrics, config.http_params());
    let mut server = TcpServer::bind(Box::new(factory), &config.address(), config.dispatcher_params())?;

    if config.stats_interval_secs > 0 {
        spawn_stats_reporter(
            Arc::clone(server.dispatcher()),
            Duration::from_secs(config.stats_interval_secs),
        );
    }

    info!(address = %server.local_addr(), "iniciando servidor");
    server.run()
}

/// Loguea `DispatcherStats` cada `interval` hasta que el dispatcher se detenga
fn spawn_stats_reporter(dispatcher: Arc<Dispatcher<TcpStream>>, interval: Duration) {
    let spawned = thread::Builder::new()
        .name("stats-reporter".to_string())
        .spawn(move || {
            while !dispatcher.is_stopped() {
                thread::sleep(interval);
                match serde_json::to_string(&dispatcher.stats()) {
                    Ok(stats) => info!(%stats, "estadísticas del dispatcher"),
                    Err(e) => warn!(error = %e, "no se pudieron serializar las estadísticas"),
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "no se pudo iniciar el reporte de estadísticas");
    }
}
