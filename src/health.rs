//! Minimal HTTP health and metrics endpoint (synchronous, own thread)
//!
//! Serves `/health`, `/ready` and `/metrics` for load balancers and
//! Prometheus scrapers. Deliberately not part of the async server: it must
//! keep answering even if the cache runtime is saturated.

use crate::config::MetricsConfig;
use crate::metrics::Metrics;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Health server state
pub struct HealthServer {
    metrics: Arc<Metrics>,
    ready: AtomicBool,
    running: AtomicBool,
}

impl HealthServer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            ready: AtomicBool::new(false),
            running: AtomicBool::new(true),
        }
    }

    /// Mark the cache as ready to serve traffic
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Ask the serving loop to stop after its next poll
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Serve requests until stopped; blocking, run in its own thread
    pub fn run(self: Arc<Self>, config: &MetricsConfig) -> std::io::Result<()> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        info!("Health server listening on {}", config.listen_addr);

        while self.running.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = self.answer(stream) {
                        error!("Health connection error: {}", e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => {
                    error!("Health server accept error: {}", e);
                }
            }
        }

        info!("Health server stopped");
        Ok(())
    }

    fn answer(&self, mut stream: TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;

        let mut request_line = String::new();
        BufReader::new(&stream).read_line(&mut request_line)?;

        // "GET /path HTTP/1.1"
        let mut parts = request_line.split_whitespace();
        let (method, path) = match (parts.next(), parts.next()) {
            (Some(m), Some(p)) => (m, p),
            _ => return respond(&mut stream, 400, "text/plain", "Bad Request"),
        };

        if method != "GET" {
            return respond(&mut stream, 405, "text/plain", "Method Not Allowed");
        }

        match path {
            "/health" | "/healthz" => {
                respond(&mut stream, 200, "application/json", r#"{"status":"healthy"}"#)
            }
            "/ready" | "/readyz" => {
                if self.is_ready() {
                    respond(&mut stream, 200, "application/json", r#"{"status":"ready"}"#)
                } else {
                    respond(
                        &mut stream,
                        503,
                        "application/json",
                        r#"{"status":"not ready"}"#,
                    )
                }
            }
            "/metrics" => {
                let body = self.metrics.gather();
                respond(&mut stream, 200, "text/plain; version=0.0.4", &body)
            }
            _ => respond(&mut stream, 404, "text/plain", "Not Found"),
        }
    }
}

fn respond(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> std::io::Result<()> {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        503 => "Service Unavailable",
        _ => "Unknown",
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes())?;
    stream.flush()
}
