//! Per-connection request loop
//!
//! Strictly sequential: each request is read, acted on and answered before
//! the next header is awaited. There is no pipelining. Any protocol
//! violation or handler failure terminates the connection; the peer treats
//! that exactly like a miss and recomputes.

use super::Server;
use super::handler;
use crate::protocol::{Command, HEADER_SIZE, parse_header};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, trace};

/// Handle a single client connection
pub async fn handle(
    server: Arc<Server>,
    mut stream: TcpStream,
    _permit: OwnedSemaphorePermit,
) -> anyhow::Result<()> {
    let result = request_loop(&server, &mut stream).await;
    server.metrics.active_connections.dec();
    result
}

async fn request_loop(server: &Arc<Server>, stream: &mut TcpStream) -> anyhow::Result<()> {
    let idle = Duration::from_secs(server.config.idle_timeout_secs);
    let mut header = [0u8; HEADER_SIZE];

    loop {
        let got_header = tokio::select! {
            _ = server.cancel_token.cancelled() => return Ok(()),
            result = await_header(stream, &mut header, idle) => result?,
        };
        if !got_header {
            return Ok(());
        }
        server.metrics.bytes_read.inc_by(HEADER_SIZE as u64);

        let cmd = match parse_header(&header) {
            Ok(cmd) => cmd,
            Err(e) => {
                server.metrics.protocol_errors.inc();
                debug!(error = %e, "protocol violation, closing connection");
                return Ok(());
            }
        };
        trace!(verb = cmd.verb(), "dispatching");

        if matches!(cmd, Command::Bye) {
            return Ok(());
        }

        // A handler error aborts this connection only; the spawn site logs
        // it at debug.
        handler::execute(server, cmd, stream).await?;
    }
}

/// Await the next 128-byte header, subject to the idle timeout.
///
/// Returns `Ok(false)` when the connection should be closed quietly: the
/// peer went away or sat idle too long.
async fn await_header(
    stream: &mut TcpStream,
    header: &mut [u8; HEADER_SIZE],
    idle: Duration,
) -> anyhow::Result<bool> {
    let read = stream.read_exact(header);
    let result = if idle.is_zero() {
        read.await
    } else {
        match tokio::time::timeout(idle, read).await {
            Ok(result) => result,
            Err(_) => {
                debug!("connection idle for {:?}, closing", idle);
                return Ok(false);
            }
        }
    };

    match result {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}
