//! Command handlers
//!
//! Dispatches parsed commands against the blob store and eviction manager.
//! PUT and GET stream their payloads; neither buffers a whole blob in
//! memory.

use super::Server;
use crate::config::AccessPolicy;
use crate::error::ProtocolError;
use crate::protocol::{Command, HEADER_SIZE, ResponseWriter};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Execute a parsed command
pub async fn execute(
    server: &Arc<Server>,
    cmd: Command,
    stream: &mut TcpStream,
) -> crate::Result<()> {
    match cmd {
        Command::Get { signature, name } => {
            server.metrics.cmd_get.inc();
            handle_get(server, &signature, &name, stream).await
        }
        Command::Put {
            signature,
            name,
            size,
        } => {
            server.metrics.cmd_put.inc();
            handle_put(server, &signature, &name, size, stream).await
        }
        Command::List => {
            server.metrics.cmd_lst.inc();
            handle_list(server, stream).await
        }
        Command::Clean => {
            server.metrics.cmd_cln.inc();
            server.evictor.trigger().await;
            Ok(())
        }
        Command::Reset => {
            server.metrics.cmd_rst.inc();
            server.store.reset().await?;
            Ok(())
        }
        Command::Bye => {
            // Handled in the connection loop
            Ok(())
        }
    }
}

/// Handle GET: `<size>,` header (`-1` for a miss) then the raw bytes
async fn handle_get(
    server: &Arc<Server>,
    signature: &str,
    name: &str,
    stream: &mut TcpStream,
) -> crate::Result<()> {
    if server.config.policy == AccessPolicy::PutOnly {
        return refuse(server, stream, "GET").await;
    }

    match server.store.get(signature, name).await {
        Ok(Some(blob)) => {
            server.metrics.get_hits.inc();

            let mut response = ResponseWriter::new(HEADER_SIZE);
            response.size_header(blob.size as i64);
            stream.write_all(&response.take()).await?;

            let mut file = blob.file;
            let sent = tokio::io::copy(&mut file, stream).await?;
            server
                .metrics
                .bytes_written
                .inc_by(HEADER_SIZE as u64 + sent);
            Ok(())
        }
        Ok(None) => {
            server.metrics.get_misses.inc();

            let mut response = ResponseWriter::new(HEADER_SIZE);
            response.size_header(-1);
            stream.write_all(&response.take()).await?;
            server.metrics.bytes_written.inc_by(HEADER_SIZE as u64);
            Ok(())
        }
        Err(e) => {
            server.metrics.store_errors.inc();
            Err(e.into())
        }
    }
}

/// Handle PUT: consume exactly `size` payload bytes, store, then let the
/// eviction manager enforce the ceiling. No success response is sent.
async fn handle_put(
    server: &Arc<Server>,
    signature: &str,
    name: &str,
    size: u64,
    stream: &mut TcpStream,
) -> crate::Result<()> {
    if server.config.policy == AccessPolicy::GetOnly {
        return refuse(server, stream, "PUT").await;
    }

    match server.store.put(signature, name, size, &mut *stream).await {
        Ok(()) => {
            server.metrics.bytes_read.inc_by(size);
            server.evictor.trigger().await;
            Ok(())
        }
        Err(e) => {
            server.metrics.store_errors.inc();
            Err(e.into())
        }
    }
}

/// Handle LST: `<len>,` header then the newline-joined signature list
async fn handle_list(server: &Arc<Server>, stream: &mut TcpStream) -> crate::Result<()> {
    let body = server.store.signatures().join("\n");

    let mut response = ResponseWriter::new(HEADER_SIZE + body.len());
    response.size_header(body.len() as i64);
    response.payload(body.as_bytes());

    let buf = response.take();
    server.metrics.bytes_written.inc_by(buf.len() as u64);
    stream.write_all(&buf).await?;
    Ok(())
}

/// Write the `ERROR,` refusal header, then fail the connection.
///
/// Clients on the wrong side of a get-only/put-only split get a definite
/// answer instead of a hang.
async fn refuse(
    server: &Arc<Server>,
    stream: &mut TcpStream,
    verb: &'static str,
) -> crate::Result<()> {
    let mut response = ResponseWriter::new(HEADER_SIZE);
    response.error_header();
    stream.write_all(&response.take()).await?;
    server.metrics.bytes_written.inc_by(HEADER_SIZE as u64);
    server.metrics.protocol_errors.inc();
    Err(ProtocolError::Forbidden(verb).into())
}
