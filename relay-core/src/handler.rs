//! Per-connection handling: read the framed header, match it against a
//! server's route table, dial the chosen target (or refuse), optionally
//! recurse the header onto the downstream leg, then splice.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::config::OutputRoute;
use crate::error::HandlerError;
use crate::route::Matcher;
use crate::wire::{self, InputRoute};

/// How long to wait for a complete header before giving up on a connection.
/// Bounds slowloris-style stalls; only the header read is timed, never the
/// payload splice that follows.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Handles one accepted connection end to end. `socket` is consumed and
/// closed (directly or via the splice) on every return path.
pub async fn handle_connection(mut socket: TcpStream, matcher: &Matcher) -> Result<(), HandlerError> {
  let header = read_header_with_timeout(&mut socket).await?;

  let output = matcher
    .find(&header)
    .cloned()
    .ok_or_else(|| HandlerError::NoRoute {
      protocol: header.protocol.clone(),
      host: header.host.clone(),
      port: header.port.clone(),
    })?;

  match output {
    OutputRoute::Fail => Err(HandlerError::ExplicitFail {
      protocol: header.protocol,
      host: header.host,
    }),
    OutputRoute::Forward { host, port, recurse } => {
      forward(socket, header, host, port, recurse).await
    }
  }
}

async fn read_header_with_timeout(socket: &mut TcpStream) -> Result<InputRoute, HandlerError> {
  match tokio::time::timeout(HEADER_READ_TIMEOUT, wire::read_header(socket)).await {
    Ok(result) => Ok(result?),
    Err(_) => Err(HandlerError::HeaderTimeout),
  }
}

async fn forward(
  socket: TcpStream,
  header: InputRoute,
  host: String,
  port: u16,
  recurse: bool,
) -> Result<(), HandlerError> {
  let mut target = TcpStream::connect((host.as_str(), port))
    .await
    .map_err(|source| HandlerError::Dial { host, port, source })?;
  let _ = target.set_nodelay(true);

  if recurse {
    wire::write_header(&mut target, &header)
      .await
      .map_err(HandlerError::RecurseWrite)?;
  }

  splice(socket, target).await;
  Ok(())
}

/// Bidirectional copy until either direction ends, then both sockets are
/// dropped. This bounds the resource lifetime of a handler at the cost of
/// not draining whichever side is still open when the other closes first -
/// a deliberate choice, not an oversight.
async fn splice(mut upstream: TcpStream, mut downstream: TcpStream) {
  let (mut ur, mut uw) = upstream.split();
  let (mut dr, mut dw) = downstream.split();

  let upstream_to_downstream = tokio::io::copy(&mut ur, &mut dw);
  let downstream_to_upstream = tokio::io::copy(&mut dr, &mut uw);

  tokio::select! {
    result = upstream_to_downstream => {
      if let Err(e) = result {
        debug!(error = %e, "upstream->downstream copy ended");
      }
    }
    result = downstream_to_upstream => {
      if let Err(e) = result {
        debug!(error = %e, "downstream->upstream copy ended");
      }
    }
  }
}
