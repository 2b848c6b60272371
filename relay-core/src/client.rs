//! The dialer side of the relay: connects to a server, sends the framed
//! header declaring what this connection wants, then pipes stdin/stdout
//! through the resulting socket.

use tokio::io::{self, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;

use crate::error::ClientError;
use crate::wire::{self, InputRoute};

/// Parameters for a single `connect` invocation. `local_port` is an `i32`
/// rather than `Option<u16>` so that negative and out-of-range values are
/// representable directly from CLI input and fall through to "let the OS
/// pick" rather than being rejected before `connect` even runs.
pub struct ConnectOptions {
  pub protocol: String,
  pub host: String,
  pub port: u16,
  pub local_port: i32,
  pub output_port: bool,
}

/// Resolves `host:port`, optionally binds a specific local port, connects,
/// announces the connection's identity via the framed header, then relays
/// stdin to the socket and the socket to stdout until one side closes.
pub async fn connect(opts: ConnectOptions) -> Result<(), ClientError> {
  let mut stream = dial(&opts).await?;
  let _ = stream.set_nodelay(true);

  if opts.output_port {
    let local_port = stream.local_addr().map(|a| a.port()).unwrap_or(0);
    io::stdout()
      .write_all(&(local_port as u32).to_be_bytes())
      .await
      .map_err(ClientError::PortWrite)?;
    io::stdout().flush().await.map_err(ClientError::PortWrite)?;
  }

  let header = InputRoute::new(opts.protocol, opts.host, opts.port.to_string());
  wire::write_header(&mut stream, &header).await?;

  relay(stream).await
}

async fn dial(opts: &ConnectOptions) -> Result<TcpStream, ClientError> {
  let target = format!("{}:{}", opts.host, opts.port);
  let mut addrs = tokio::net::lookup_host(&target)
    .await
    .map_err(|source| ClientError::Connect {
      host: opts.host.clone(),
      port: opts.port,
      source,
    })?;
  let addr = addrs.next().ok_or_else(|| ClientError::Connect {
    host: opts.host.clone(),
    port: opts.port,
    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved"),
  })?;

  if let Ok(local_port) = u16::try_from(opts.local_port) {
    let socket = if addr.is_ipv4() {
      TcpSocket::new_v4()
    } else {
      TcpSocket::new_v6()
    }
    .map_err(|source| ClientError::LocalBind(local_port, source))?;
    let bind_addr = if addr.is_ipv4() {
      std::net::SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, local_port))
    } else {
      std::net::SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, local_port))
    };
    socket
      .bind(bind_addr)
      .map_err(|source| ClientError::LocalBind(local_port, source))?;
    socket.connect(addr).await.map_err(|source| ClientError::Connect {
      host: opts.host.clone(),
      port: opts.port,
      source,
    })
  } else {
    TcpStream::connect(addr).await.map_err(|source| ClientError::Connect {
      host: opts.host.clone(),
      port: opts.port,
      source,
    })
  }
}

/// Pipes stdin into the socket (shutting the write half down, not the whole
/// socket, once stdin hits EOF) while the main task copies the socket's
/// replies to stdout. Distinct from the server's first-done-wins splice:
/// here a half-close lets a server that still has more to say keep talking
/// after the local input source is exhausted.
async fn relay(stream: TcpStream) -> Result<(), ClientError> {
  let (mut reader, mut writer) = stream.into_split();

  let stdin_task = tokio::spawn(async move {
    let mut stdin = io::stdin();
    let result = io::copy(&mut stdin, &mut writer).await;
    if let Err(e) = &result {
      debug!(error = %e, "stdin->socket copy ended");
    }
    let _ = writer.shutdown().await;
  });

  let mut stdout = io::stdout();
  io::copy(&mut reader, &mut stdout).await?;

  let _ = stdin_task.await;
  Ok(())
}
