use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::route::Matcher;

pub async fn run(configs: Vec<ServerConfig>) {
  for config in configs {
    let matcher = match Matcher::compile(&config.routes) {
      Ok(m) => Arc::new(m),
      Err(e) => {
        error!(port = config.server_port, error = %e, "route table failed to compile, skipping this server");
        continue;
      }
    };

    start_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server_port)), matcher.clone()).await;
    start_listener(SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.server_port)), matcher).await;
  }
}

async fn start_listener(addr: SocketAddr, matcher: Arc<Matcher>) {
  let listener = match TcpListener::bind(addr).await {
    Ok(l) => l,
    Err(e) => {
      warn!(%addr, error = %e, "failed to bind listener");
      return;
    }
  };
  info!(%addr, "listening");

  tokio::spawn(async move {
    loop {
      match listener.accept().await {
        Ok((socket, peer)) => {
          let matcher = matcher.clone();
          tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &matcher).await {
              warn!(%peer, error = %e, "connection ended with error");
            }
          });
        }
        Err(e) => {
          warn!(%addr, error = %e, "accept failed");
        }
      }
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{OutputRoute, RoutePair};
  use crate::wire::{self, InputRoute};
  use std::time::Duration;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpStream;

  #[tokio::test]
  async fn a_config_with_a_bad_pattern_is_skipped_without_panicking() {
    let configs = vec![ServerConfig {
      server_port: 0,
      routes: vec![RoutePair {
        input: InputRoute::new("(", "", ""),
        output: OutputRoute::Fail,
      }],
    }];
    // Should return promptly having logged and skipped, not panic or hang.
    tokio::time::timeout(Duration::from_secs(1), run(configs)).await.unwrap();
  }

  #[tokio::test]
  async fn a_running_listener_accepts_and_routes_connections() {
    let echo = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let echo_addr = echo.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut conn, _) = echo.accept().await.unwrap();
      let mut buf = [0u8; 3];
      conn.read_exact(&mut buf).await.unwrap();
      conn.write_all(&buf).await.unwrap();
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let matcher = Arc::new(
      Matcher::compile(&[RoutePair {
        input: InputRoute::new("", "", ""),
        output: OutputRoute::Forward {
          host: echo_addr.ip().to_string(),
          port: echo_addr.port(),
          recurse: false,
        },
      }])
      .unwrap(),
    );

    tokio::spawn(async move {
      loop {
        let (socket, _) = listener.accept().await.unwrap();
        let matcher = matcher.clone();
        tokio::spawn(async move {
          handle_connection(socket, &matcher).await.ok();
        });
      }
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    wire::write_header(&mut client, &InputRoute::new("tcp", "", "0")).await.unwrap();
    client.write_all(b"hey").await.unwrap();

    let mut response = [0u8; 3];
    client.read_exact(&mut response).await.unwrap();
    assert_eq!(&response, b"hey");
  }
}
