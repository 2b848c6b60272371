//! The header frame shared by every connection: 4 bytes big-endian length
//! followed by that many bytes of UTF-8 JSON encoding an [`InputRoute`].
//!
//! This is the only thing that crosses the wire before payload bytes; there
//! is no framing on the response side, and payload itself is never framed.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FramingError;

/// Upper bound on header length. The source protocol has no such bound;
/// this cap exists so a malicious or buggy peer can't make us allocate an
/// unbounded buffer before we've even looked at a single header field.
pub const MAX_HEADER_LEN: u32 = 64 * 1024;

/// A client's declaration of its logical identity: protocol tag, target
/// host, and target port (destination port, rendered as a decimal string -
/// not the client's own source port, despite the field name's ambiguity).
///
/// An empty string in any field is a wildcard at match time; it carries no
/// special meaning on the wire itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRoute {
  pub protocol: String,
  pub host: String,
  pub port: String,
}

impl InputRoute {
  pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: impl Into<String>) -> Self {
    Self {
      protocol: protocol.into(),
      host: host.into(),
      port: port.into(),
    }
  }
}

/// Reads a framed header off `reader`: 4-byte big-endian length, then that
/// many bytes parsed as JSON. A partial read of either the length or the
/// body yields [`FramingError::ShortHeader`]; invalid JSON (including an
/// empty body) yields [`FramingError::MalformedHeader`].
pub async fn read_header<R>(reader: &mut R) -> Result<InputRoute, FramingError>
where
  R: AsyncRead + Unpin,
{
  let mut len_buf = [0u8; 4];
  read_exact_or_short(reader, &mut len_buf).await?;
  let len = u32::from_be_bytes(len_buf);
  if len > MAX_HEADER_LEN {
    return Err(FramingError::HeaderTooLarge(len));
  }

  let mut body = vec![0u8; len as usize];
  read_exact_or_short(reader, &mut body).await?;
  let header: InputRoute = serde_json::from_slice(&body)?;
  Ok(header)
}

/// Writes `route` framed the same way [`read_header`] expects to read it,
/// flushing so the header is fully on the wire before any payload follows
/// on the same socket.
pub async fn write_header<W>(writer: &mut W, route: &InputRoute) -> Result<(), FramingError>
where
  W: AsyncWrite + Unpin,
{
  let body = serde_json::to_vec(route)?;
  let len = body.len() as u32;
  writer.write_all(&len.to_be_bytes()).await?;
  writer.write_all(&body).await?;
  writer.flush().await?;
  Ok(())
}

async fn read_exact_or_short<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), FramingError>
where
  R: AsyncRead + Unpin,
{
  match reader.read_exact(buf).await {
    Ok(_) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(FramingError::ShortHeader),
    Err(e) => Err(FramingError::Io(e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[tokio::test]
  async fn round_trips_through_the_wire() {
    let route = InputRoute::new("tcp", "example.com", "9000");
    let mut buf = Vec::new();
    write_header(&mut buf, &route).await.unwrap();

    let mut cursor = Cursor::new(buf);
    let decoded = read_header(&mut cursor).await.unwrap();
    assert_eq!(decoded, route);
  }

  #[tokio::test]
  async fn empty_body_is_malformed_not_short() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0u32.to_be_bytes());
    let mut cursor = Cursor::new(buf);
    let err = read_header(&mut cursor).await.unwrap_err();
    assert!(matches!(err, FramingError::MalformedHeader(_)));
  }

  #[tokio::test]
  async fn truncated_length_is_short() {
    let mut cursor = Cursor::new(vec![0u8, 0u8]);
    let err = read_header(&mut cursor).await.unwrap_err();
    assert!(matches!(err, FramingError::ShortHeader));
  }

  #[tokio::test]
  async fn truncated_body_is_short() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&100u32.to_be_bytes());
    buf.extend_from_slice(b"{\"proto");
    let mut cursor = Cursor::new(buf);
    let err = read_header(&mut cursor).await.unwrap_err();
    assert!(matches!(err, FramingError::ShortHeader));
  }

  #[tokio::test]
  async fn oversized_length_is_rejected_before_allocating() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(MAX_HEADER_LEN + 1).to_be_bytes());
    let mut cursor = Cursor::new(buf);
    let err = read_header(&mut cursor).await.unwrap_err();
    assert!(matches!(err, FramingError::HeaderTooLarge(n) if n == MAX_HEADER_LEN + 1));
  }

  #[tokio::test]
  async fn unknown_fields_are_tolerated() {
    let mut buf = Vec::new();
    let body = br#"{"protocol":"tcp","host":"h","port":"1","extra":true}"#;
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(body);
    let mut cursor = Cursor::new(buf);
    let decoded = read_header(&mut cursor).await.unwrap();
    assert_eq!(decoded, InputRoute::new("tcp", "h", "1"));
  }
}
