use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("port '{0}' is not a valid port number (must be 0-65535)")]
  BadPort(String),

  #[error("expected '{expected}', found '{found}'")]
  Expect { expected: String, found: String },

  #[error("unexpected end of input while parsing config")]
  UnexpectedEof,

  #[error("{context} route must have exactly {expected} ';'-separated fields, found {found}")]
  Arity {
    context: &'static str,
    expected: usize,
    found: usize,
  },

  #[error("failed to read config source: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FramingError {
  #[error("connection closed before a complete header was received")]
  ShortHeader,

  #[error("header length {0} exceeds the maximum permitted size ({max} bytes)", max = crate::wire::MAX_HEADER_LEN)]
  HeaderTooLarge(u32),

  #[error("header was not valid JSON: {0}")]
  MalformedHeader(#[from] serde_json::Error),

  #[error("I/O error while framing header: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MatchError {
  #[error("failed to compile route pattern '{pattern}': {source}")]
  BadPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },
}

#[derive(Debug, Error)]
pub enum HandlerError {
  #[error(transparent)]
  Framing(#[from] FramingError),

  #[error("timed out waiting for header")]
  HeaderTimeout,

  #[error("unmapped header: no route matched protocol={protocol:?} host={host:?} port={port:?}")]
  NoRoute {
    protocol: String,
    host: String,
    port: String,
  },

  #[error("explicit fail route matched for protocol={protocol:?} host={host:?}")]
  ExplicitFail { protocol: String, host: String },

  #[error("failed to dial target {host}:{port}: {source}")]
  Dial {
    host: String,
    port: u16,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write recursed header to downstream: {0}")]
  RecurseWrite(#[source] FramingError),
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("failed to resolve or connect to {host}:{port}: {source}")]
  Connect {
    host: String,
    port: u16,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to bind local port {0}: {1}")]
  LocalBind(u16, #[source] std::io::Error),

  #[error(transparent)]
  Framing(#[from] FramingError),

  #[error("failed to write local port to stdout: {0}")]
  PortWrite(#[source] std::io::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}
