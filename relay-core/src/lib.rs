//! Core library for a protocol-agnostic TCP relay: a client announces what
//! it wants over a short framed header, and the server routes the
//! connection according to a small config language of pattern-matched
//! rules, either refusing it, forwarding it verbatim, or forwarding it with
//! the header re-attached for the next hop to route again.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod route;
pub mod supervisor;
pub mod wire;

pub use client::{connect, ConnectOptions};
pub use config::{parse, OutputRoute, RoutePair, ServerConfig};
pub use error::{ClientError, ConfigError, FramingError, HandlerError, MatchError};
pub use route::Matcher;
pub use supervisor::run as run_servers;
pub use wire::InputRoute;
