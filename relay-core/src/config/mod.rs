//! The config language: a hand-rolled lexer/parser for the nested,
//! brace-and-bracket grammar in the crate-level docs, plus a canonical
//! printer used to check idempotence under re-parsing.

mod lexer;
mod parser;
mod printer;

use crate::wire::InputRoute;

pub use parser::parse_bytes;
pub use printer::render;

/// One route's action: refuse the connection, or forward it somewhere,
/// optionally re-emitting the header on the downstream leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRoute {
  Fail,
  Forward { host: String, port: u16, recurse: bool },
}

/// A single `[triple] -> action` line: the input pattern paired with what
/// to do when it matches. Order inside a [`ServerConfig`] is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePair {
  pub input: InputRoute,
  pub output: OutputRoute,
}

/// One listener config: a port plus its ordered route table. An empty
/// `routes` table is valid - every connection is refused after header
/// decode, since `Matcher::find` finds nothing to match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub server_port: u16,
  pub routes: Vec<RoutePair>,
}

/// Parses a complete config source (a file, or any other byte source) into
/// its list of server specs. The byte source is read to completion before
/// any parsing begins; config files are expected to be small.
pub fn parse<R: std::io::Read>(mut reader: R) -> Result<Vec<ServerConfig>, crate::error::ConfigError> {
  let mut buf = Vec::new();
  std::io::Read::read_to_end(&mut reader, &mut buf)?;
  parse_bytes(&buf)
}
