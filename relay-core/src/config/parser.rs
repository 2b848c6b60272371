//! Recursive-descent parser for the config grammar:
//!
//! ```text
//! file     := server*
//! server   := port "{" route* "}"
//! route    := "[" triple "]" "->" action
//! triple   := text ";" text ";" text
//! action   := "fail" | "rec"? "[" host_port "]"
//! host_port:= text ";" text
//! ```
//!
//! A clean `Lexer` does the byte-level work (whitespace/comments, bracket
//! nesting); this module only walks the grammar's states, expressed as the
//! three functions below instead of an explicit state variable.

use super::lexer::Lexer;
use super::{OutputRoute, RoutePair, ServerConfig};
use crate::error::ConfigError;
use crate::wire::InputRoute;

pub fn parse_bytes(input: &[u8]) -> Result<Vec<ServerConfig>, ConfigError> {
  let mut lexer = Lexer::new(input);
  let mut configs = Vec::new();

  loop {
    lexer.skip_ws_and_comments();
    if lexer.at_eof() {
      return Ok(configs);
    }
    configs.push(parse_server(&mut lexer)?);
  }
}

fn parse_server(lexer: &mut Lexer) -> Result<ServerConfig, ConfigError> {
  let port_str = lexer.read_digits();
  if port_str.is_empty() {
    return Err(ConfigError::BadPort(port_str));
  }
  let server_port: u16 = port_str
    .parse()
    .map_err(|_| ConfigError::BadPort(port_str.clone()))?;

  lexer.expect_byte(b'{')?;

  let mut routes = Vec::new();
  loop {
    if lexer.consume_if(b'}') {
      return Ok(ServerConfig { server_port, routes });
    }
    if lexer.at_eof() {
      return Err(ConfigError::UnexpectedEof);
    }
    routes.push(parse_route(lexer)?);
  }
}

fn parse_route(lexer: &mut Lexer) -> Result<RoutePair, ConfigError> {
  lexer.expect_byte(b'[')?;
  let body = lexer.read_bracketed()?;
  let fields: Vec<&str> = body.split(';').collect();
  if fields.len() != 3 {
    return Err(ConfigError::Arity {
      context: "input",
      expected: 3,
      found: fields.len(),
    });
  }
  let input = InputRoute::new(fields[0].trim(), fields[1].trim(), fields[2].trim());

  lexer.expect_str("->")?;
  let output = parse_output(lexer)?;

  Ok(RoutePair { input, output })
}

fn parse_output(lexer: &mut Lexer) -> Result<OutputRoute, ConfigError> {
  if lexer.peek_keyword("fail") {
    lexer.consume_n(4);
    return Ok(OutputRoute::Fail);
  }

  let recurse = if lexer.peek_keyword("rec") {
    lexer.consume_n(3);
    true
  } else {
    false
  };

  lexer.expect_byte(b'[')?;
  let body = lexer.read_bracketed()?;
  let fields: Vec<&str> = body.split(';').collect();
  if fields.len() != 2 {
    return Err(ConfigError::Arity {
      context: "output",
      expected: 2,
      found: fields.len(),
    });
  }

  let host = fields[0].trim().to_string();
  let port_str = fields[1].trim();
  let port: u16 = port_str
    .parse()
    .map_err(|_| ConfigError::BadPort(port_str.to_string()))?;

  Ok(OutputRoute::Forward { host, port, recurse })
}
