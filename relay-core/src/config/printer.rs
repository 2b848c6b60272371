//! Canonical printer: renders a parsed `[ServerConfig]` back into the
//! grammar from `parser.rs`. Exists so that `render` composed with `parse`
//! is idempotent - reparsing a rendered config yields the same AST, since
//! the parser trims whitespace around every field and is otherwise
//! insensitive to formatting choices made here.

use super::{OutputRoute, ServerConfig};
use std::fmt::Write as _;

pub fn render(configs: &[ServerConfig]) -> String {
  let mut out = String::new();
  for cfg in configs {
    let _ = writeln!(out, "{} {{", cfg.server_port);
    for route in &cfg.routes {
      let _ = write!(
        out,
        "  [{}; {}; {}] -> ",
        route.input.protocol, route.input.host, route.input.port
      );
      match &route.output {
        OutputRoute::Fail => {
          let _ = writeln!(out, "fail");
        }
        OutputRoute::Forward { host, port, recurse } => {
          if *recurse {
            let _ = write!(out, "rec ");
          }
          let _ = writeln!(out, "[{host}; {port}]");
        }
      }
    }
    let _ = writeln!(out, "}}");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::super::parser::parse_bytes;
  use super::*;

  #[test]
  fn render_then_reparse_is_idempotent() {
    let text = br#"
      8080 {
        [tcp; example\.com; .*] -> [10.0.0.5; 9000]
        [udp; ; 53] -> fail
        [; ; ] -> rec [relay.local; 8080]
      }
      9000 { }
    "#;
    let configs = parse_bytes(text).unwrap();
    let rendered = render(&configs);
    let reparsed = parse_bytes(rendered.as_bytes()).unwrap();
    assert_eq!(configs, reparsed);
  }
}
