//! Route matching: given a decoded header, find the first [`RoutePair`]
//! whose three fields all match, in order.
//!
//! Patterns are compiled once, at config-load time, into anchored regexes
//! (`^(?:pattern)$`) so that "does this regex fully match this string" is
//! answered by a single `is_match` call - equivalent to the leftmost-longest
//! full-string semantics this matcher is specified against, since matching
//! the whole anchored string doesn't depend on which alternative a
//! leftmost-first engine would otherwise have preferred. An empty pattern
//! is a wildcard and never touches the regex engine.

use regex::Regex;

use crate::config::{OutputRoute, RoutePair};
use crate::error::MatchError;
use crate::wire::InputRoute;

struct CompiledRoute {
  protocol: Option<Regex>,
  host: Option<Regex>,
  port: Option<Regex>,
  output: OutputRoute,
}

impl CompiledRoute {
  fn compile(pair: &RoutePair) -> Result<Self, MatchError> {
    Ok(Self {
      protocol: compile_field(&pair.input.protocol)?,
      host: compile_field(&pair.input.host)?,
      port: compile_field(&pair.input.port)?,
      output: pair.output.clone(),
    })
  }

  fn matches(&self, header: &InputRoute) -> bool {
    field_matches(&self.protocol, &header.protocol)
      && field_matches(&self.host, &header.host)
      && field_matches(&self.port, &header.port)
  }
}

fn compile_field(pattern: &str) -> Result<Option<Regex>, MatchError> {
  if pattern.is_empty() {
    return Ok(None);
  }
  let anchored = format!("^(?:{pattern})$");
  Regex::new(&anchored)
    .map(Some)
    .map_err(|source| MatchError::BadPattern {
      pattern: pattern.to_string(),
      source,
    })
}

fn field_matches(pattern: &Option<Regex>, value: &str) -> bool {
  match pattern {
    None => true,
    Some(re) => re.is_match(value),
  }
}

/// A [`ServerConfig`](crate::config::ServerConfig)'s route table, compiled
/// once and shared read-only across every connection handled by that
/// server's listeners.
pub struct Matcher {
  routes: Vec<CompiledRoute>,
}

impl Matcher {
  pub fn compile(routes: &[RoutePair]) -> Result<Self, MatchError> {
    let compiled = routes.iter().map(CompiledRoute::compile).collect::<Result<Vec<_>, _>>()?;
    Ok(Self { routes: compiled })
  }

  /// Returns the first matching route's output, or `None` if no route in
  /// the table matches `header`.
  pub fn find(&self, header: &InputRoute) -> Option<&OutputRoute> {
    self.routes.iter().find(|r| r.matches(header)).map(|r| &r.output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn forward(host: &str, port: u16) -> OutputRoute {
    OutputRoute::Forward {
      host: host.to_string(),
      port,
      recurse: false,
    }
  }

  #[test]
  fn empty_pattern_matches_anything() {
    let routes = vec![RoutePair {
      input: InputRoute::new("", "", ""),
      output: forward("h", 1),
    }];
    let matcher = Matcher::compile(&routes).unwrap();
    assert_eq!(
      matcher.find(&InputRoute::new("anything", "goes", "here")),
      Some(&forward("h", 1))
    );
  }

  #[test]
  fn literal_dot_matches_only_a_single_character_field() {
    let routes = vec![RoutePair {
      input: InputRoute::new(".", "", ""),
      output: forward("h", 1),
    }];
    let matcher = Matcher::compile(&routes).unwrap();
    assert!(matcher.find(&InputRoute::new("t", "", "")).is_some());
    assert!(matcher.find(&InputRoute::new("tcp", "", "")).is_none());
  }

  #[test]
  fn first_match_wins() {
    let routes = vec![
      RoutePair {
        input: InputRoute::new("tcp", "a", ""),
        output: forward("h1", 1),
      },
      RoutePair {
        input: InputRoute::new("tcp", ".*", ""),
        output: forward("h2", 2),
      },
    ];
    let matcher = Matcher::compile(&routes).unwrap();
    assert_eq!(matcher.find(&InputRoute::new("tcp", "a", "0")), Some(&forward("h1", 1)));
    assert_eq!(matcher.find(&InputRoute::new("tcp", "b", "0")), Some(&forward("h2", 2)));
  }

  #[test]
  fn no_match_returns_none() {
    let routes = vec![RoutePair {
      input: InputRoute::new("tcp", "a", ""),
      output: forward("h", 1),
    }];
    let matcher = Matcher::compile(&routes).unwrap();
    assert!(matcher.find(&InputRoute::new("tcp", "b", "0")).is_none());
  }

  #[test]
  fn empty_route_table_never_matches() {
    let matcher = Matcher::compile(&[]).unwrap();
    assert!(matcher.find(&InputRoute::new("tcp", "a", "0")).is_none());
  }

  #[test]
  fn bad_pattern_fails_to_compile() {
    let routes = vec![RoutePair {
      input: InputRoute::new("(", "", ""),
      output: forward("h", 1),
    }];
    assert!(matches!(Matcher::compile(&routes), Err(MatchError::BadPattern { .. })));
  }

  #[test]
  fn port_is_matched_as_decimal_string() {
    let routes = vec![RoutePair {
      input: InputRoute::new("", "", "80|443"),
      output: forward("h", 1),
    }];
    let matcher = Matcher::compile(&routes).unwrap();
    assert!(matcher.find(&InputRoute::new("tcp", "x", "443")).is_some());
    assert!(matcher.find(&InputRoute::new("tcp", "x", "4430")).is_none());
  }
}
