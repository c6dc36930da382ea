use parse_jsonnet::ast::Ast;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use parse_jsonnet::matcher::RangeRecovery;
use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateError {
  BeforeStart,
  AfterEnd,
  NotFound,
}

impl fmt::Display for LocateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      LocateError::BeforeStart => "before document start",
      LocateError::AfterEnd => "after document end",
      LocateError::NotFound => "no enclosing identifier",
    })
  }
}

impl Error for LocateError {}

/// Find the innermost expression whose range contains `pos`. Ranges are half-open, so a position
/// just past an expression's last character isn't in it. Expressions without a range of their own
/// get one recovered from tokens.
///
/// A position in the whitespace after the last expression on its line gets that expression, the
/// innermost one if several end there.
pub fn locate(ast: &Ast, pos: Position) -> Result<ExprId, LocateError> {
  let recovery = RangeRecovery::new(ast);
  let mut best: Option<(ExprId, LocationRange)> = None;
  // Ending furthest along the line of `pos`, at or before it.
  let mut line_last: Option<(ExprId, LocationRange)> = None;
  let mut start: Option<Position> = None;
  let mut end = Position::default();
  for id in ast.preorder() {
    let Ok(Some(range)) = recovery.expr_range(id) else {
      continue;
    };
    if range.begin == range.end {
      continue;
    }
    start = Some(start.map_or(range.begin, |s| s.min(range.begin)));
    end = end.max(range.end);
    if range.end.line == pos.line && range.end <= pos {
      let further = line_last.as_ref().map_or(true, |(_, l)| {
        range.end > l.end || (range.end == l.end && l.contains_range(&range))
      });
      if further {
        line_last = Some((id, range.clone()));
      }
    }
    if !range.contains(pos) {
      continue;
    }
    // Equal ranges go to the descendant, which comes later.
    if best.as_ref().map_or(true, |(_, b)| b.contains_range(&range)) {
      best = Some((id, range));
    }
  }
  match (best, line_last, start) {
    (Some((id, _)), _, _) => Ok(id),
    (None, _, Some(start)) if pos < start => Err(LocateError::BeforeStart),
    (None, Some((id, _)), _) => Ok(id),
    (None, None, Some(_)) if pos >= end => Err(LocateError::AfterEnd),
    _ => Err(LocateError::NotFound),
  }
}

#[cfg(test)]
mod tests {
  use super::locate;
  use super::LocateError;
  use parse_jsonnet::ast::print::sexpr;
  use parse_jsonnet::loc::Position;
  use parse_jsonnet::parse;

  fn at(code: &str, line: u32, column: u32) -> Result<String, LocateError> {
    let ast = parse(None, code).unwrap();
    locate(&ast, Position::new(line, column)).map(|id| sexpr(&ast, id))
  }

  #[test]
  fn test_locate_innermost() {
    assert_eq!(at("local a=\"1\";a", 1, 13).unwrap(), "a");
    assert_eq!(at("local a=\"1\";a", 1, 9).unwrap(), "\"1\"");
    assert_eq!(at("{ a: [1, 22] }", 1, 11).unwrap(), "22");
    assert_eq!(at("{ a: [1, 22] }", 1, 8).unwrap(), "[1 22]");
    assert_eq!(at("x.y", 1, 3).unwrap(), "\"y\"");
  }

  #[test]
  fn test_locate_method_body() {
    let code = "{ f(x):: x }";
    let func = at(code, 1, 4).unwrap();
    assert_eq!(func, "(fn (x) x)");
    assert_eq!(at(code, 1, 10).unwrap(), "x");
  }

  #[test]
  fn test_locate_errors() {
    assert_eq!(at("\n  1 + 2", 1, 1), Err(LocateError::BeforeStart));
    assert_eq!(at("1 + 2\n", 2, 1), Err(LocateError::AfterEnd));
    assert_eq!(at("1 + 2\n\n", 3, 1), Err(LocateError::AfterEnd));
    assert_eq!(at("[1,\n\n 2]", 2, 1).unwrap(), "[1 2]");
  }

  #[test]
  fn test_locate_trailing_whitespace() {
    assert_eq!(at("1 + 2\n", 1, 6).unwrap(), "2");
    assert_eq!(at("1 + 2   \n", 1, 9).unwrap(), "2");
    assert_eq!(at("local a = 1;\na  ", 2, 3).unwrap(), "a");
    assert_eq!(at("[1,\n 2]  ", 2, 7).unwrap(), "[1 2]");
  }
}
