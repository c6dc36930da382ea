//! Grammar-aware matching over a token stream.
//!
//! The AST drops some sub-ranges while desugaring (a field's full extent, a method's parameter list,
//! the `for` of a comprehension). The matcher recovers them by replaying grammar productions over the
//! tokens from a known anchor, without building any nodes. Every production takes the index of the
//! token the construct is believed to start at and returns the index of its last token. `Ok(None)`
//! means the production doesn't apply at that token, which lets callers try alternatives; `Err` is a
//! hard syntax error inside a construct that did start.
//!
//! Precedence isn't enforced: operators and postfix forms are consumed greedily, since only
//! construct boundaries matter here.

use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::LocationRange;
use crate::loc::Position;
use crate::token::Token;
use crate::token::TT;

pub mod ranges;
#[cfg(test)]
mod tests;

pub use ranges::RangeRecovery;

/// Token indices of one comprehension clause.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CompSpecSpan {
  // The `for` or `if` keyword.
  pub keyword: usize,
  // The bound identifier of a `for` clause.
  pub variable: Option<usize>,
  pub end: usize,
}

/// Inclusive token index span.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
  pub start: usize,
  pub end: usize,
}

fn is_unary_operator(t: &Token) -> bool {
  t.typ == TT::Operator && matches!(t.text.as_str(), "-" | "+" | "!" | "~")
}

fn is_binary_operator(t: &Token) -> bool {
  t.typ == TT::KeywordIn
    || (t.typ == TT::Operator
      && matches!(
        t.text.as_str(),
        "*" | "/" | "%" | "+" | "-" | "<<" | ">>" | "<" | "<=" | ">" | ">=" | "==" | "!=" | "&" | "^" | "|" | "&&" | "||"
      ))
}

fn is_field_operator(t: &Token) -> bool {
  t.typ == TT::Operator && matches!(t.text.as_str(), ":" | "::" | ":::" | "+:" | "+::" | "+:::")
}

pub struct Matcher<'t> {
  tokens: &'t [Token],
}

impl<'t> Matcher<'t> {
  pub fn new(tokens: &'t [Token]) -> Matcher<'t> {
    Matcher { tokens }
  }

  pub fn tokens(&self) -> &'t [Token] {
    self.tokens
  }

  /// The token at `i`; indices past the end yield the final `EOF` token.
  pub fn token(&self, i: usize) -> &'t Token {
    let last = self.tokens.len().saturating_sub(1);
    &self.tokens[i.min(last)]
  }

  fn typ(&self, i: usize) -> TT {
    if self.tokens.is_empty() {
      return TT::EOF;
    }
    self.token(i).typ
  }

  fn expect(&self, i: usize, typ: TT) -> SyntaxResult<usize> {
    if self.typ(i) == typ {
      Ok(i)
    } else {
      Err(self.token(i).error(SyntaxErrorType::RequiredTokenNotFound(typ)))
    }
  }

  fn expect_operator(&self, i: usize, text: &'static str) -> SyntaxResult<usize> {
    if self.token(i).is_operator(text) {
      Ok(i)
    } else {
      Err(self.token(i).error(SyntaxErrorType::ExpectedSyntax(text)))
    }
  }

  /// Like a production, but a construct that doesn't start at `i` is an error.
  fn require<F: FnOnce(&Self, usize) -> SyntaxResult<Option<usize>>>(
    &self,
    i: usize,
    production: F,
    expected: &'static str,
  ) -> SyntaxResult<usize> {
    production(self, i)?.ok_or_else(|| self.token(i).error(SyntaxErrorType::ExpectedSyntax(expected)))
  }

  fn require_expr(&self, i: usize) -> SyntaxResult<usize> {
    self.require(i, Self::expr, "expression")
  }

  /// Index of the token whose range contains `pos`.
  pub fn token_index_at(&self, pos: Position) -> Option<usize> {
    let i = self.tokens.partition_point(|t| t.range.end <= pos);
    let t = self.tokens.get(i)?;
    (t.typ != TT::EOF && t.range.contains(pos)).then_some(i)
  }

  /// Index of the token starting at byte offset `offset`.
  pub fn token_index_starting_at(&self, offset: usize) -> Option<usize> {
    let i = self.tokens.partition_point(|t| t.loc.0 < offset);
    let t = self.tokens.get(i)?;
    (t.loc.0 == offset && t.typ != TT::EOF).then_some(i)
  }

  /// Index of the first token starting at or after byte offset `offset`.
  pub fn token_index_from(&self, offset: usize) -> usize {
    self.tokens.partition_point(|t| t.loc.0 < offset)
  }

  /// Range from the start of token `start` to the end of token `end`.
  pub fn range(&self, start: usize, end: usize) -> LocationRange {
    let a = self.token(start);
    let b = self.token(end);
    LocationRange::new(a.range.file.clone(), a.range.begin, b.range.end)
  }

  pub fn expr(&self, i: usize) -> SyntaxResult<Option<usize>> {
    let t = self.token(i);
    let end = match t.typ {
      TT::KeywordLocal => {
        let mut j = i + 1;
        loop {
          let bind_end = self.bind(j)?;
          if self.typ(bind_end + 1) == TT::Comma {
            j = bind_end + 2;
            continue;
          }
          let semicolon = self.expect(bind_end + 1, TT::Semicolon)?;
          return self.require_expr(semicolon + 1).map(Some);
        }
      }
      TT::KeywordIf => {
        let cond_end = self.require_expr(i + 1)?;
        let then = self.expect(cond_end + 1, TT::KeywordThen)?;
        let then_end = self.require_expr(then + 1)?;
        if self.typ(then_end + 1) == TT::KeywordElse {
          return self.require_expr(then_end + 2).map(Some);
        }
        return Ok(Some(then_end));
      }
      TT::KeywordFunction => {
        let close = self.require(i + 1, Self::params, "parameter list")?;
        return self.require_expr(close + 1).map(Some);
      }
      TT::KeywordAssert => {
        let mut end = self.require_expr(i + 1)?;
        if self.token(end + 1).is_operator(":") {
          end = self.require_expr(end + 2)?;
        }
        let semicolon = self.expect(end + 1, TT::Semicolon)?;
        return self.require_expr(semicolon + 1).map(Some);
      }
      TT::KeywordError => return self.require_expr(i + 1).map(Some),
      TT::KeywordImport | TT::KeywordImportbin | TT::KeywordImportstr => {
        if !self.typ(i + 1).is_string() {
          return Err(self.token(i + 1).error(SyntaxErrorType::ExpectedSyntax("import path string")));
        }
        i + 1
      }
      TT::Operator if is_unary_operator(t) => return self.require_expr(i + 1).map(Some),
      _ => match self.primary(i)? {
        Some(end) => end,
        None => return Ok(None),
      },
    };
    self.continuation(end).map(Some)
  }

  fn primary(&self, i: usize) -> SyntaxResult<Option<usize>> {
    let t = self.token(i);
    if t.typ.is_string() {
      return Ok(Some(i));
    }
    Ok(Some(match t.typ {
      TT::Identifier
      | TT::LiteralNumber
      | TT::KeywordTrue
      | TT::KeywordFalse
      | TT::KeywordNull
      | TT::KeywordSelf
      | TT::Dollar => i,
      TT::KeywordSuper => match self.typ(i + 1) {
        TT::Dot => self.expect(i + 2, TT::Identifier)?,
        TT::BracketOpen => {
          let end = self.require_expr(i + 2)?;
          self.expect(end + 1, TT::BracketClose)?
        }
        _ => {
          return Err(self.token(i + 1).error(SyntaxErrorType::ExpectedSyntax("'.' or '[' after super")));
        }
      },
      TT::ParenthesisOpen => {
        let end = self.require_expr(i + 1)?;
        self.expect(end + 1, TT::ParenthesisClose)?
      }
      TT::BraceOpen => return self.object(i),
      TT::BracketOpen => return self.array(i),
      _ => return Ok(None),
    }))
  }

  /// Postfix forms and binary operators following an operand that ends at `end`.
  fn continuation(&self, mut end: usize) -> SyntaxResult<usize> {
    loop {
      let next = self.token(end + 1);
      end = match next.typ {
        TT::Dot => self.expect(end + 2, TT::Identifier)?,
        TT::BracketOpen => self.require(end + 1, Self::slice, "subscript")?,
        TT::ParenthesisOpen => {
          let close = self.require(end + 1, Self::args, "argument list")?;
          if self.typ(close + 1) == TT::KeywordTailstrict {
            close + 1
          } else {
            close
          }
        }
        TT::BraceOpen => self.require(end + 1, Self::object, "object")?,
        TT::KeywordIn if self.typ(end + 2) == TT::KeywordSuper => end + 2,
        _ if is_binary_operator(next) => return self.require_expr(end + 2),
        _ => return Ok(end),
      };
    }
  }

  /// `x = e` or `f(params) = e`, starting at the identifier.
  pub fn bind(&self, i: usize) -> SyntaxResult<usize> {
    let mut j = self.expect(i, TT::Identifier)?;
    if self.typ(j + 1) == TT::ParenthesisOpen {
      j = self.require(j + 1, Self::params, "parameter list")?;
    }
    let eq = self.expect_operator(j + 1, "=")?;
    self.require_expr(eq + 1)
  }

  /// A parenthesised, comma separated list starting at `(`; returns each element's span and the
  /// index of `)`.
  fn list(
    &self,
    i: usize,
    element: impl Fn(&Self, usize) -> SyntaxResult<usize>,
  ) -> SyntaxResult<Option<(Vec<Span>, usize)>> {
    if self.typ(i) != TT::ParenthesisOpen {
      return Ok(None);
    }
    let mut spans = Vec::new();
    let mut j = i + 1;
    loop {
      if self.typ(j) == TT::ParenthesisClose {
        return Ok(Some((spans, j)));
      }
      let end = element(self, j)?;
      spans.push(Span { start: j, end });
      match self.typ(end + 1) {
        TT::Comma => j = end + 2,
        TT::ParenthesisClose => return Ok(Some((spans, end + 1))),
        _ => {
          return Err(self.token(end + 1).error(SyntaxErrorType::RequiredTokenNotFound(TT::ParenthesisClose)));
        }
      }
    }
  }

  fn param(&self, i: usize) -> SyntaxResult<usize> {
    let name = self.expect(i, TT::Identifier)?;
    if self.token(name + 1).is_operator("=") {
      self.require_expr(name + 2)
    } else {
      Ok(name)
    }
  }

  fn arg(&self, i: usize) -> SyntaxResult<usize> {
    if self.typ(i) == TT::Identifier && self.token(i + 1).is_operator("=") {
      self.require_expr(i + 2)
    } else {
      self.require_expr(i)
    }
  }

  /// Parameter list starting at `(`.
  pub fn params(&self, i: usize) -> SyntaxResult<Option<usize>> {
    Ok(self.list(i, Self::param)?.map(|(_, close)| close))
  }

  pub fn param_spans(&self, i: usize) -> SyntaxResult<Option<Vec<Span>>> {
    Ok(self.list(i, Self::param)?.map(|(spans, _)| spans))
  }

  /// Argument list starting at `(`.
  pub fn args(&self, i: usize) -> SyntaxResult<Option<usize>> {
    Ok(self.list(i, Self::arg)?.map(|(_, close)| close))
  }

  pub fn arg_spans(&self, i: usize) -> SyntaxResult<Option<Vec<Span>>> {
    Ok(self.list(i, Self::arg)?.map(|(spans, _)| spans))
  }

  pub fn field_name(&self, i: usize) -> SyntaxResult<Option<usize>> {
    let t = self.token(i);
    if t.typ == TT::Identifier || t.typ.is_string() {
      return Ok(Some(i));
    }
    if t.typ == TT::BracketOpen {
      let end = self.require_expr(i + 1)?;
      return self.expect(end + 1, TT::BracketClose).map(Some);
    }
    Ok(None)
  }

  /// A field, `local` bind or `assert` inside an object.
  pub fn member(&self, i: usize) -> SyntaxResult<Option<usize>> {
    match self.typ(i) {
      TT::KeywordLocal => return self.bind(i + 1).map(Some),
      TT::KeywordAssert => {
        let end = self.require_expr(i + 1)?;
        if self.token(end + 1).is_operator(":") {
          return self.require_expr(end + 2).map(Some);
        }
        return Ok(Some(end));
      }
      _ => {}
    };
    let Some(mut end) = self.field_name(i)? else {
      return Ok(None);
    };
    if self.typ(end + 1) == TT::ParenthesisOpen {
      end = self.require(end + 1, Self::params, "parameter list")?;
    }
    if !is_field_operator(self.token(end + 1)) {
      return Err(self.token(end + 1).error(SyntaxErrorType::ExpectedSyntax("field operator")));
    }
    self.require_expr(end + 2).map(Some)
  }

  /// Object contents starting just after `{`; returns the index of `}`.
  pub fn object_body(&self, i: usize) -> SyntaxResult<usize> {
    let mut j = i;
    loop {
      if self.typ(j) == TT::BraceClose {
        return Ok(j);
      }
      let end = self.require(j, Self::member, "object member")?;
      let mut next = end + 1;
      if self.typ(next) == TT::Comma {
        next += 1;
        if self.typ(next) != TT::KeywordFor {
          j = next;
          continue;
        }
      }
      match self.typ(next) {
        TT::BraceClose => return Ok(next),
        TT::KeywordFor => {
          let specs = self.comp_specs(next)?;
          let last = specs.last().map(|s| s.end).unwrap_or(next);
          return self.expect(last + 1, TT::BraceClose);
        }
        _ => {
          return Err(self.token(next).error(SyntaxErrorType::RequiredTokenNotFound(TT::BraceClose)));
        }
      }
    }
  }

  /// Object starting at `{`.
  pub fn object(&self, i: usize) -> SyntaxResult<Option<usize>> {
    if self.typ(i) != TT::BraceOpen {
      return Ok(None);
    }
    self.object_body(i + 1).map(Some)
  }

  /// Array or array comprehension starting at `[`.
  pub fn array(&self, i: usize) -> SyntaxResult<Option<usize>> {
    if self.typ(i) != TT::BracketOpen {
      return Ok(None);
    }
    let mut j = i + 1;
    let mut first = true;
    loop {
      if self.typ(j) == TT::BracketClose {
        return Ok(Some(j));
      }
      let end = self.require_expr(j)?;
      let mut next = end + 1;
      if self.typ(next) == TT::Comma {
        next += 1;
      }
      if first && self.typ(next) == TT::KeywordFor {
        let specs = self.comp_specs(next)?;
        let last = specs.last().map(|s| s.end).unwrap_or(next);
        return self.expect(last + 1, TT::BracketClose).map(Some);
      }
      first = false;
      if next == end + 1 {
        return self.expect(next, TT::BracketClose).map(Some);
      }
      j = next;
    }
  }

  /// One `for x in e` or `if e` clause.
  pub fn comp_spec(&self, i: usize) -> SyntaxResult<Option<CompSpecSpan>> {
    match self.typ(i) {
      TT::KeywordFor => {
        let variable = self.expect(i + 1, TT::Identifier)?;
        let in_ = self.expect(variable + 1, TT::KeywordIn)?;
        let end = self.require_expr(in_ + 1)?;
        Ok(Some(CompSpecSpan {
          keyword: i,
          variable: Some(variable),
          end,
        }))
      }
      TT::KeywordIf => {
        let end = self.require_expr(i + 1)?;
        Ok(Some(CompSpecSpan {
          keyword: i,
          variable: None,
          end,
        }))
      }
      _ => Ok(None),
    }
  }

  /// All clauses starting at the first `for`.
  pub fn comp_specs(&self, i: usize) -> SyntaxResult<Vec<CompSpecSpan>> {
    self.expect(i, TT::KeywordFor)?;
    let mut specs = Vec::new();
    let mut j = i;
    while let Some(spec) = self.comp_spec(j)? {
      j = spec.end + 1;
      specs.push(spec);
    }
    Ok(specs)
  }

  /// Subscript starting at `[`: `[a]`, `[a:b]`, `[a:b:c]`, `[:b]`, `[::c]` and so on.
  pub fn slice(&self, i: usize) -> SyntaxResult<Option<usize>> {
    if self.typ(i) != TT::BracketOpen {
      return Ok(None);
    }
    let mut j = i + 1;
    // At most three parts separated by `:` (or a single `::`).
    let mut separators = 0;
    loop {
      let t = self.token(j);
      if t.typ == TT::BracketClose {
        return Ok(Some(j));
      }
      if t.is_operator(":") || t.is_operator("::") {
        separators += if t.is_operator("::") { 2 } else { 1 };
        if separators > 2 {
          return Err(t.error(SyntaxErrorType::ExpectedSyntax("at most three slice parts")));
        }
        j += 1;
        continue;
      }
      j = self.require_expr(j)? + 1;
      let next = self.token(j);
      if !(next.typ == TT::BracketClose || next.is_operator(":") || next.is_operator("::")) {
        return Err(next.error(SyntaxErrorType::ExpectedSyntax("':' or ']'")));
      }
    }
  }

  /// Index of the first top-level `for` in the comprehension starting at `{` or `[`.
  pub fn comprehension_for(&self, i: usize) -> SyntaxResult<Option<usize>> {
    match self.typ(i) {
      TT::BracketOpen => {
        let end = self.require_expr(i + 1)?;
        let next = if self.typ(end + 1) == TT::Comma { end + 2 } else { end + 1 };
        Ok((self.typ(next) == TT::KeywordFor).then_some(next))
      }
      TT::BraceOpen => {
        let mut j = i + 1;
        loop {
          let Some(end) = self.member(j)? else {
            return Ok(None);
          };
          let mut next = end + 1;
          if self.typ(next) == TT::Comma {
            next += 1;
          }
          if self.typ(next) == TT::KeywordFor {
            return Ok(Some(next));
          }
          if next == end + 1 {
            return Ok(None);
          }
          j = next;
        }
      }
      _ => Ok(None),
    }
  }
}
