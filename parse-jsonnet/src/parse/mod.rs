use crate::ast::Ast;
use crate::ast::Expr;
use crate::ast::ExprId;
use crate::ast::ExprKind;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex;
use crate::loc::LineIndex;
use crate::loc::Loc;
use crate::loc::LocationRange;
use crate::token::Token;
use crate::token::TT;
use std::sync::Arc;

pub mod expr;
pub mod object;
#[cfg(test)]
mod tests;

pub struct MaybeToken {
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }
}

pub struct Parser<'a> {
  source: &'a str,
  file: Option<Arc<str>>,
  lines: LineIndex,
  tokens: Vec<Token>,
  next_tok_i: usize,
  // End of the last consumed token.
  prev_end: usize,
  exprs: Vec<Expr>,
  // Tolerate the source ending early: missing expressions become `Partial` and missing closing
  // tokens are assumed.
  partial: bool,
}

impl<'a> Parser<'a> {
  pub fn new(file: Option<&str>, source: &'a str, tokens: Vec<Token>, partial: bool) -> Parser<'a> {
    Parser {
      source,
      file: file.map(Arc::from),
      lines: LineIndex::new(source),
      tokens,
      next_tok_i: 0,
      prev_end: 0,
      exprs: Vec::new(),
      partial,
    }
  }

  pub fn range(&self, loc: Loc) -> LocationRange {
    self.lines.range(self.source, self.file.clone(), loc)
  }

  /// Loc from `start` to the end of the last consumed token.
  pub fn since(&self, start: usize) -> Loc {
    Loc(start, self.prev_end.max(start))
  }

  fn token_at(&self, i: usize) -> &Token {
    // The lexer always ends the stream with EOF, which is never consumed past.
    let last = self.tokens.len() - 1;
    &self.tokens[i.min(last)]
  }

  pub fn peek(&self) -> Token {
    self.token_at(self.next_tok_i).clone()
  }

  pub fn peek_typ(&self) -> TT {
    self.token_at(self.next_tok_i).typ
  }

  pub fn peek_2(&self) -> (Token, Token) {
    (
      self.token_at(self.next_tok_i).clone(),
      self.token_at(self.next_tok_i + 1).clone(),
    )
  }

  pub fn peek_is_operator(&self, text: &str) -> bool {
    self.token_at(self.next_tok_i).is_operator(text)
  }

  pub fn at_partial_end(&self) -> bool {
    self.partial && self.peek_typ() == TT::EOF
  }

  pub fn consume(&mut self) -> Token {
    let t = self.peek();
    if t.typ != TT::EOF {
      self.next_tok_i += 1;
      self.prev_end = t.loc.1;
    }
    t
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let t = self.token_at(self.next_tok_i);
    let matched = t.typ == typ;
    if matched {
      self.consume();
    }
    MaybeToken { matched }
  }

  pub fn consume_if_operator(&mut self, text: &str) -> MaybeToken {
    let t = self.token_at(self.next_tok_i);
    let matched = t.is_operator(text);
    if matched {
      self.consume();
    }
    MaybeToken { matched }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    if self.at_partial_end() {
      return Ok(self.peek());
    }
    let t = self.consume();
    if t.typ != typ {
      Err(t.error(SyntaxErrorType::RequiredTokenNotFound(typ)))
    } else {
      Ok(t)
    }
  }

  pub fn require_operator(&mut self, text: &'static str) -> SyntaxResult<Token> {
    if self.at_partial_end() {
      return Ok(self.peek());
    }
    let t = self.consume();
    if !t.is_operator(text) {
      Err(t.error(SyntaxErrorType::ExpectedSyntax(text)))
    } else {
      Ok(t)
    }
  }

  pub fn alloc(&mut self, loc: Option<Loc>, kind: ExprKind) -> ExprId {
    let id = ExprId(self.exprs.len() as u32);
    let range = loc.map(|loc| self.range(loc));
    self.exprs.push(Expr::new(loc, range, kind));
    id
  }

  pub fn alloc_since(&mut self, start: usize, kind: ExprKind) -> ExprId {
    let loc = self.since(start);
    self.alloc(Some(loc), kind)
  }

  pub fn parse_top_level(mut self) -> SyntaxResult<Ast> {
    let root = self.parse_expr()?;
    let t = self.peek();
    if t.typ != TT::EOF {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("end of file")));
    }
    Ok(Ast {
      file: self.file,
      source: Arc::from(self.source),
      lines: self.lines,
      tokens: self.tokens,
      exprs: self.exprs,
      root,
    })
  }
}

fn parse_with(file: Option<&str>, source: &str, partial: bool) -> SyntaxResult<Ast> {
  let _span = tracing::debug_span!("parse", file = file.unwrap_or("<memory>"), partial).entered();
  let tokens = lex(file, source)?;
  let ast = Parser::new(file, source, tokens, partial).parse_top_level()?;
  tracing::trace!(exprs = ast.len(), "parsed");
  Ok(ast)
}

/// Parses a complete file.
pub fn parse(file: Option<&str>, source: &str) -> SyntaxResult<Ast> {
  parse_with(file, source, false)
}

/// Parses a file that may end prematurely, as it often does while being edited. Expressions missing
/// at the end of the source become [`ExprKind::Partial`] and unclosed brackets are closed.
pub fn parse_partial(file: Option<&str>, source: &str) -> SyntaxResult<Ast> {
  parse_with(file, source, true)
}
