use crate::loc::Loc;
use crate::loc::LocationRange;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use std::error::Error;
use std::fmt::Display;

/// A stable classification of lexing and parsing errors.
///
/// Diagnostic codes (prefix `JL`) are assigned per variant and are stable:
/// - `JL0001`: [`SyntaxErrorType::BlockStringMissingIndent`]
/// - `JL0002`: [`SyntaxErrorType::BlockStringMissingNewline`]
/// - `JL0003`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `JL0004`: [`SyntaxErrorType::InvalidStringEscape`]
/// - `JL0005`: [`SyntaxErrorType::MalformedLiteralNumber`]
/// - `JL0006`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `JL0007`: [`SyntaxErrorType::UnexpectedCharacter`]
/// - `JL0008`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `JL0009`: [`SyntaxErrorType::UnterminatedBlockString`]
/// - `JL0010`: [`SyntaxErrorType::UnterminatedComment`]
/// - `JL0011`: [`SyntaxErrorType::UnterminatedString`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  BlockStringMissingIndent,
  BlockStringMissingNewline,
  ExpectedSyntax(&'static str),
  InvalidStringEscape,
  MalformedLiteralNumber(&'static str),
  RequiredTokenNotFound(TT),
  UnexpectedCharacter,
  UnexpectedEnd,
  UnterminatedBlockString,
  UnterminatedComment,
  UnterminatedString,
}

#[derive(Clone)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub range: LocationRange,
  pub actual_token: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, range: LocationRange, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      range,
      actual_token,
    }
  }

  pub fn code(&self) -> &'static str {
    self.typ.code()
  }

  pub fn message(&self) -> String {
    self.typ.message(self.actual_token)
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self, self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}: {}", self.range, self.typ.code(), self.message())
  }
}

impl Error for SyntaxError {}

impl PartialEq for SyntaxError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ
  }
}

impl Eq for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  /// Stable diagnostic code for this syntax error variant.
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::BlockStringMissingIndent => "JL0001",
      SyntaxErrorType::BlockStringMissingNewline => "JL0002",
      SyntaxErrorType::ExpectedSyntax(_) => "JL0003",
      SyntaxErrorType::InvalidStringEscape => "JL0004",
      SyntaxErrorType::MalformedLiteralNumber(_) => "JL0005",
      SyntaxErrorType::RequiredTokenNotFound(_) => "JL0006",
      SyntaxErrorType::UnexpectedCharacter => "JL0007",
      SyntaxErrorType::UnexpectedEnd => "JL0008",
      SyntaxErrorType::UnterminatedBlockString => "JL0009",
      SyntaxErrorType::UnterminatedComment => "JL0010",
      SyntaxErrorType::UnterminatedString => "JL0011",
    }
  }

  /// Human-readable message describing this syntax error.
  pub fn message(&self, actual_token: Option<TT>) -> String {
    match self {
      SyntaxErrorType::BlockStringMissingIndent => {
        "text block's first line must start with whitespace".into()
      }
      SyntaxErrorType::BlockStringMissingNewline => {
        "text block syntax requires new line after |||".into()
      }
      SyntaxErrorType::ExpectedSyntax(expected) => match actual_token {
        Some(tok) => format!("expected {} but found {:?}", expected, tok),
        None => format!("expected {}", expected),
      },
      SyntaxErrorType::InvalidStringEscape => "invalid escape sequence in string literal".into(),
      SyntaxErrorType::MalformedLiteralNumber(detail) => format!("couldn't lex number, {}", detail),
      SyntaxErrorType::RequiredTokenNotFound(token) => match actual_token {
        Some(tok) => format!("expected token {:?} but found {:?}", token, tok),
        None => format!("expected token {:?}", token),
      },
      SyntaxErrorType::UnexpectedCharacter => "could not lex the character".into(),
      SyntaxErrorType::UnexpectedEnd => "unexpected end of file".into(),
      SyntaxErrorType::UnterminatedBlockString => "text block not terminated with |||".into(),
      SyntaxErrorType::UnterminatedComment => "multi-line comment has no terminating */".into(),
      SyntaxErrorType::UnterminatedString => "unterminated string".into(),
    }
  }
}
