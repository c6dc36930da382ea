use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;
use crate::loc::LocationRange;
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum TT {
  // Special token used to represent the end of the source code. It carries the trailing fodder.
  EOF,

  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  Comma,
  Dollar,
  Dot,
  ParenthesisClose,
  ParenthesisOpen,
  Semicolon,

  Identifier,
  KeywordAssert,
  KeywordElse,
  KeywordError,
  KeywordFalse,
  KeywordFor,
  KeywordFunction,
  KeywordIf,
  KeywordImport,
  KeywordImportbin,
  KeywordImportstr,
  KeywordIn,
  KeywordLocal,
  KeywordNull,
  KeywordSelf,
  KeywordSuper,
  KeywordTailstrict,
  KeywordThen,
  KeywordTrue,
  LiteralNumber,
  LiteralStringBlock,
  LiteralStringDouble,
  LiteralStringSingle,
  LiteralVerbatimStringDouble,
  LiteralVerbatimStringSingle,
  // Any run of operator characters; the text tells which operator it is.
  Operator,
}

impl TT {
  pub fn is_string(self) -> bool {
    matches!(
      self,
      TT::LiteralStringBlock
        | TT::LiteralStringDouble
        | TT::LiteralStringSingle
        | TT::LiteralVerbatimStringDouble
        | TT::LiteralVerbatimStringSingle
    )
  }

  pub fn is_import(self) -> bool {
    matches!(self, TT::KeywordImport | TT::KeywordImportbin | TT::KeywordImportstr)
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub enum FodderKind {
  Whitespace,
  LineEnd,
  // `//` or `#` up to (not including) the line end.
  LineComment,
  BlockComment,
}

/// Whitespace or a comment preceding a token.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Fodder {
  pub kind: FodderKind,
  pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Token {
  pub typ: TT,
  // Raw source text of the token. Concatenating each token's fodder and text reproduces the source.
  pub text: String,
  // Block strings hold their de-indented contents, verbatim strings hold their contents with doubled
  // quotes collapsed, quoted strings hold the raw text between the quotes. Otherwise equal to `text`.
  pub value: String,
  pub loc: Loc,
  pub range: LocationRange,
  pub fodder: Vec<Fodder>,
}

impl Token {
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, self.range.clone(), Some(self.typ))
  }

  pub fn is_operator(&self, text: &str) -> bool {
    self.typ == TT::Operator && self.text == text
  }

  pub fn preceded_by_line_end(&self) -> bool {
    self.fodder.iter().any(|f| f.kind == FodderKind::LineEnd)
  }
}
