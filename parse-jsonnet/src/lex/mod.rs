use crate::char::CharFilter;
use crate::char::DIGIT;
use crate::char::ID_CONTINUE;
use crate::char::ID_START;
use crate::char::OPERATOR;
use crate::char::WHITESPACE;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::LineIndex;
use crate::loc::Loc;
use crate::loc::LocationRange;
use crate::token::Fodder;
use crate::token::FodderKind;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use memchr::memchr;
use memchr::memchr2;
use memchr::memmem;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub mod string;
#[cfg(test)]
mod tests;

// Contains the match length.
#[derive(Copy, Clone)]
struct Match(usize);

impl Match {
  pub fn len(&self) -> usize {
    self.0
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

struct PatternMatcher<T: Copy> {
  patterns: Vec<T>,
  matcher: AhoCorasick,
}

impl<T: Copy> PatternMatcher<T> {
  pub fn new(patterns: Vec<(T, &str)>) -> Self {
    let (kinds, syns): (Vec<_>, Vec<_>) = patterns.into_iter().unzip();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(StartKind::Anchored)
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(syns)
      .expect("trivia patterns are valid");
    PatternMatcher {
      patterns: kinds,
      matcher,
    }
  }

  pub fn find(&self, lexer: &Lexer) -> Option<(T, Match)> {
    self
      .matcher
      .find(Input::new(&lexer.source[lexer.next..]).anchored(Anchored::Yes))
      .map(|m| (self.patterns[m.pattern().as_usize()], Match(m.end())))
  }
}

static INSIG: Lazy<PatternMatcher<FodderKind>> = Lazy::new(|| {
  PatternMatcher::new(vec![
    (FodderKind::Whitespace, " "),
    (FodderKind::Whitespace, "\t"),
    (FodderKind::Whitespace, "\r"),
    (FodderKind::LineEnd, "\n"),
    (FodderKind::LineComment, "#"),
    (FodderKind::LineComment, "//"),
    (FodderKind::BlockComment, "/*"),
  ])
});

pub static KEYWORDS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::KeywordAssert, "assert");
  map.insert(TT::KeywordElse, "else");
  map.insert(TT::KeywordError, "error");
  map.insert(TT::KeywordFalse, "false");
  map.insert(TT::KeywordFor, "for");
  map.insert(TT::KeywordFunction, "function");
  map.insert(TT::KeywordIf, "if");
  map.insert(TT::KeywordImport, "import");
  map.insert(TT::KeywordImportbin, "importbin");
  map.insert(TT::KeywordImportstr, "importstr");
  map.insert(TT::KeywordIn, "in");
  map.insert(TT::KeywordLocal, "local");
  map.insert(TT::KeywordNull, "null");
  map.insert(TT::KeywordSelf, "self");
  map.insert(TT::KeywordSuper, "super");
  map.insert(TT::KeywordTailstrict, "tailstrict");
  map.insert(TT::KeywordThen, "then");
  map.insert(TT::KeywordTrue, "true");
  map
});

pub static KEYWORD_STRS: Lazy<HashMap<&'static str, TT>> =
  Lazy::new(|| KEYWORDS_MAPPING.iter().map(|(&tt, &s)| (s, tt)).collect());

pub struct Lexer<'a> {
  source: &'a str,
  file: Option<Arc<str>>,
  lines: LineIndex,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(file: Option<&str>, source: &'a str) -> Lexer<'a> {
    Lexer {
      source,
      file: file.map(Arc::from),
      lines: LineIndex::new(source),
      next: 0,
    }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  pub fn file(&self) -> Option<&Arc<str>> {
    self.file.as_ref()
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  fn remaining(&self) -> usize {
    self.end() - self.next
  }

  fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn rest(&self) -> &'a str {
    &self.source[self.next..]
  }

  fn peek(&self, n: usize) -> Option<char> {
    self.rest().chars().nth(n)
  }

  fn while_chars(&self, chars: &CharFilter) -> Match {
    let mut len = 0;
    for ch in self.rest().chars() {
      if chars.has(ch) {
        len += ch.len_utf8();
      } else {
        break;
      }
    }
    Match(len)
  }

  fn while_not_char(&self, c: u8) -> Match {
    Match(memchr(c, self.rest().as_bytes()).unwrap_or(self.remaining()))
  }

  fn consume(&mut self, m: Match) -> Match {
    self.next += m.len();
    m
  }

  fn skip_expect(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  pub fn range(&self, loc: Loc) -> LocationRange {
    self.lines.range(self.source, self.file.clone(), loc)
  }

  fn error(&self, typ: SyntaxErrorType, loc: Loc) -> SyntaxError {
    loc.error(typ, self.range(loc), None)
  }

  /// An error pointing at the character at `at`, or at the end of the source.
  fn error_at(&self, typ: SyntaxErrorType, at: usize) -> SyntaxError {
    let len = self.source[at..].chars().next().map(|c| c.len_utf8()).unwrap_or(0);
    self.error(typ, Loc(at, at + len))
  }
}

fn lex_block_comment(lexer: &mut Lexer<'_>) -> SyntaxResult<()> {
  let start = lexer.next();
  // Consume `/*`.
  lexer.skip_expect(2);
  match memmem::find(lexer.rest().as_bytes(), b"*/") {
    Some(pos) => {
      lexer.skip_expect(pos + 2);
      Ok(())
    }
    None => Err(lexer.error(SyntaxErrorType::UnterminatedComment, Loc(start, lexer.end()))),
  }
}

fn lex_fodder(lexer: &mut Lexer<'_>) -> SyntaxResult<Vec<Fodder>> {
  let mut fodder = Vec::new();
  while let Some((kind, _)) = INSIG.find(lexer) {
    let start = lexer.next();
    match kind {
      FodderKind::Whitespace => {
        lexer.consume(lexer.while_chars(&WHITESPACE));
      }
      FodderKind::LineEnd => {
        lexer.skip_expect(1);
      }
      FodderKind::LineComment => {
        lexer.consume(lexer.while_not_char(b'\n'));
      }
      FodderKind::BlockComment => {
        lex_block_comment(lexer)?;
      }
    };
    fodder.push(Fodder {
      kind,
      text: lexer.source[start..lexer.next()].to_string(),
    });
  }
  Ok(fodder)
}

fn lex_identifier(lexer: &mut Lexer<'_>) -> TT {
  let start = lexer.next();
  lexer.skip_expect(1);
  lexer.consume(lexer.while_chars(&ID_CONTINUE));
  KEYWORD_STRS
    .get(&lexer.source[start..lexer.next()])
    .copied()
    .unwrap_or(TT::Identifier)
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum NumberState {
  AfterZero,
  AfterOneToNine,
  AfterDot,
  AfterDigit,
  AfterE,
  AfterExpSign,
  AfterExpDigit,
}

fn lex_number(lexer: &mut Lexer<'_>) -> SyntaxResult<TT> {
  let mut state = match lexer.peek(0) {
    Some('0') => NumberState::AfterZero,
    _ => NumberState::AfterOneToNine,
  };
  lexer.skip_expect(1);
  loop {
    let c = lexer.peek(0);
    let is_digit = c.is_some_and(|c| DIGIT.has(c));
    state = match (state, c) {
      (NumberState::AfterZero, Some('.')) => NumberState::AfterDot,
      (NumberState::AfterZero, Some('e' | 'E')) => NumberState::AfterE,
      (NumberState::AfterZero, _) => break,
      (NumberState::AfterOneToNine, _) if is_digit => NumberState::AfterOneToNine,
      (NumberState::AfterOneToNine, Some('.')) => NumberState::AfterDot,
      (NumberState::AfterOneToNine, Some('e' | 'E')) => NumberState::AfterE,
      (NumberState::AfterOneToNine, _) => break,
      (NumberState::AfterDot, _) if is_digit => NumberState::AfterDigit,
      (NumberState::AfterDot, _) => {
        return Err(lexer.error_at(
          SyntaxErrorType::MalformedLiteralNumber("junk after decimal point"),
          lexer.next(),
        ));
      }
      (NumberState::AfterDigit, _) if is_digit => NumberState::AfterDigit,
      (NumberState::AfterDigit, Some('e' | 'E')) => NumberState::AfterE,
      (NumberState::AfterDigit, _) => break,
      (NumberState::AfterE, Some('+' | '-')) => NumberState::AfterExpSign,
      (NumberState::AfterE, _) if is_digit => NumberState::AfterExpDigit,
      (NumberState::AfterE, _) => {
        return Err(lexer.error_at(
          SyntaxErrorType::MalformedLiteralNumber("junk after 'E'"),
          lexer.next(),
        ));
      }
      (NumberState::AfterExpSign, _) if is_digit => NumberState::AfterExpDigit,
      (NumberState::AfterExpSign, _) => {
        return Err(lexer.error_at(
          SyntaxErrorType::MalformedLiteralNumber("junk after exponent sign"),
          lexer.next(),
        ));
      }
      (NumberState::AfterExpDigit, _) if is_digit => NumberState::AfterExpDigit,
      (NumberState::AfterExpDigit, _) => break,
    };
    // Every character accepted by the state machine is ASCII.
    lexer.skip_expect(1);
  }
  Ok(TT::LiteralNumber)
}

fn lex_quoted_string(lexer: &mut Lexer<'_>, quote: u8) -> SyntaxResult<(TT, String)> {
  let start = lexer.next();
  lexer.skip_expect(1);
  let content_start = lexer.next();
  loop {
    let Some(pos) = memchr2(b'\\', quote, lexer.rest().as_bytes()) else {
      return Err(lexer.error(SyntaxErrorType::UnterminatedString, Loc(start, lexer.end())));
    };
    lexer.skip_expect(pos);
    if lexer.rest().as_bytes()[0] == quote {
      let value = lexer.source[content_start..lexer.next()].to_string();
      lexer.skip_expect(1);
      let typ = if quote == b'"' {
        TT::LiteralStringDouble
      } else {
        TT::LiteralStringSingle
      };
      return Ok((typ, value));
    }
    // Skip the backslash and whatever it escapes; validation happens when the parser unescapes.
    lexer.skip_expect(1);
    match lexer.peek(0) {
      Some(c) => lexer.skip_expect(c.len_utf8()),
      None => {
        return Err(lexer.error(SyntaxErrorType::UnterminatedString, Loc(start, lexer.end())));
      }
    }
  }
}

fn lex_verbatim_string(lexer: &mut Lexer<'_>) -> SyntaxResult<(TT, String)> {
  let start = lexer.next();
  // Consume `@`.
  lexer.skip_expect(1);
  let quote = match lexer.peek(0) {
    Some('"') => b'"',
    Some('\'') => b'\'',
    _ => return Err(lexer.error_at(SyntaxErrorType::UnexpectedCharacter, start)),
  };
  lexer.skip_expect(1);
  let mut value = String::new();
  loop {
    let Some(pos) = memchr(quote, lexer.rest().as_bytes()) else {
      return Err(lexer.error(SyntaxErrorType::UnterminatedString, Loc(start, lexer.end())));
    };
    value.push_str(&lexer.rest()[..pos]);
    lexer.skip_expect(pos + 1);
    if lexer.rest().as_bytes().first() == Some(&quote) {
      // A doubled quote stands for one literal quote.
      value.push(quote as char);
      lexer.skip_expect(1);
      continue;
    }
    let typ = if quote == b'"' {
      TT::LiteralVerbatimStringDouble
    } else {
      TT::LiteralVerbatimStringSingle
    };
    return Ok((typ, value));
  }
}

fn lex_operator(lexer: &mut Lexer<'_>) -> TT {
  let start = lexer.next();
  let bytes = lexer.source.as_bytes();
  let mut end = start + 1;
  while end < bytes.len() && OPERATOR.has(bytes[end] as char) {
    let rest = &lexer.source[end..];
    // Comments and text blocks never become part of an operator.
    if rest.starts_with("//") || rest.starts_with("/*") || rest.starts_with("|||") {
      break;
    }
    end += 1;
  }
  // Operators longer than one rune may not end in `+ - ~ ! $`, so `a=-1` is `=` then `-`.
  while end - start > 1 && matches!(bytes[end - 1], b'+' | b'-' | b'~' | b'!' | b'$') {
    end -= 1;
  }
  lexer.skip_expect(end - start);
  if &lexer.source[start..end] == "$" {
    TT::Dollar
  } else {
    TT::Operator
  }
}

fn lex_significant(lexer: &mut Lexer<'_>) -> SyntaxResult<(TT, Option<String>)> {
  let start = lexer.next();
  let Some(c) = lexer.peek(0) else {
    return Ok((TT::EOF, None));
  };
  let symbol = match c {
    '{' => Some(TT::BraceOpen),
    '}' => Some(TT::BraceClose),
    '[' => Some(TT::BracketOpen),
    ']' => Some(TT::BracketClose),
    ',' => Some(TT::Comma),
    '.' => Some(TT::Dot),
    '(' => Some(TT::ParenthesisOpen),
    ')' => Some(TT::ParenthesisClose),
    ';' => Some(TT::Semicolon),
    _ => None,
  };
  if let Some(typ) = symbol {
    lexer.skip_expect(1);
    return Ok((typ, None));
  }
  match c {
    '0'..='9' => lex_number(lexer).map(|typ| (typ, None)),
    '"' => lex_quoted_string(lexer, b'"').map(|(typ, v)| (typ, Some(v))),
    '\'' => lex_quoted_string(lexer, b'\'').map(|(typ, v)| (typ, Some(v))),
    '@' => lex_verbatim_string(lexer).map(|(typ, v)| (typ, Some(v))),
    '|' if lexer.rest().starts_with("|||") => {
      string::lex_block_string(lexer).map(|v| (TT::LiteralStringBlock, Some(v)))
    }
    c if ID_START.has(c) => Ok((lex_identifier(lexer), None)),
    c if OPERATOR.has(c) => Ok((lex_operator(lexer), None)),
    _ => Err(lexer.error_at(SyntaxErrorType::UnexpectedCharacter, start)),
  }
}

/// Lexes the next token along with the fodder preceding it. Returns an `EOF` token holding any
/// trailing fodder once the source is exhausted.
pub fn lex_next(lexer: &mut Lexer<'_>) -> SyntaxResult<Token> {
  let fodder = lex_fodder(lexer)?;
  let start = lexer.next();
  let (typ, value) = if lexer.at_end() {
    (TT::EOF, None)
  } else {
    lex_significant(lexer)?
  };
  let loc = Loc(start, lexer.next());
  let text = lexer.source[start..lexer.next()].to_string();
  Ok(Token {
    typ,
    value: value.unwrap_or_else(|| text.clone()),
    text,
    loc,
    range: lexer.range(loc),
    fodder,
  })
}

/// Lexes a whole file. The last token is always `EOF`.
pub fn lex(file: Option<&str>, source: &str) -> SyntaxResult<Vec<Token>> {
  let _span = tracing::trace_span!("lex", file = file.unwrap_or("<memory>")).entered();
  let mut lexer = Lexer::new(file, source);
  let mut tokens = Vec::new();
  loop {
    let token = lex_next(&mut lexer)?;
    let done = token.typ == TT::EOF;
    tokens.push(token);
    if done {
      break;
    }
  }
  Ok(tokens)
}
