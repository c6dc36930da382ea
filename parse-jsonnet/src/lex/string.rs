use super::Lexer;
use super::Match;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use memchr::memchr;

fn indent_len(s: &str) -> usize {
  s.bytes().take_while(|b| matches!(b, b' ' | b'\t')).count()
}

/// Lexes a `|||` text block, returning its contents with the first line's indentation removed from
/// every line.
pub(crate) fn lex_block_string(lexer: &mut Lexer<'_>) -> SyntaxResult<String> {
  let start = lexer.next();
  lexer.skip_expect(3);
  let chomp = lexer.rest().starts_with('-');
  if chomp {
    lexer.skip_expect(1);
  }
  lexer.consume(Match(indent_len(lexer.rest())));
  if lexer.rest().starts_with('\r') {
    lexer.skip_expect(1);
  }
  if !lexer.rest().starts_with('\n') {
    return Err(lexer.error_at(SyntaxErrorType::BlockStringMissingNewline, lexer.next()));
  }
  lexer.skip_expect(1);

  let mut value = String::new();
  // Leading blank lines are kept as-is.
  while lexer.rest().starts_with('\n') {
    value.push('\n');
    lexer.skip_expect(1);
  }
  let indent = &lexer.rest()[..indent_len(lexer.rest())];
  if indent.is_empty() {
    return Err(lexer.error_at(SyntaxErrorType::BlockStringMissingIndent, lexer.next()));
  }

  loop {
    // A line opening with `|||` at or beyond the indentation closes the block.
    let ws = indent_len(lexer.rest());
    if lexer.rest()[ws..].starts_with("|||") {
      lexer.skip_expect(ws + 3);
      break;
    }
    if !lexer.rest().starts_with(indent) {
      return Err(lexer.error(SyntaxErrorType::UnterminatedBlockString, Loc(start, lexer.end())));
    }
    lexer.skip_expect(indent.len());
    let Some(line_len) = memchr(b'\n', lexer.rest().as_bytes()) else {
      return Err(lexer.error(SyntaxErrorType::UnterminatedBlockString, Loc(start, lexer.end())));
    };
    value.push_str(&lexer.rest()[..=line_len]);
    lexer.skip_expect(line_len + 1);
    while lexer.rest().starts_with('\n') {
      value.push('\n');
      lexer.skip_expect(1);
    }
  }

  if chomp && value.ends_with('\n') {
    value.pop();
  }
  Ok(value)
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
  let mut code = 0;
  for _ in 0..4 {
    code = code * 16 + chars.next()?.to_digit(16)?;
  }
  Some(code)
}

/// Decodes the value of a string token. Quoted strings have their escapes interpreted; block and
/// verbatim strings were already decoded while lexing.
pub fn unescape(token: &Token) -> SyntaxResult<String> {
  if !matches!(token.typ, TT::LiteralStringDouble | TT::LiteralStringSingle) {
    return Ok(token.value.clone());
  }
  let invalid = || token.error(SyntaxErrorType::InvalidStringEscape);
  let mut out = String::with_capacity(token.value.len());
  let mut chars = token.value.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next().ok_or_else(invalid)? {
      '"' => out.push('"'),
      '\'' => out.push('\''),
      '\\' => out.push('\\'),
      '/' => out.push('/'),
      'b' => out.push('\u{8}'),
      'f' => out.push('\u{c}'),
      'n' => out.push('\n'),
      'r' => out.push('\r'),
      't' => out.push('\t'),
      'u' => {
        let high = hex4(&mut chars).ok_or_else(invalid)?;
        let code = if (0xD800..0xDC00).contains(&high) {
          // Surrogate pair.
          if chars.next() != Some('\\') || chars.next() != Some('u') {
            return Err(invalid());
          }
          let low = hex4(&mut chars).ok_or_else(invalid)?;
          if !(0xDC00..0xE000).contains(&low) {
            return Err(invalid());
          }
          0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
          high
        };
        out.push(char::from_u32(code).ok_or_else(invalid)?);
      }
      _ => return Err(invalid()),
    }
  }
  Ok(out)
}
