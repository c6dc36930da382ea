use crate::error::SyntaxErrorType;
use crate::lex::lex;
use crate::lex::lex_next;
use crate::lex::string::unescape;
use crate::lex::Lexer;
use crate::loc::Position;
use crate::token::FodderKind;
use crate::token::TT;
use crate::token::TT::*;

fn check<const N: usize>(code: &str, expecteds: [TT; N]) {
  let mut lexer = Lexer::new(None, code);
  for expected in expecteds {
    let t = lex_next(&mut lexer).unwrap();
    assert_eq!(t.typ, expected, "in {:?}", code);
  }
  let t = lex_next(&mut lexer).unwrap();
  assert_eq!(EOF, t.typ);
}

fn texts(code: &str) -> Vec<String> {
  lex(None, code)
    .unwrap()
    .into_iter()
    .filter(|t| t.typ != EOF)
    .map(|t| t.text)
    .collect()
}

fn error(code: &str) -> SyntaxErrorType {
  lex(None, code).unwrap_err().typ
}

#[test]
fn test_lex_keywords() {
  check("local", [KeywordLocal]);
  check("importstr", [KeywordImportstr]);
  check("tailstrict", [KeywordTailstrict]);
  check("locals", [Identifier]);
}

#[test]
fn test_lex_identifiers() {
  check("h929", [Identifier]);
  check("_x y", [Identifier, Identifier]);
}

#[test]
fn test_lex_symbols() {
  check("{}[](),.;", [
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    ParenthesisOpen,
    ParenthesisClose,
    Comma,
    Dot,
    Semicolon,
  ]);
  check("$.a", [Dollar, Dot, Identifier]);
  check("$+1", [Dollar, Operator, LiteralNumber]);
}

#[test]
fn test_lex_operators() {
  assert_eq!(texts("a=-1"), vec!["a", "=", "-", "1"]);
  assert_eq!(texts("a::b"), vec!["a", "::", "b"]);
  assert_eq!(texts("a+:: b"), vec!["a", "+::", "b"]);
  assert_eq!(texts("a<=b"), vec!["a", "<=", "b"]);
  assert_eq!(texts("!!a"), vec!["!", "!", "a"]);
  assert_eq!(texts("a+//x\nb"), vec!["a", "+", "b"]);
  assert_eq!(texts("a+/*x*/b"), vec!["a", "+", "b"]);
}

#[test]
fn test_lex_literal_numbers() {
  check("1", [LiteralNumber]);
  check("1.5e-3", [LiteralNumber]);
  check("10E+2", [LiteralNumber]);
  // Nothing joins a leading zero but a fraction or exponent.
  check("01", [LiteralNumber, LiteralNumber]);
  check("0.25", [LiteralNumber]);
  assert_eq!(
    error("1."),
    SyntaxErrorType::MalformedLiteralNumber("junk after decimal point")
  );
  assert_eq!(error("1ex"), SyntaxErrorType::MalformedLiteralNumber("junk after 'E'"));
  assert_eq!(
    error("1e+"),
    SyntaxErrorType::MalformedLiteralNumber("junk after exponent sign")
  );
}

#[test]
fn test_number_error_points_at_junk() {
  let err = lex(None, "x + 1.a").unwrap_err();
  assert_eq!(err.range.begin, Position::new(1, 7));
  assert_eq!(err.range.end, Position::new(1, 8));
}

#[test]
fn test_lex_literal_strings() {
  check("'hello world'", [LiteralStringSingle]);
  check("\"a\\\"b\"", [LiteralStringDouble]);
  check("@'it''s'", [LiteralVerbatimStringSingle]);
  assert_eq!(error("'hello"), SyntaxErrorType::UnterminatedString);
  assert_eq!(error("@x"), SyntaxErrorType::UnexpectedCharacter);

  let tokens = lex(None, "@\"a\"\"b\"").unwrap();
  assert_eq!(tokens[0].value, "a\"b");
}

#[test]
fn test_unescape() {
  let tokens = lex(None, r#""a\né😀\\""#).unwrap();
  assert_eq!(unescape(&tokens[0]).unwrap(), "a\n\u{e9}\u{1f600}\\");
  let tokens = lex(None, r#""\q""#).unwrap();
  assert_eq!(unescape(&tokens[0]).unwrap_err().typ, SyntaxErrorType::InvalidStringEscape);
}

#[test]
fn test_lex_block_strings() {
  let tokens = lex(None, "|||\n  foo\n    bar\n|||").unwrap();
  assert_eq!(tokens[0].typ, LiteralStringBlock);
  assert_eq!(tokens[0].value, "foo\n  bar\n");
  assert_eq!(tokens[1].typ, EOF);

  let tokens = lex(None, "|||-\n  foo\n  |||").unwrap();
  assert_eq!(tokens[0].value, "foo");

  assert_eq!(error("|||foo\n  x\n|||"), SyntaxErrorType::BlockStringMissingNewline);
  assert_eq!(error("|||\nfoo\n|||"), SyntaxErrorType::BlockStringMissingIndent);
  assert_eq!(error("|||\n  foo\n"), SyntaxErrorType::UnterminatedBlockString);
  assert_eq!(error("|||\n  foo\nbar"), SyntaxErrorType::UnterminatedBlockString);
}

#[test]
fn test_lex_comments_become_fodder() {
  let tokens = lex(None, "# one\na /* two */ // three").unwrap();
  assert_eq!(tokens.len(), 2);
  let kinds: Vec<_> = tokens[0].fodder.iter().map(|f| f.kind).collect();
  assert_eq!(kinds, vec![FodderKind::LineComment, FodderKind::LineEnd]);
  assert!(tokens[0].preceded_by_line_end());
  let trailing: Vec<_> = tokens[1].fodder.iter().map(|f| f.text.as_str()).collect();
  assert_eq!(trailing, vec![" ", "/* two */", " ", "// three"]);
  assert_eq!(error("a /* b"), SyntaxErrorType::UnterminatedComment);
}

#[test]
fn test_lex_unexpected_character() {
  let err = lex(Some("f.jsonnet"), "a\n  `").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnexpectedCharacter);
  assert_eq!(err.range.begin, Position::new(2, 3));
  assert_eq!(err.range.file.as_deref(), Some("f.jsonnet"));
}

#[test]
fn test_token_columns_count_runes() {
  let tokens = lex(None, "'\u{e9}\u{e9}' + x").unwrap();
  let x = &tokens[2];
  assert_eq!(x.text, "x");
  assert_eq!(x.range.begin, Position::new(1, 8));
  assert_eq!(x.range.end, Position::new(1, 9));
}

#[test]
fn test_fodder_and_text_reproduce_source() {
  let source = "// head\nlocal x = { a: 1 }; # tail\n|||\n  text\n|||\n";
  let rebuilt: String = lex(None, source)
    .unwrap()
    .iter()
    .map(|t| {
      let mut s: String = t.fodder.iter().map(|f| f.text.as_str()).collect();
      s.push_str(&t.text);
      s
    })
    .collect();
  assert_eq!(rebuilt, source);
}

#[test]
fn test_tokens_serialize() {
  let tokens = lex(Some("a.jsonnet"), "x").unwrap();
  let json = serde_json::to_value(&tokens[0]).unwrap();
  assert_eq!(json["typ"], "Identifier");
  assert_eq!(json["loc"], serde_json::json!([0, 1]));
  assert_eq!(json["range"]["file"], "a.jsonnet");
  assert_eq!(json["range"]["begin"]["column"], 1);
}
