use crate::ast::ExprKind;
use crate::ast::ObjectMember;
use crate::error::SyntaxErrorType;
use crate::lex::lex;
use crate::loc::Position;
use crate::matcher::Matcher;
use crate::matcher::RangeRecovery;
use crate::parse::parse;
use crate::token::TT;

fn end_of(code: &str) -> Option<String> {
  let tokens = lex(None, code).unwrap();
  let m = Matcher::new(&tokens);
  m.expr(0).unwrap().map(|end| tokens[end].text.clone())
}

fn pos(line: u32, column: u32) -> Position {
  Position::new(line, column)
}

#[test]
fn test_expression_boundaries() {
  assert_eq!(end_of("a.b[1:2](3) tailstrict, x").as_deref(), Some("tailstrict"));
  assert_eq!(end_of("1 + -2 * f(x) ; y").as_deref(), Some(")"));
  assert_eq!(end_of("local x = 1; x + y ]").as_deref(), Some("y"));
  assert_eq!(end_of("if a then b else c , d").as_deref(), Some("c"));
  assert_eq!(end_of("function(a, b=2) a { c: 1 } ) ").as_deref(), Some("}"));
  assert_eq!(end_of("{ a: [x for x in y if x], b+:: self.a } + 1").as_deref(), Some("1"));
  assert_eq!(end_of("'a' in super").as_deref(), Some("super"));
  assert_eq!(end_of("import 'a.libsonnet'").as_deref(), Some("'a.libsonnet'"));
}

#[test]
fn test_not_matched_is_distinct_from_error() {
  let tokens = lex(None, ") + 1").unwrap();
  assert_eq!(Matcher::new(&tokens).expr(0).unwrap(), None);
  let tokens = lex(None, "{ a 1 }").unwrap();
  assert!(Matcher::new(&tokens).expr(0).is_err());
  let tokens = lex(None, "x").unwrap();
  let m = Matcher::new(&tokens);
  assert_eq!(m.object(0).unwrap(), None);
  assert_eq!(m.params(0).unwrap(), None);
  assert_eq!(m.slice(0).unwrap(), None);
}

#[test]
fn test_slices() {
  for code in ["[a]", "[a:b]", "[a:b:c]", "[:b]", "[::c]", "[a::c]", "[:]"] {
    let tokens = lex(None, code).unwrap();
    let end = Matcher::new(&tokens).slice(0).unwrap();
    assert_eq!(end, Some(tokens.len() - 2), "in {:?}", code);
  }
  let tokens = lex(None, "[a:b:c:d]").unwrap();
  assert!(Matcher::new(&tokens).slice(0).is_err());
  for code in ["[a b]", "[a:b c]", "[:a b]"] {
    let tokens = lex(None, code).unwrap();
    let err = Matcher::new(&tokens).slice(0).unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::ExpectedSyntax("':' or ']'"), "in {:?}", code);
    assert_eq!(err.actual_token, Some(TT::Identifier), "in {:?}", code);
  }
}

#[test]
fn test_param_and_arg_spans() {
  let tokens = lex(None, "(a, b=1+2, c,)").unwrap();
  let m = Matcher::new(&tokens);
  let spans = m.param_spans(0).unwrap().unwrap();
  let texts: Vec<_> = spans
    .iter()
    .map(|s| (tokens[s.start].text.as_str(), tokens[s.end].text.as_str()))
    .collect();
  assert_eq!(texts, vec![("a", "a"), ("b", "2"), ("c", "c")]);

  let tokens = lex(None, "(f(1), y=[2])").unwrap();
  let spans = Matcher::new(&tokens).arg_spans(0).unwrap().unwrap();
  assert_eq!(spans.len(), 2);
  assert_eq!(tokens[spans[1].end].typ, TT::BracketClose);
}

#[test]
fn test_comp_specs() {
  let tokens = lex(None, "for x in xs if x > 1 for y in ys").unwrap();
  let specs = Matcher::new(&tokens).comp_specs(0).unwrap();
  assert_eq!(specs.len(), 3);
  assert_eq!(specs[0].variable.map(|v| tokens[v].text.as_str()), Some("x"));
  assert_eq!(specs[1].variable, None);
  assert_eq!(tokens[specs[2].end].text, "ys");
}

#[test]
fn test_token_index_at() {
  let tokens = lex(None, "local  abc = 1;").unwrap();
  let m = Matcher::new(&tokens);
  assert_eq!(m.token_index_at(pos(1, 8)), Some(1));
  assert_eq!(m.token_index_at(pos(1, 10)), Some(1));
  assert_eq!(m.token_index_at(pos(1, 6)), None);
  assert_eq!(m.token_index_at(pos(1, 16)), None);
  assert_eq!(m.range(1, 3), crate::loc::LocationRange::new(None, pos(1, 8), pos(1, 15)));
}

#[test]
fn test_field_ranges() {
  let ast = parse(None, "{\n  a: 1,\n  [b]+: { c: 2 },\n  f(x, y=1):: x,\n}").unwrap();
  let recovery = RangeRecovery::new(&ast);
  let ExprKind::Object { members } = ast.kind(ast.root) else {
    panic!("expected object");
  };
  let fields: Vec<_> = members
    .iter()
    .filter_map(|m| match m {
      ObjectMember::Field(f) => Some(f),
      _ => None,
    })
    .collect();

  let a = recovery.field_range(fields[0]).unwrap().unwrap();
  assert_eq!((a.begin, a.end), (pos(2, 3), pos(2, 7)));

  let b = recovery.field_range(fields[1]).unwrap().unwrap();
  assert_eq!((b.begin, b.end), (pos(3, 3), pos(3, 17)));
  let b_name = recovery.field_name_range(fields[1]).unwrap().unwrap();
  assert_eq!((b_name.begin, b_name.end), (pos(3, 3), pos(3, 6)));

  let f = fields[2];
  assert!(f.method);
  assert!(ast.range(f.body).is_none());
  let func = recovery.field_body_range(f).unwrap().unwrap();
  assert_eq!((func.begin, func.end), (pos(4, 4), pos(4, 16)));
  let params = recovery.param_ranges(f.body).unwrap();
  assert_eq!(params.len(), 2);
  assert_eq!((params[1].head.begin, params[1].full.end), (pos(4, 8), pos(4, 11)));
}

#[test]
fn test_local_method_and_arg_ranges() {
  let ast = parse(None, "local f(a, b) = a; f(1, b=2)").unwrap();
  let recovery = RangeRecovery::new(&ast);
  let ExprKind::Local { binds, body } = ast.kind(ast.root) else {
    panic!("expected local");
  };
  let params = recovery.param_ranges(binds[0].body).unwrap();
  let heads: Vec<_> = params.iter().map(|p| p.head.begin).collect();
  assert_eq!(heads, vec![pos(1, 9), pos(1, 12)]);
  let func = recovery.function_range(binds[0].body).unwrap().unwrap();
  assert_eq!((func.begin, func.end), (pos(1, 8), pos(1, 18)));

  let args = recovery.arg_ranges(*body).unwrap();
  assert_eq!(args.len(), 2);
  assert_eq!((args[1].full.begin, args[1].full.end), (pos(1, 25), pos(1, 28)));
}

#[test]
fn test_comprehension_ranges() {
  let ast = parse(None, "[x for x in [1] if x > 0]").unwrap();
  let recovery = RangeRecovery::new(&ast);
  let specs = recovery.comp_spec_ranges(ast.root).unwrap();
  assert_eq!(specs.len(), 2);
  assert_eq!(specs[0].keyword.begin, pos(1, 4));
  assert_eq!(specs[0].variable.as_ref().map(|v| v.begin), Some(pos(1, 8)));
  assert_eq!(specs[1].full.end, pos(1, 25));

  let ast = parse(None, "{ local l = 1, [k]: l for k in ['a'] }").unwrap();
  let recovery = RangeRecovery::new(&ast);
  let specs = recovery.comp_spec_ranges(ast.root).unwrap();
  assert_eq!(specs.len(), 1);
  assert_eq!(specs[0].keyword.begin, pos(1, 23));
}
