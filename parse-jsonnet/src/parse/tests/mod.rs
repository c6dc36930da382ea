use crate::ast::print::sexpr;
use crate::ast::ExprKind;
use crate::ast::FieldKind;
use crate::ast::ObjectMember;
use crate::error::SyntaxErrorType;
use crate::loc::Position;
use crate::parse::parse;
use crate::parse::parse_partial;

fn check(code: &str, expected: &str) {
  let ast = parse(None, code).unwrap();
  assert_eq!(sexpr(&ast, ast.root), expected, "in {:?}", code);
}

fn check_partial(code: &str, expected: &str) {
  let ast = parse_partial(None, code).unwrap();
  assert_eq!(sexpr(&ast, ast.root), expected, "in {:?}", code);
}

#[test]
fn test_precedence() {
  check("1 + 2 * 3", "(+ 1 (* 2 3))");
  check("1 - 2 - 3", "(- (- 1 2) 3)");
  check("a || b && c | d ^ e & f == g < h << i + j * k", "(|| a (&& b (| c (^ d (& e (== f (< g (<< h (+ i (* j k)))))))))");
  check("!a.b == -c", "(== (! (index a \"b\")) (- c))");
  check("'x' in o", "(in \"x\" o)");
  check("'x' in super", "(insuper \"x\")");
}

#[test]
fn test_keyword_expressions_extend_right() {
  check("1 + local x = 2; x + 3", "(+ 1 (local ((x 2)) (+ x 3)))");
  check("if a then b else c + 1", "(if a b (+ c 1))");
  check("if a then b", "(if a b _)");
  check("function(x, y=2) x + y", "(fn (x y=2) (+ x y))");
  check("assert a : 'm'; b", "(assert a \"m\" b)");
  check("error 'e' + 'f'", "(error (+ \"e\" \"f\"))");
}

#[test]
fn test_postfix() {
  check("a.b[c](d, e=1) tailstrict", "(call (index (index a \"b\") c) d e=1 tailstrict)");
  check("a[1:2]", "(slice a 1 2 _)");
  check("a[::2]", "(slice a _ _ 2)");
  check("a[1::3]", "(slice a 1 _ 3)");
  check("a[:]", "(slice a _ _ _)");
  check("super.x + super['y']", "(+ (super \"x\") (super \"y\"))");
  check("a { b: 1 }", "(+ a {obj (\"b\": 1)})");
}

#[test]
fn test_literals() {
  check("[true, false, null, self, $, 1.5, 'a\\n']", "[true false null self $ 1.5 \"a\\n\"]");
  check("[1, 2,]", "[1 2]");
  check("import 'a.libsonnet'", "(import \"a.libsonnet\")");
  check("importstr \"b.txt\"", "(importstr \"b.txt\")");
  check("(1)", "(paren 1)");
}

#[test]
fn test_objects() {
  check(
    "{ local l = 1, a: l, 'b':: 2, [c]+::: 3, assert a : 'msg', f(x):: x }",
    "{obj (local l 1) (\"a\": l) (\"b\":: 2) (c+::: 3) (assert a \"msg\") (\"f\":: (fn (x) x))}",
  );
  check("{ [k]: v for k in ks if k != 'x' }", "{comp (k: v) (for k ks) (if (!= k \"x\"))}");
  check("[x * 2 for x in xs for y in ys]", "[comp (* x 2) (for x xs) (for y ys)]");
}

#[test]
fn test_local_methods_desugar() {
  let ast = parse(None, "local f(x) = x; f(1)").unwrap();
  let ExprKind::Local { binds, .. } = ast.kind(ast.root) else {
    panic!("expected local");
  };
  assert!(binds[0].method);
  let func = ast.get(binds[0].body);
  assert!(matches!(func.kind, ExprKind::Function { .. }));
  assert!(func.loc.is_none());
  assert_eq!(binds[0].name_range.begin, Position::new(1, 7));
}

#[test]
fn test_field_names() {
  let ast = parse(None, "{ a: 1, \"b c\": 2, [d]: 3 }").unwrap();
  let ExprKind::Object { members } = ast.kind(ast.root) else {
    panic!("expected object");
  };
  let kinds: Vec<_> = members
    .iter()
    .map(|m| match m {
      ObjectMember::Field(f) => f.kind,
      _ => panic!("expected field"),
    })
    .collect();
  assert_eq!(kinds, vec![FieldKind::Id, FieldKind::Str, FieldKind::Computed]);
}

#[test]
fn test_ranges() {
  let ast = parse(None, "local x = 1;\nx.y + 2").unwrap();
  let root = ast.range(ast.root).unwrap();
  assert_eq!(root.begin, Position::new(1, 1));
  assert_eq!(root.end, Position::new(2, 8));
  let ExprKind::Local { body, .. } = ast.kind(ast.root) else {
    panic!("expected local");
  };
  let body = ast.range(*body).unwrap();
  assert_eq!(body.begin, Position::new(2, 1));
  assert_eq!(body.end, Position::new(2, 8));
}

#[test]
fn test_children_and_parents() {
  let ast = parse(None, "[a, b + c]").unwrap();
  let children = ast.children(ast.root);
  assert_eq!(children.len(), 2);
  let parents = ast.parents();
  assert_eq!(parents[ast.root.index()], None);
  for child in children {
    assert_eq!(parents[child.index()], Some(ast.root));
  }
  // Every expression is reachable from the root.
  assert_eq!(ast.preorder().len(), ast.len());
}

#[test]
fn test_errors() {
  let err = parse(None, "{ a 1 }").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::ExpectedSyntax("field operator"));
  let err = parse(None, "local x = 1 x").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::RequiredTokenNotFound(crate::token::TT::Semicolon));
  let err = parse(None, "1 +").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnexpectedEnd);
  let err = parse(None, "f(a=1, 2)").unwrap_err();
  assert!(matches!(err.typ, SyntaxErrorType::ExpectedSyntax(_)));
  let err = parse(None, "import 'a' + x").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::ExpectedSyntax("end of file"));
  let err = parse(None, "{ [k]: 1, b: 2 for k in x }").unwrap_err();
  assert!(matches!(err.typ, SyntaxErrorType::ExpectedSyntax(_)));
  let err = parse(None, "a ]").unwrap_err();
  assert_eq!(err.range.begin, Position::new(1, 3));
}

#[test]
fn test_partial() {
  check_partial("local a = { b: 1 }; a.", "(local ((a {obj (\"b\": 1)})) (index a ?))");
  check_partial("{ a: ", "{obj (\"a\": ?)}");
  check_partial("std.length(", "(call (index std \"length\"))");
  check_partial("[1, ", "[1]");
  assert!(parse(None, "local a = 1; a.").is_err());
}
