use super::CompletionKind;
use super::Engine;
use super::EngineConfig;
use super::HighlightKind;
use super::ImportResolution;
use super::QueryError;
use super::SymbolKind;
use crate::graph::ScopeError;
use crate::host::MemoryHost;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use std::path::PathBuf;
use std::sync::Arc;

const MAIN: &str = "/main.jsonnet";

fn engine() -> Engine {
  Engine::new(Arc::new(MemoryHost::new()))
}

fn with_util(config: EngineConfig) -> Engine {
  let host = MemoryHost::new();
  host.write(
    "/lib/util.libsonnet",
    "{ greet(name, punct='!'):: 'hi ' + name + punct, version: '1.0' }",
  );
  Engine::new(Arc::new(host)).with_config(config.with_library_paths(vec![PathBuf::from("/lib")]))
}

fn pos(line: u32, column: u32) -> Position {
  Position::new(line, column)
}

fn range(file: Option<&str>, begin: (u32, u32), end: (u32, u32)) -> LocationRange {
  LocationRange::new(file.map(Arc::from), pos(begin.0, begin.1), pos(end.0, end.1))
}

fn main_range(line: u32, begin: u32, end: u32) -> LocationRange {
  range(Some(MAIN), (line, begin), (line, end))
}

#[test]
fn test_hover_variable() {
  let engine = engine();
  let found = engine.hover_at(MAIN, "local a=\"1\";a", pos(1, 13)).unwrap().unwrap();
  assert_eq!(found.text, "(string) 1");
  assert_eq!(found.range, main_range(1, 13, 14));
  assert_eq!(found.definition, Some(main_range(1, 7, 8)));

  // On the declaration itself.
  let found = engine.hover_at(MAIN, "local a=\"1\";a", pos(1, 7)).unwrap().unwrap();
  assert_eq!(found.text, "(string) 1");
  assert_eq!(found.range, main_range(1, 7, 8));
}

#[test]
fn test_hover_values() {
  let engine = engine();
  let code = "local o = { f(x, y=2):: x }; [o, o.f, std, function(p) p]";
  let hover = |column| engine.hover_at(MAIN, code, pos(1, column)).unwrap().unwrap().text;
  assert_eq!(hover(31), "(object) {...}");
  assert_eq!(hover(36), "(function) f(x, y=2)");
  assert_eq!(hover(39), "(builtin) std");
  assert_eq!(hover(56), "(parameter) p");
}

#[test]
fn test_hover_nothing_there() {
  let engine = engine();
  assert_eq!(engine.hover_at(MAIN, "1 + 2\n", pos(2, 1)).unwrap(), None);
}

#[test]
fn test_nested_field_resolution() {
  let engine = engine();
  let code = "local o={a:{b:\"b\"}}; o.a.b";
  assert_eq!(engine.definition_at(MAIN, code, pos(1, 26)).unwrap(), vec![
    main_range(1, 13, 14)
  ]);
  let found = engine.hover_at(MAIN, code, pos(1, 26)).unwrap().unwrap();
  assert_eq!(found.text, "(string) b");
  assert_eq!(found.range, main_range(1, 26, 27));
  // The middle of the chain is `a`.
  assert_eq!(engine.definition_at(MAIN, code, pos(1, 24)).unwrap(), vec![
    main_range(1, 10, 11)
  ]);
}

#[test]
fn test_cyclic_locals() {
  let engine = engine();
  let hover = |code: &str, column| engine.hover_at(MAIN, code, pos(1, column)).unwrap().unwrap().text;
  assert_eq!(hover("local a = a; a", 14), "(variable) a");
  assert_eq!(hover("local a = b, b = a; a", 21), "(variable) a");
  assert_eq!(hover("local a = a.x; a", 16), "(variable) a");
  // The field can't be found, so its name is just a string.
  assert_eq!(hover("local a = a + a; a.x", 20), "(string) x");
  assert_eq!(hover("local a = a + a; a", 18), "(variable) a");
  assert_eq!(hover("local o = { a: self + o }; o.a.b", 32), "(string) b");

  let found = engine.completion_at(MAIN, "local a = a + a; a.", pos(1, 20), &[]).unwrap();
  assert!(found.is_empty());
  let found = engine.completion_at(MAIN, "local a = a + a;\n[a", pos(2, 3), &[]).unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].detail, "(variable) a");
  let code = "local o = { x: 1 }, a = a + a; [o.x, a.x]";
  assert_eq!(engine.references_of(MAIN, code, pos(1, 35)).unwrap(), vec![
    main_range(1, 13, 14),
    main_range(1, 35, 36),
  ]);
}

#[test]
fn test_deep_merges_stay_bounded() {
  let engine = engine();
  let mut code = String::from("local l0 = { a: 1 }");
  for i in 1..=24 {
    code.push_str(&format!(", l{i} = l{p} + l{p}", p = i - 1));
  }
  code.push_str("; l24.a");
  let found = engine.hover_at(MAIN, &code, pos(1, code.len() as u32)).unwrap().unwrap();
  assert_eq!(found.text, "(number) 1");
  assert_eq!(found.definition, Some(main_range(1, 14, 15)));
}

#[test]
fn test_references_of_variable() {
  let engine = engine();
  assert_eq!(engine.references_of(MAIN, "local x=1; x", pos(1, 7)).unwrap(), vec![
    main_range(1, 7, 8),
    main_range(1, 12, 13),
  ]);
  // From a use, the result is the same.
  assert_eq!(engine.references_of(MAIN, "local x=1; x", pos(1, 12)).unwrap(), vec![
    main_range(1, 7, 8),
    main_range(1, 12, 13),
  ]);
}

#[test]
fn test_references_of_field_exclude_bare_uses() {
  let engine = engine();
  let code = "local x={a:'a'}; [x, x.a]";
  assert_eq!(engine.references_of(MAIN, code, pos(1, 10)).unwrap(), vec![
    main_range(1, 10, 11),
    main_range(1, 24, 25),
  ]);
}

#[test]
fn test_references_through_self_and_dollar() {
  let engine = engine();
  let code = "{ a: 1, b: self.a, c: $.a }";
  assert_eq!(engine.references_of(MAIN, code, pos(1, 3)).unwrap(), vec![
    main_range(1, 3, 4),
    main_range(1, 17, 18),
    main_range(1, 25, 26),
  ]);
}

#[test]
fn test_highlights() {
  let engine = engine();
  let found = engine.highlights_at(MAIN, "local x = 1; [x, x]", pos(1, 15)).unwrap();
  let found: Vec<_> = found.into_iter().map(|h| (h.range, h.kind)).collect();
  assert_eq!(found, vec![
    (main_range(1, 7, 8), HighlightKind::Declaration),
    (main_range(1, 15, 16), HighlightKind::Reference),
    (main_range(1, 18, 19), HighlightKind::Reference),
  ]);
}

#[test]
fn test_static_errors_fail_queries() {
  let engine = engine();
  let err = engine.hover_at(MAIN, "local x = self; x", pos(1, 17)).unwrap_err();
  assert_eq!(err.code(), "JA0002");
  let QueryError::Analysis(analysis) = &err else {
    panic!("expected analysis error, got {err:?}");
  };
  assert_eq!(analysis.range, Some(main_range(1, 11, 15)));
  let err = engine.hover_at(MAIN, "local x = 1;
x + super.y", pos(2, 1)).unwrap_err();
  assert_eq!(err.code(), "JA0003");
  let QueryError::Analysis(analysis) = &err else {
    panic!("expected analysis error, got {err:?}");
  };
  assert_eq!(analysis.range, Some(main_range(2, 5, 10)));
  let err = engine.references_of(MAIN, "local x = y; x", pos(1, 14)).unwrap_err();
  assert!(matches!(err, QueryError::Analysis(_)));
  assert!(err.to_string().contains("Unknown variable: y"));
  let err = engine.hover_at(MAIN, "local x = ; x", pos(1, 13)).unwrap_err();
  assert!(matches!(err, QueryError::Syntax(_)));
}

#[test]
fn test_cross_file_field() {
  let engine = with_util(EngineConfig::default());
  let code = "local u = import 'util.libsonnet'; u.version";
  let found = engine.hover_at(MAIN, code, pos(1, 40)).unwrap().unwrap();
  assert_eq!(found.text, "(string) 1.0");
  assert_eq!(
    found.definition,
    Some(range(Some("/lib/util.libsonnet"), (1, 50), (1, 57)))
  );
  assert_eq!(engine.hover_at(MAIN, code, pos(1, 7)).unwrap().unwrap().text, "(object) {...}");
  // Jumping from the import goes to the imported file.
  let found = engine.definition_at(MAIN, code, pos(1, 12)).unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].file.as_deref(), Some("/lib/util.libsonnet"));
  assert_eq!(engine.cache().len(), 1);
}

#[test]
fn test_unresolved_import() {
  let code = "import 'missing.libsonnet'";
  let err = engine().hover_at(MAIN, code, pos(1, 1)).unwrap_err();
  assert!(matches!(
    err,
    QueryError::Scope(ScopeError::UnresolvedImport { ref path, .. }) if path == "missing.libsonnet"
  ));
  assert_eq!(err.code(), "JS0001");

  let lazy = engine().with_config(EngineConfig::default().with_import_resolution(ImportResolution::Lazy));
  let found = lazy.hover_at(MAIN, code, pos(1, 1)).unwrap().unwrap();
  assert_eq!(found.text, "(import) missing.libsonnet");
}

#[test]
fn test_signature() {
  let engine = engine();
  let code = "local f(a, b=1) = a + b;\nf(1, ";
  let found = engine.signature_of(code, pos(2, 6)).unwrap().unwrap();
  assert_eq!(found.label, "f(a, b=1)");
  assert_eq!(found.parameters, vec!["a", "b"]);
  assert_eq!(found.active_parameter, Some(1));

  let found = engine
    .signature_of("local f(a, b=1) = a + b;\nf(b=", pos(2, 5))
    .unwrap()
    .unwrap();
  assert_eq!(found.active_parameter, Some(1));

  let found = engine
    .signature_of("local f(a, b) = a, g(x) = x;\nf(g(", pos(2, 5))
    .unwrap()
    .unwrap();
  assert_eq!(found.label, "g(x)");
  assert_eq!(found.active_parameter, Some(0));

  assert_eq!(engine.signature_of("local f(a) = a;\nf(1)", pos(2, 5)).unwrap(), None);
  assert_eq!(engine.signature_of("std.length(", pos(1, 12)).unwrap(), None);
}

#[test]
fn test_signature_across_files() {
  let engine = with_util(EngineConfig::default());
  let code = "local u = import 'util.libsonnet'; u.greet('bob', ";
  let found = engine.signature_of(code, pos(1, 51)).unwrap().unwrap();
  assert_eq!(found.label, "greet(name, punct='!')");
  assert_eq!(found.active_parameter, Some(1));
}

#[test]
fn test_completion_fields() {
  let engine = engine();
  let code = "local o = { a: 1, f(x):: x } + { b: 2 };\nlocal p = 3;\no.";
  let found = engine.completion_at(MAIN, code, pos(3, 3), &[]).unwrap();
  let labels: Vec<_> = found.iter().map(|c| (c.label.as_str(), c.kind)).collect();
  assert_eq!(labels, vec![
    ("a", CompletionKind::Field),
    ("f", CompletionKind::Method),
    ("b", CompletionKind::Field),
  ]);
  assert_eq!(found[1].detail, "(function) f(x)");

  // Text after the position is ignored, and a typed prefix filters.
  let code = "local o = { alpha: 1, beta: 2 };\no.al + 1";
  let found = engine.completion_at(MAIN, code, pos(2, 5), &[]).unwrap();
  let labels: Vec<_> = found.iter().map(|c| c.label.as_str()).collect();
  assert_eq!(labels, vec!["alpha"]);
}

#[test]
fn test_completion_variables() {
  let engine = engine();
  let code = "local alpha = 1, alps(x) = x;\nlocal beta = 2;\n[al";
  let found = engine.completion_at(MAIN, code, pos(3, 4), &[]).unwrap();
  let labels: Vec<_> = found.iter().map(|c| (c.label.as_str(), c.kind)).collect();
  assert_eq!(labels, vec![
    ("alpha", CompletionKind::Variable),
    ("alps", CompletionKind::Function),
  ]);

  let code = "local a = 1;\nfunction(p) ";
  let found = engine.completion_at(MAIN, code, pos(2, 13), &[]).unwrap();
  let labels: Vec<_> = found.iter().map(|c| (c.label.as_str(), c.kind)).collect();
  assert_eq!(labels, vec![
    ("p", CompletionKind::Parameter),
    ("a", CompletionKind::Variable),
    ("std", CompletionKind::Builtin),
  ]);
}

#[test]
fn test_completion_across_files() {
  let engine = with_util(EngineConfig::default());
  let code = "local u = import 'util.libsonnet';\nu.";
  let libs = engine.config().library_paths.clone();
  let found = engine.completion_at(MAIN, code, pos(2, 3), &libs).unwrap();
  let labels: Vec<_> = found.iter().map(|c| (c.label.as_str(), c.kind)).collect();
  assert_eq!(labels, vec![
    ("greet", CompletionKind::Method),
    ("version", CompletionKind::Field),
  ]);
}

#[test]
fn test_scope_at() {
  let engine = engine();
  let code = "local a = 1; local f(x) = x + a; f(2)";
  assert_eq!(engine.scope_at(MAIN, code, pos(1, 27)).unwrap(), vec!["a", "f", "std", "x"]);
  assert_eq!(engine.scope_at(MAIN, code, pos(1, 34)).unwrap(), vec!["a", "f", "std"]);
  assert!(engine.scope_at(MAIN, code, pos(2, 1)).unwrap().is_empty());
}

#[test]
fn test_document_symbols() {
  let engine = engine();
  let code = "local lib = { name: 'x', helper(a):: a, nested: { deep: 1 } };\nlocal f(x) = x;\nlib + { extra: f(1) }";
  let found = engine.document_symbols(code).unwrap();
  let top: Vec<_> = found.iter().map(|s| (s.name.as_str(), s.kind)).collect();
  assert_eq!(top, vec![
    ("lib", SymbolKind::Variable),
    ("f", SymbolKind::Function),
    ("extra", SymbolKind::Field),
  ]);
  assert_eq!(found[0].selection_range, range(None, (1, 7), (1, 10)));
  assert_eq!(found[0].range, range(None, (1, 7), (1, 62)));
  let fields: Vec<_> = found[0].children.iter().map(|s| (s.name.as_str(), s.kind)).collect();
  assert_eq!(fields, vec![
    ("name", SymbolKind::Field),
    ("helper", SymbolKind::Method),
    ("nested", SymbolKind::Field),
  ]);
  assert_eq!(found[0].children[2].children[0].name, "deep");
  assert_eq!(found[1].selection_range, range(None, (2, 7), (2, 8)));
  assert!(found[1].children.is_empty());
}

#[test]
fn test_results_serialize() {
  let engine = engine();
  let found = engine.hover_at(MAIN, "local a=\"1\";a", pos(1, 13)).unwrap().unwrap();
  let json = serde_json::to_value(&found).unwrap();
  assert_eq!(json["text"], "(string) 1");
  assert_eq!(json["range"]["begin"]["column"], 13);
}
