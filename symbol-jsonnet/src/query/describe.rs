use crate::file::ParsedFile;
use crate::graph::resolve::FieldRef;
use crate::graph::resolve::FileExpr;
use crate::graph::resolve::Resolver;
use crate::scope::DeclId;
use crate::scope::DeclKind;
use parse_jsonnet::ast::BinaryOp;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::ast::Param;
use parse_jsonnet::loc::LocationRange;
use serde::Serialize;
use std::sync::Arc;

/// What hovering over something shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Description {
  /// Such as `(object) {...}` or `(function) f(a, b=1)`.
  pub text: String,
  /// What was hovered over.
  pub range: LocationRange,
  pub definition: Option<LocationRange>,
}

// Long enough for a short literal or call, short enough for a one-line hover.
const MAX_SNIPPET: usize = 40;

/// Source text of an expression, on one line.
pub(crate) fn snippet(expr: &FileExpr) -> Option<String> {
  let loc = expr.file.ast.get(expr.id).loc?;
  let text = expr.file.ast.source.get(loc.0..loc.1)?;
  let line = text.lines().next().unwrap_or("");
  Some(match line.char_indices().nth(MAX_SNIPPET) {
    Some((i, _)) => format!("{}...", &line[..i]),
    None if line.len() < text.len() => format!("{line}..."),
    None => line.to_string(),
  })
}

pub(crate) fn params_text(file: &Arc<ParsedFile>, params: &[Param]) -> Vec<String> {
  params
    .iter()
    .map(|p| match p.default {
      Some(default) => match snippet(&FileExpr::new(file.clone(), default)) {
        Some(text) => format!("{}={}", p.name, text),
        None => p.name.clone(),
      },
      None => p.name.clone(),
    })
    .collect()
}

/// Describe a value, naming it `name` if it turns out to be a function.
pub(crate) fn describe_value(resolver: &Resolver<'_>, expr: &FileExpr, name: Option<&str>) -> String {
  let value = resolver.value(expr);
  match value.kind() {
    ExprKind::Object { .. } | ExprKind::ObjectComp { .. } => "(object) {...}".to_string(),
    ExprKind::Function { params, .. } => format!(
      "(function) {}({})",
      name.unwrap_or(""),
      params_text(&value.file, params).join(", ")
    ),
    ExprKind::LiteralString { value, .. } => format!("(string) {value}"),
    ExprKind::LiteralNumber { text } => format!("(number) {text}"),
    ExprKind::LiteralBoolean { value } => format!("(boolean) {value}"),
    ExprKind::LiteralNull => "(null) null".to_string(),
    ExprKind::Array { .. } | ExprKind::ArrayComp { .. } => "(array) [...]".to_string(),
    ExprKind::Import { file } => format!("(import) {file}"),
    ExprKind::ImportStr { file } => format!("(importstr) {file}"),
    ExprKind::ImportBin { file } => format!("(importbin) {file}"),
    ExprKind::Binary {
      op: BinaryOp::Plus, ..
    } if !resolver.objects(&value).is_empty() => "(object) {...}".to_string(),
    // The resolver stops at a variable without a value, or at one whose value loops back.
    ExprKind::Var { name: var } => match value.file.graph.lookup(value.id, var) {
      Some(decl) if !has_value(value.file.graph.decl(decl).kind) => {
        describe_decl(resolver, &value.file, decl)
      }
      _ => format!("(variable) {}", name.unwrap_or(var)),
    },
    _ => match name {
      Some(name) => format!("(variable) {name}"),
      None => format!("(value) {}", snippet(&value).unwrap_or_default()),
    },
  }
}

fn has_value(kind: DeclKind) -> bool {
  matches!(kind, DeclKind::Local | DeclKind::ObjectLocal)
}

pub(crate) fn describe_decl(resolver: &Resolver<'_>, file: &Arc<ParsedFile>, decl: DeclId) -> String {
  let d = file.graph.decl(decl);
  match d.kind {
    DeclKind::Builtin => format!("(builtin) {}", d.name),
    DeclKind::Parameter => format!("(parameter) {}", d.name),
    DeclKind::ComprehensionVariable => format!("(variable) {}", d.name),
    DeclKind::Local | DeclKind::ObjectLocal => match resolver.decl_value(file, decl) {
      Some(value) => describe_value(resolver, &value, Some(&d.name)),
      None => format!("(variable) {}", d.name),
    },
  }
}

pub(crate) fn describe_field(resolver: &Resolver<'_>, field: &FieldRef) -> String {
  describe_value(resolver, &field.body(), Some(&field.field.name))
}

#[cfg(test)]
mod tests {
  use super::describe_value;
  use super::snippet;
  use crate::file::ParsedFile;
  use crate::graph::resolve::FileExpr;
  use crate::graph::resolve::Resolver;
  use parse_jsonnet::ast::ExprKind;
  use parse_jsonnet::parse;
  use std::sync::Arc;

  fn describe_root_binds(code: &str) -> Vec<String> {
    let file = Arc::new(ParsedFile::new(None, parse(None, code).unwrap(), None).unwrap());
    let resolver = Resolver::new(None, 32);
    let ExprKind::Local { binds, .. } = file.ast.kind(file.ast.root) else {
      panic!("expected local");
    };
    binds
      .iter()
      .map(|b| {
        describe_value(
          &resolver,
          &FileExpr::new(file.clone(), b.body),
          Some(&b.name),
        )
      })
      .collect()
  }

  #[test]
  fn test_describe_values() {
    let found = describe_root_binds(
      "local o = {}, f(a, b=1) = a, s = 'x', n = 1.5, t = true, z = null, arr = [1], i = import 'x.libsonnet', m = o + { b: 2 }, alias = f, c = std.length([]); 0",
    );
    assert_eq!(found, vec![
      "(object) {...}",
      "(function) f(a, b=1)",
      "(string) x",
      "(number) 1.5",
      "(boolean) true",
      "(null) null",
      "(array) [...]",
      "(import) x.libsonnet",
      "(object) {...}",
      "(function) alias(a, b=1)",
      "(variable) c",
    ]);
  }

  #[test]
  fn test_describe_cyclic_locals() {
    let found = describe_root_binds("local a = a, b = c, c = b, d = d + d, e = e.x; 0");
    assert_eq!(found, vec![
      "(variable) a",
      "(variable) b",
      "(variable) c",
      "(variable) d",
      "(variable) e",
    ]);
  }

  #[test]
  fn test_snippet_is_one_short_line() {
    let file = Arc::new(
      ParsedFile::new(
        None,
        parse(None, "[\n1]+[aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa]").unwrap(),
        None,
      )
      .unwrap(),
    );
    let ExprKind::Binary { left, right, .. } = file.ast.kind(file.ast.root) else {
      panic!("expected binary");
    };
    assert_eq!(snippet(&FileExpr::new(file.clone(), *left)).unwrap(), "[...");
    let right = snippet(&FileExpr::new(file.clone(), *right)).unwrap();
    assert_eq!(right.chars().count(), 43);
  }
}
