use super::describe::describe_decl;
use super::describe::describe_field;
use super::describe::describe_value;
use super::describe::Description;
use super::Engine;
use super::QueryResult;
use super::Target;
use crate::graph::resolve::FileExpr;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use tracing::debug_span;

impl Engine {
  /// Describe what's at a position. Nothing there to describe isn't an error.
  pub fn hover_at(&self, file: &str, source: &str, pos: Position) -> QueryResult<Option<Description>> {
    let _span = debug_span!("hover_at", file, line = pos.line, column = pos.column).entered();
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let parsed = self.load(Some(file), source, &imports)?;
    parsed.analysis.clone()?;
    let resolver = self.resolver(&imports);
    let Some((target, range)) = self.target_at(&parsed, &resolver, pos) else {
      return Ok(None);
    };
    let (text, definition) = match &target {
      Target::Decl(decl) => (
        describe_decl(&resolver, &parsed, *decl),
        parsed.graph.decl(*decl).range.clone(),
      ),
      Target::Field(field) => (describe_field(&resolver, field), Some(field.field.range.clone())),
      Target::Object(object) => ("(object) {...}".to_string(), object.range().cloned()),
      Target::Value(node) => (
        describe_value(&resolver, &FileExpr::new(parsed.clone(), *node), None),
        None,
      ),
    };
    Ok(Some(Description {
      text,
      range,
      definition,
    }))
  }

  /// Where what's at a position is defined. For an import, that's the imported file.
  pub fn definition_at(&self, file: &str, source: &str, pos: Position) -> QueryResult<Vec<LocationRange>> {
    let _span = debug_span!("definition_at", file, line = pos.line, column = pos.column).entered();
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let parsed = self.load(Some(file), source, &imports)?;
    parsed.analysis.clone()?;
    let resolver = self.resolver(&imports);
    let Some((target, _)) = self.target_at(&parsed, &resolver, pos) else {
      return Ok(Vec::new());
    };
    let definition = match target {
      Target::Decl(decl) => parsed.graph.decl(decl).range.clone(),
      Target::Field(field) => Some(field.field.range),
      Target::Object(object) => object.range().cloned(),
      Target::Value(node) => match parsed.ast.kind(node) {
        ExprKind::Import { .. } => resolver
          .import(&parsed, node)
          .and_then(|imported| imported.ast.range(imported.ast.root).cloned()),
        _ => None,
      },
    };
    Ok(definition.into_iter().collect())
  }
}
