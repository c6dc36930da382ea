use super::describe::describe_decl;
use super::describe::describe_field;
use super::Engine;
use super::QueryResult;
use crate::analysis::VisibleVars;
use crate::file::ParsedFile;
use crate::graph::resolve::FieldRef;
use crate::graph::resolve::FileExpr;
use crate::graph::resolve::Resolver;
use crate::locate::locate;
use crate::scope::DeclKind;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::loc::Position;
use parse_jsonnet::token::TT;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::debug_span;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum CompletionKind {
  Variable,
  Function,
  Field,
  Method,
  Parameter,
  Builtin,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CompletionCandidate {
  pub label: String,
  pub kind: CompletionKind,
  /// What hovering over the candidate would show.
  pub detail: String,
}

/// What's being completed at the end of a file being typed.
enum Completing<'a> {
  /// A field name after `target.`.
  Field { target: ExprId, prefix: &'a str },
  /// A variable, where an expression is expected.
  Variable { at: ExprId, prefix: &'a str },
}

fn completing(file: &ParsedFile) -> Option<Completing<'_>> {
  let ast = &file.ast;
  let end = ast.source.len();
  let mut tokens = ast.tokens.iter().rev().filter(|t| t.typ != TT::EOF);
  let last = tokens.next();
  let before = tokens.next();
  let typing = last.filter(|t| t.typ == TT::Identifier && t.loc.1 == end);
  let prefix = typing.map(|t| t.text.as_str()).unwrap_or("");
  let after_dot = match typing {
    Some(_) => before.is_some_and(|t| t.typ == TT::Dot),
    None => last.is_some_and(|t| t.typ == TT::Dot),
  };
  if after_dot {
    // The access being typed is the one whose name ends where the source does.
    return ast.ids().find_map(|id| match ast.kind(id) {
      ExprKind::Index { target, index } if ast.get(*index).loc.is_some_and(|l| l.1 == end) => {
        Some(Completing::Field {
          target: *target,
          prefix,
        })
      }
      _ => None,
    });
  }
  let at = match typing {
    Some(t) => ast
      .ids()
      .find(|&id| matches!(ast.kind(id), ExprKind::Var { .. }) && ast.get(id).loc == Some(t.loc)),
    None => ast
      .ids()
      .filter(|&id| matches!(ast.kind(id), ExprKind::Partial))
      .last(),
  }?;
  Some(Completing::Variable { at, prefix })
}

fn is_function(resolver: &Resolver<'_>, expr: &FileExpr) -> bool {
  matches!(resolver.value(expr).kind(), ExprKind::Function { .. })
}

/// Fields of every object the target may be, the left operand of `+` first, each name once.
fn field_candidates(
  file: &Arc<ParsedFile>,
  resolver: &Resolver<'_>,
  target: ExprId,
  prefix: &str,
) -> Vec<CompletionCandidate> {
  let target = FileExpr::new(file.clone(), target);
  let mut out: Vec<CompletionCandidate> = Vec::new();
  for object in resolver.objects(&target).iter().rev() {
    for decl in object.file.graph.fields().fields_of(object.id) {
      if !decl.name.starts_with(prefix) || out.iter().any(|c| c.label == decl.name) {
        continue;
      }
      // Describe the field that wins when the objects are merged.
      let field = resolver.field(&target, &decl.name).unwrap_or_else(|| FieldRef {
        file: object.file.clone(),
        field: decl.clone(),
      });
      let kind = if field.field.method || is_function(resolver, &field.body()) {
        CompletionKind::Method
      } else {
        CompletionKind::Field
      };
      out.push(CompletionCandidate {
        label: decl.name.clone(),
        kind,
        detail: describe_field(resolver, &field),
      });
    }
  }
  out
}

/// Visible variables, innermost first, so the standard library comes last.
fn variable_candidates(
  file: &Arc<ParsedFile>,
  resolver: &Resolver<'_>,
  at: ExprId,
  prefix: &str,
) -> Vec<CompletionCandidate> {
  let Some(scope) = file.graph.scope(at) else {
    return Vec::new();
  };
  scope
    .visible()
    .into_iter()
    .filter(|(name, _)| name.starts_with(prefix))
    .map(|(name, decl)| {
      let kind = match file.graph.decl(decl).kind {
        DeclKind::Builtin => CompletionKind::Builtin,
        DeclKind::Parameter => CompletionKind::Parameter,
        DeclKind::ComprehensionVariable => CompletionKind::Variable,
        DeclKind::Local | DeclKind::ObjectLocal => match resolver.decl_value(file, decl) {
          Some(value) if is_function(resolver, &value) => CompletionKind::Function,
          _ => CompletionKind::Variable,
        },
      };
      CompletionCandidate {
        label: name,
        kind,
        detail: describe_decl(resolver, file, decl),
      }
    })
    .collect()
}

impl Engine {
  /// Candidates for what's being typed at a position: the fields of an object after a `.`, and
  /// otherwise the variables in scope. Only the source before the position is considered, and
  /// imports are looked up in `library_paths`.
  pub fn completion_at(
    &self,
    file: &str,
    source: &str,
    pos: Position,
    library_paths: &[PathBuf],
  ) -> QueryResult<Vec<CompletionCandidate>> {
    let _span = debug_span!("completion_at", file, line = pos.line, column = pos.column).entered();
    let parsed = self.load_prefix(Some(file), source, pos)?;
    let imports = self.imports(library_paths);
    let resolver = self.resolver(&imports);
    let candidates = match completing(&parsed) {
      Some(Completing::Field { target, prefix }) => {
        field_candidates(&parsed, &resolver, target, prefix)
      }
      Some(Completing::Variable { at, prefix }) => {
        variable_candidates(&parsed, &resolver, at, prefix)
      }
      None => Vec::new(),
    };
    debug!(count = candidates.len(), "completion candidates");
    Ok(candidates)
  }

  /// Names of the variables visible at a position, sorted. Nothing is visible outside the
  /// document.
  pub fn scope_at(&self, file: &str, source: &str, pos: Position) -> QueryResult<Vec<String>> {
    let _span = debug_span!("scope_at", file, line = pos.line, column = pos.column).entered();
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let parsed = self.load(Some(file), source, &imports)?;
    parsed.analysis.clone()?;
    let Ok(node) = locate(&parsed.ast, pos) else {
      return Ok(Vec::new());
    };
    Ok(
      parsed
        .ast
        .get(node)
        .assoc
        .get::<VisibleVars>()
        .map(|vars| vars.0.iter().cloned().collect())
        .unwrap_or_default(),
    )
  }
}
