use super::describe::params_text;
use super::Engine;
use super::QueryResult;
use crate::graph::resolve::FileExpr;
use parse_jsonnet::ast::Ast;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::loc::Position;
use parse_jsonnet::matcher::RangeRecovery;
use parse_jsonnet::token::Token;
use parse_jsonnet::token::TT;
use serde::Serialize;
use tracing::debug_span;
use tracing::trace;

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Signature {
  /// Such as `f(a, b=1)`.
  pub label: String,
  pub parameters: Vec<String>,
  /// The parameter the argument being typed is passed to, if any.
  pub active_parameter: Option<usize>,
}

/// A call whose argument list hasn't been closed yet.
struct OpenCall {
  apply: ExprId,
  // How many arguments precede the one being typed.
  argument: usize,
  // Set when the argument being typed is passed by name.
  named: Option<String>,
}

/// Scans the arguments after the `(` at `open`. Returns `None` if the list is closed.
fn scan_args(tokens: &[Token], open: usize) -> Option<(usize, Option<String>)> {
  let mut depth = 0usize;
  let mut argument = 0;
  let mut start = open + 1;
  for (i, t) in tokens.iter().enumerate().skip(open + 1) {
    match t.typ {
      TT::ParenthesisOpen | TT::BracketOpen | TT::BraceOpen => depth += 1,
      TT::ParenthesisClose | TT::BracketClose | TT::BraceClose => {
        if depth == 0 {
          return None;
        }
        depth -= 1;
      }
      TT::Comma if depth == 0 => {
        argument += 1;
        start = i + 1;
      }
      _ => {}
    };
  }
  let named = match (tokens.get(start), tokens.get(start + 1)) {
    (Some(name), Some(eq)) if name.typ == TT::Identifier && eq.is_operator("=") => {
      Some(name.text.clone())
    }
    _ => None,
  };
  Some((argument, named))
}

/// The innermost call the end of the source is inside the arguments of.
fn open_call(ast: &Ast) -> Option<OpenCall> {
  let recovery = RangeRecovery::new(ast);
  let mut found: Option<(usize, OpenCall)> = None;
  for id in ast.ids() {
    let Some(open) = recovery.args_open(id) else {
      continue;
    };
    if found.as_ref().is_some_and(|(best, _)| *best > open) {
      continue;
    }
    if let Some((argument, named)) = scan_args(&ast.tokens, open) {
      found = Some((open, OpenCall {
        apply: id,
        argument,
        named,
      }));
    }
  }
  found.map(|(_, call)| call)
}

fn callee_name(ast: &Ast, target: ExprId) -> &str {
  match ast.kind(target) {
    ExprKind::Var { name } => name,
    ExprKind::Index { index, .. } => ast.kind(*index).as_string_literal().unwrap_or(""),
    _ => "",
  }
}

impl Engine {
  /// The signature of the function whose arguments are being typed at a position. Only the source
  /// before the position is considered, so the call doesn't need to be complete.
  pub fn signature_of(&self, source: &str, pos: Position) -> QueryResult<Option<Signature>> {
    let _span = debug_span!("signature_of", line = pos.line, column = pos.column).entered();
    let parsed = self.load_prefix(None, source, pos)?;
    let Some(call) = open_call(&parsed.ast) else {
      trace!("not inside a call");
      return Ok(None);
    };
    let ExprKind::Apply { target, .. } = parsed.ast.kind(call.apply) else {
      return Ok(None);
    };
    let libs = self.config.library_paths.clone();
    let imports = self.imports(&libs);
    let resolver = self.resolver(&imports);
    let func = resolver.value(&FileExpr::new(parsed.clone(), *target));
    let ExprKind::Function { params, .. } = func.kind() else {
      trace!(callee = func.kind().name(), "callee isn't a known function");
      return Ok(None);
    };
    let parameters: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
    let active_parameter = match &call.named {
      Some(name) => parameters.iter().position(|p| p == name),
      None => (call.argument < parameters.len()).then_some(call.argument),
    };
    Ok(Some(Signature {
      label: format!(
        "{}({})",
        callee_name(&parsed.ast, *target),
        params_text(&func.file, params).join(", ")
      ),
      parameters,
      active_parameter,
    }))
  }
}
