use crate::STD;
use parse_jsonnet::ast::Ast;
use parse_jsonnet::ast::CompSpec;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::ast::ObjectMember;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::token::TT;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::debug_span;

pub type VarSet = BTreeSet<String>;

/// Variables an expression refers to that are bound outside of it. Attached to every expression by
/// [`analyze`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FreeVars(pub VarSet);

/// Variables in scope at an expression, including any the expression itself binds. Attached to
/// every expression by [`analyze`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VisibleVars(pub Arc<VarSet>);

impl FreeVars {
  pub fn contains(&self, name: &str) -> bool {
    self.0.contains(name)
  }
}

impl VisibleVars {
  pub fn contains(&self, name: &str) -> bool {
    self.0.contains(name)
  }
}

/// Diagnostic codes (prefix `JA`):
/// - `JA0001`: [`AnalysisErrorType::UnknownVariable`]
/// - `JA0002`: [`AnalysisErrorType::SelfOutsideObject`]
/// - `JA0003`: [`AnalysisErrorType::SuperOutsideObject`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisErrorType {
  UnknownVariable(String),
  SelfOutsideObject,
  SuperOutsideObject,
}

impl AnalysisErrorType {
  pub fn code(&self) -> &'static str {
    match self {
      AnalysisErrorType::UnknownVariable(_) => "JA0001",
      AnalysisErrorType::SelfOutsideObject => "JA0002",
      AnalysisErrorType::SuperOutsideObject => "JA0003",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisError {
  pub typ: AnalysisErrorType,
  pub node: ExprId,
  pub range: Option<LocationRange>,
}

impl AnalysisError {
  pub fn code(&self) -> &'static str {
    self.typ.code()
  }

  pub fn message(&self) -> String {
    match &self.typ {
      AnalysisErrorType::UnknownVariable(name) => format!("Unknown variable: {name}"),
      AnalysisErrorType::SelfOutsideObject => "Can't use self outside of an object.".to_string(),
      AnalysisErrorType::SuperOutsideObject => "Can't use super outside of an object.".to_string(),
    }
  }
}

impl fmt::Display for AnalysisError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(range) = &self.range {
      write!(f, "{range} ")?;
    }
    write!(f, "{}: {}", self.code(), self.message())
  }
}

impl Error for AnalysisError {}

fn with<'n>(vars: &Arc<VarSet>, names: impl IntoIterator<Item = &'n str>) -> Arc<VarSet> {
  let mut names = names.into_iter().peekable();
  if names.peek().is_none() {
    return vars.clone();
  }
  let mut out = VarSet::clone(vars);
  out.extend(names.map(str::to_string));
  Arc::new(out)
}

fn absorb(acc: &mut VarSet, free: VarSet, bound: &[&str]) {
  acc.extend(free.into_iter().filter(|v| !bound.contains(&v.as_str())));
}

fn object_locals(members: &[ObjectMember]) -> Vec<&str> {
  members
    .iter()
    .filter_map(|m| match m {
      ObjectMember::Local(b) => Some(b.name.as_str()),
      _ => None,
    })
    .collect()
}

fn comp_vars(specs: &[CompSpec]) -> Vec<&str> {
  specs
    .iter()
    .filter_map(|s| match s {
      CompSpec::For { var, .. } => Some(var.as_str()),
      CompSpec::If { .. } => None,
    })
    .collect()
}

struct Analyzer<'a> {
  ast: &'a Ast,
  free: Vec<Option<VarSet>>,
  visible: Vec<Option<Arc<VarSet>>>,
}

impl<'a> Analyzer<'a> {
  fn error(&self, node: ExprId, typ: AnalysisErrorType) -> AnalysisError {
    AnalysisError {
      typ,
      node,
      range: self.ast.range(node).cloned(),
    }
  }

  /// Points at the `super` keyword of `super.x`, `super[x]` or `x in super` rather than the whole
  /// expression.
  fn super_error(&self, node: ExprId) -> AnalysisError {
    let ast = self.ast;
    let mut supers = ast.tokens.iter().filter(|t| {
      t.typ == TT::KeywordSuper && ast.get(node).loc.is_some_and(|l| l.0 <= t.loc.0 && t.loc.1 <= l.1)
    });
    let keyword = match ast.kind(node) {
      ExprKind::InSuper { .. } => supers.last(),
      _ => supers.next(),
    };
    AnalysisError {
      typ: AnalysisErrorType::SuperOutsideObject,
      node,
      range: keyword
        .map(|t| t.range.clone())
        .or_else(|| ast.range(node).cloned()),
    }
  }

  /// Specs bind progressively: each `for` variable is visible to the specs after it.
  fn visit_specs(
    &mut self,
    specs: &[CompSpec],
    vars: &Arc<VarSet>,
    in_object: bool,
    free: &mut VarSet,
  ) -> Result<(), AnalysisError> {
    let mut scope = vars.clone();
    let mut bound = Vec::new();
    for spec in specs {
      match spec {
        CompSpec::For { var, iter } => {
          let f = self.visit(*iter, &scope, in_object)?;
          absorb(free, f, &bound);
          bound.push(var.as_str());
          scope = with(&scope, [var.as_str()]);
        }
        CompSpec::If { cond } => {
          let f = self.visit(*cond, &scope, in_object)?;
          absorb(free, f, &bound);
        }
      }
    }
    Ok(())
  }

  fn visit_members(
    &mut self,
    members: &[ObjectMember],
    outer: &Arc<VarSet>,
    outer_in_object: bool,
    bound: &[&str],
    free: &mut VarSet,
  ) -> Result<Arc<VarSet>, AnalysisError> {
    let locals = object_locals(members);
    let inner = with(outer, locals.iter().copied());
    let mut inner_bound = bound.to_vec();
    inner_bound.extend(&locals);
    for member in members {
      match member {
        ObjectMember::Local(b) => {
          let f = self.visit(b.body, &inner, true)?;
          absorb(free, f, &inner_bound);
        }
        ObjectMember::Assert(a) => {
          let f = self.visit(a.cond, &inner, true)?;
          absorb(free, f, &inner_bound);
          if let Some(message) = a.message {
            let f = self.visit(message, &inner, true)?;
            absorb(free, f, &inner_bound);
          }
        }
        ObjectMember::Field(field) => {
          // Field names are evaluated outside the object.
          let f = self.visit(field.name, outer, outer_in_object)?;
          absorb(free, f, bound);
          let f = self.visit(field.body, &inner, true)?;
          absorb(free, f, &inner_bound);
        }
      }
    }
    Ok(inner)
  }

  fn visit(
    &mut self,
    id: ExprId,
    vars: &Arc<VarSet>,
    in_object: bool,
  ) -> Result<VarSet, AnalysisError> {
    let ast = self.ast;
    let mut free = VarSet::new();
    let visible = match ast.kind(id) {
      ExprKind::Var { name } => {
        if !vars.contains(name) {
          return Err(self.error(id, AnalysisErrorType::UnknownVariable(name.clone())));
        }
        free.insert(name.clone());
        vars.clone()
      }
      ExprKind::SelfRef if !in_object => {
        return Err(self.error(id, AnalysisErrorType::SelfOutsideObject));
      }
      ExprKind::Dollar if !in_object => {
        return Err(self.error(id, AnalysisErrorType::UnknownVariable("$".to_string())));
      }
      ExprKind::SuperIndex { .. } | ExprKind::InSuper { .. } if !in_object => {
        return Err(self.super_error(id));
      }
      ExprKind::Local { binds, body } => {
        let names: Vec<&str> = binds.iter().map(|b| b.name.as_str()).collect();
        let inner = with(vars, names.iter().copied());
        for bind in binds {
          let f = self.visit(bind.body, &inner, in_object)?;
          absorb(&mut free, f, &names);
        }
        let f = self.visit(*body, &inner, in_object)?;
        absorb(&mut free, f, &names);
        inner
      }
      ExprKind::Function { params, body } => {
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        let inner = with(vars, names.iter().copied());
        for default in params.iter().filter_map(|p| p.default) {
          let f = self.visit(default, &inner, in_object)?;
          absorb(&mut free, f, &names);
        }
        let f = self.visit(*body, &inner, in_object)?;
        absorb(&mut free, f, &names);
        inner
      }
      ExprKind::Object { members } => {
        self.visit_members(members, vars, in_object, &[], &mut free)?
      }
      ExprKind::ObjectComp { members, specs } => {
        let bound = comp_vars(specs);
        let scope = with(vars, bound.iter().copied());
        let inner = self.visit_members(members, &scope, in_object, &bound, &mut free)?;
        self.visit_specs(specs, vars, in_object, &mut free)?;
        inner
      }
      ExprKind::ArrayComp { body, specs } => {
        let bound = comp_vars(specs);
        let inner = with(vars, bound.iter().copied());
        let f = self.visit(*body, &inner, in_object)?;
        absorb(&mut free, f, &bound);
        self.visit_specs(specs, vars, in_object, &mut free)?;
        inner
      }
      ExprKind::Apply { .. }
      | ExprKind::Array { .. }
      | ExprKind::Assert { .. }
      | ExprKind::Binary { .. }
      | ExprKind::Conditional { .. }
      | ExprKind::Dollar
      | ExprKind::Error { .. }
      | ExprKind::Import { .. }
      | ExprKind::ImportBin { .. }
      | ExprKind::ImportStr { .. }
      | ExprKind::Index { .. }
      | ExprKind::InSuper { .. }
      | ExprKind::LiteralBoolean { .. }
      | ExprKind::LiteralNull
      | ExprKind::LiteralNumber { .. }
      | ExprKind::LiteralString { .. }
      | ExprKind::Parens { .. }
      | ExprKind::Partial
      | ExprKind::SelfRef
      | ExprKind::Slice { .. }
      | ExprKind::SuperIndex { .. }
      | ExprKind::Unary { .. } => {
        for child in ast.kind(id).children() {
          free.extend(self.visit(child, vars, in_object)?);
        }
        vars.clone()
      }
    };
    self.free[id.index()] = Some(free.clone());
    self.visible[id.index()] = Some(visible);
    Ok(free)
  }
}

/// Checks that every variable, `self`, `super` and `$` is bound, and attaches [`FreeVars`] and
/// [`VisibleVars`] to every expression. The standard library is implicitly in scope at the root.
///
/// Stops at the first error, leaving the tree without any results attached.
pub fn analyze(ast: &mut Ast) -> Result<(), AnalysisError> {
  let _span = debug_span!("analyze", exprs = ast.len()).entered();
  let root_vars = Arc::new(VarSet::from([STD.to_string()]));
  let len = ast.len();
  let mut analyzer = Analyzer {
    ast: &*ast,
    free: vec![None; len],
    visible: vec![None; len],
  };
  analyzer.visit(ast.root, &root_vars, false)?;
  let Analyzer { free, visible, .. } = analyzer;
  for (i, (free, visible)) in free.into_iter().zip(visible).enumerate() {
    let expr = ast.get_mut(ExprId(i as u32));
    if let Some(free) = free {
      expr.assoc.set(FreeVars(free));
    }
    if let Some(visible) = visible {
      expr.assoc.set(VisibleVars(visible));
    }
  }
  Ok(())
}
