use parse_jsonnet::ast::ExprId;
use parse_jsonnet::loc::LocationRange;
use serde::Serialize;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

/// Identifies a declaration within its [`ScopeGraph`](crate::graph::ScopeGraph).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct DeclId(pub u32);

impl DeclId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum DeclKind {
  /// The standard library, implicitly bound at the root.
  Builtin,
  Local,
  Parameter,
  ComprehensionVariable,
  ObjectLocal,
}

#[derive(Clone, Debug, Serialize)]
pub struct Declaration {
  pub name: String,
  pub kind: DeclKind,
  /// The construct introducing the binding: a `local`, function, object or comprehension.
  pub node: Option<ExprId>,
  /// The expression bound to the name: a bind's body, a parameter's default or the array a
  /// comprehension variable iterates over.
  pub value: Option<ExprId>,
  /// Where the name itself is written.
  pub range: Option<LocationRange>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ScopeType {
  Root,
  Local,
  Function,
  Object,
  Comprehension,
}

struct ScopeData {
  parent: Option<Scope>,
  typ: ScopeType,
  bindings: Vec<(String, DeclId)>,
}

/// An immutable chain of bindings. Child scopes share their ancestors, so a scope can be kept for
/// every expression without copying the names visible there.
#[derive(Clone)]
pub struct Scope(Arc<ScopeData>);

impl Scope {
  pub fn new(bindings: Vec<(String, DeclId)>) -> Scope {
    Scope(Arc::new(ScopeData {
      parent: None,
      typ: ScopeType::Root,
      bindings,
    }))
  }

  /// Create a scope adding `bindings` to this one. Adding nothing returns this scope itself.
  pub fn create_child_scope(&self, typ: ScopeType, bindings: Vec<(String, DeclId)>) -> Scope {
    if bindings.is_empty() {
      return self.clone();
    }
    Scope(Arc::new(ScopeData {
      parent: Some(self.clone()),
      typ,
      bindings,
    }))
  }

  pub fn parent(&self) -> Option<&Scope> {
    self.0.parent.as_ref()
  }

  pub fn typ(&self) -> ScopeType {
    self.0.typ
  }

  /// Bindings introduced by this scope itself, in declaration order.
  pub fn bindings(&self) -> &[(String, DeclId)] {
    &self.0.bindings
  }

  pub fn find_symbol_with_scope(&self, name: &str) -> Option<(Scope, DeclId)> {
    let mut scope = self;
    loop {
      if let Some((_, decl)) = scope.0.bindings.iter().find(|(n, _)| n == name) {
        return Some((scope.clone(), *decl));
      }
      scope = scope.parent()?;
    }
  }

  pub fn find_symbol(&self, name: &str) -> Option<DeclId> {
    self.find_symbol_with_scope(name).map(|(_, decl)| decl)
  }

  /// Every visible binding, innermost first, leaving out shadowed ones.
  pub fn visible(&self) -> Vec<(String, DeclId)> {
    let mut out: Vec<(String, DeclId)> = Vec::new();
    let mut scope = Some(self);
    while let Some(s) = scope {
      for (name, decl) in &s.0.bindings {
        if !out.iter().any(|(n, _)| n == name) {
          out.push((name.clone(), *decl));
        }
      }
      scope = s.parent();
    }
    out
  }

  pub fn depth(&self) -> usize {
    let mut depth = 0;
    let mut scope = self;
    while let Some(parent) = scope.parent() {
      depth += 1;
      scope = parent;
    }
    depth
  }
}

impl PartialEq for Scope {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Scope {}

impl Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("typ", &self.0.typ)
      .field("bindings", &self.0.bindings)
      .field("depth", &self.depth())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::DeclId;
  use super::Scope;
  use super::ScopeType;

  fn bind(names: &[(&str, u32)]) -> Vec<(String, DeclId)> {
    names
      .iter()
      .map(|(n, d)| (n.to_string(), DeclId(*d)))
      .collect()
  }

  #[test]
  fn test_find_symbol_returns_decl_scope() {
    let root = Scope::new(bind(&[("std", 0)]));
    let local = root.create_child_scope(ScopeType::Local, bind(&[("a", 1), ("b", 2)]));
    let func = local.create_child_scope(ScopeType::Function, bind(&[("a", 3)]));

    let (scope, decl) = func.find_symbol_with_scope("a").unwrap();
    assert_eq!(scope, func);
    assert_eq!(decl, DeclId(3));
    let (scope, decl) = func.find_symbol_with_scope("b").unwrap();
    assert_eq!(scope, local);
    assert_eq!(decl, DeclId(2));
    assert_eq!(func.find_symbol("std"), Some(DeclId(0)));
    assert_eq!(func.find_symbol("c"), None);
    assert_eq!(func.depth(), 2);
  }

  #[test]
  fn test_empty_child_is_parent() {
    let root = Scope::new(bind(&[("std", 0)]));
    let same = root.create_child_scope(ScopeType::Object, Vec::new());
    assert_eq!(same, root);
    assert_ne!(
      root.create_child_scope(ScopeType::Object, bind(&[("std", 0)])),
      root
    );
  }

  #[test]
  fn test_visible_skips_shadowed() {
    let root = Scope::new(bind(&[("std", 0)]));
    let outer = root.create_child_scope(ScopeType::Local, bind(&[("x", 1), ("y", 2)]));
    let inner = outer.create_child_scope(ScopeType::Comprehension, bind(&[("x", 3)]));
    let names: Vec<_> = inner
      .visible()
      .into_iter()
      .map(|(n, d)| (n, d.0))
      .collect();
    assert_eq!(names, vec![
      ("x".to_string(), 3),
      ("y".to_string(), 2),
      ("std".to_string(), 0)
    ]);
  }
}
