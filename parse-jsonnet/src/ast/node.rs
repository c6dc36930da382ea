use super::kind::ExprKind;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;
use crate::loc::LocationRange;
use ahash::HashMap;
use serde::Serialize;
use serde::Serializer;
use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;

#[derive(Default)]
pub struct NodeAssocData {
  // Bounded by Send + Sync so parsed files can be shared between threads through the node cache.
  map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl NodeAssocData {
  pub fn get<T: Any>(&self) -> Option<&T> {
    let t = TypeId::of::<T>();
    self.map.get(&t).and_then(|v| v.downcast_ref())
  }

  pub fn set<T: Any + Send + Sync>(&mut self, v: T) {
    let t = TypeId::of::<T>();
    self.map.insert(t, Box::from(v));
  }
}

/// Identifies an expression within its [`Ast`](super::Ast) arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct ExprId(pub u32);

impl ExprId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

pub struct Expr {
  // Desugared nodes (e.g. the function behind `f(x):: x`) don't correspond to any source text and
  // have no location.
  pub loc: Option<Loc>,
  pub range: Option<LocationRange>,
  pub kind: ExprKind,
  pub assoc: NodeAssocData,
}

impl Expr {
  pub fn new(loc: Option<Loc>, range: Option<LocationRange>, kind: ExprKind) -> Expr {
    Expr {
      loc,
      range,
      kind,
      assoc: NodeAssocData::default(),
    }
  }

  /// Create an error at this node's location.
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    SyntaxError::new(
      typ,
      self.loc.unwrap_or(Loc(0, 0)),
      self.range.clone().unwrap_or_default(),
      None,
    )
  }
}

impl Debug for Expr {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    self.kind.fmt(f)
  }
}

impl Serialize for Expr {
  fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
    self.kind.serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::NodeAssocData;

  #[test]
  fn test_node_assoc_data() {
    struct MyType(u32);
    let mut assoc = NodeAssocData::default();
    assoc.set(MyType(32));
    let v = assoc.get::<MyType>().unwrap();
    assert_eq!(v.0, 32);
    assert!(assoc.get::<u8>().is_none());
  }
}
