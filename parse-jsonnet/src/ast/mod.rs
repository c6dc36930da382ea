use crate::loc::LineIndex;
use crate::loc::LocationRange;
use crate::loc::Position;
use crate::token::Token;
use std::sync::Arc;

pub mod kind;
pub mod node;
pub mod print;

pub use kind::*;
pub use node::Expr;
pub use node::ExprId;
pub use node::NodeAssocData;

/// A parsed file. Expressions live in an arena and refer to each other by [`ExprId`]; the root is
/// always the last expression allocated.
#[derive(Debug)]
pub struct Ast {
  pub file: Option<Arc<str>>,
  pub source: Arc<str>,
  pub lines: LineIndex,
  pub tokens: Vec<Token>,
  pub exprs: Vec<Expr>,
  pub root: ExprId,
}

impl Ast {
  pub fn get(&self, id: ExprId) -> &Expr {
    &self.exprs[id.index()]
  }

  pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
    &mut self.exprs[id.index()]
  }

  pub fn kind(&self, id: ExprId) -> &ExprKind {
    &self.get(id).kind
  }

  pub fn range(&self, id: ExprId) -> Option<&LocationRange> {
    self.get(id).range.as_ref()
  }

  pub fn len(&self) -> usize {
    self.exprs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.exprs.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = ExprId> {
    (0..self.exprs.len() as u32).map(ExprId)
  }

  pub fn children(&self, id: ExprId) -> Vec<ExprId> {
    self.kind(id).children()
  }

  /// Parent of every expression, indexed by [`ExprId::index`]. The root has none.
  pub fn parents(&self) -> Vec<Option<ExprId>> {
    let mut parents = vec![None; self.exprs.len()];
    for id in self.ids() {
      for child in self.children(id) {
        parents[child.index()] = Some(id);
      }
    }
    parents
  }

  /// All expressions reachable from the root, parents before children and siblings in source
  /// order.
  pub fn preorder(&self) -> Vec<ExprId> {
    let mut out = Vec::with_capacity(self.exprs.len());
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      out.push(id);
      stack.extend(self.children(id).into_iter().rev());
    }
    out
  }

  pub fn position(&self, offset: usize) -> Position {
    self.lines.position(&self.source, offset)
  }

  pub fn offset(&self, pos: Position) -> usize {
    self.lines.offset(&self.source, pos)
  }
}
