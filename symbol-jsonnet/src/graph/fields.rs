use ahash::HashMap;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::Hide;
use parse_jsonnet::loc::LocationRange;
use serde::Serialize;

/// A field with a literal name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDecl {
  /// The object literal declaring the field.
  pub object: ExprId,
  pub name: String,
  /// The field's name expression.
  pub name_node: ExprId,
  pub range: LocationRange,
  pub body: ExprId,
  pub hide: Hide,
  pub method: bool,
}

/// Fields of every object literal in a file, addressed both per object and by their path from the
/// outermost object literal they're nested in. An object is nested in another when it's the value
/// of one of the other's fields, possibly through parentheses, `local`s and `+`.
#[derive(Default, Debug)]
pub struct ObjectFieldIndex {
  by_object: HashMap<ExprId, Vec<FieldDecl>>,
  by_path: HashMap<(ExprId, Vec<String>), FieldDecl>,
  address: HashMap<ExprId, (ExprId, Vec<String>)>,
}

impl ObjectFieldIndex {
  pub(crate) fn add_object(&mut self, object: ExprId, root: ExprId, path: Vec<String>) {
    self.by_object.entry(object).or_default();
    self.address.insert(object, (root, path));
  }

  pub(crate) fn add_field(&mut self, field: FieldDecl) {
    if let Some((root, prefix)) = self.address.get(&field.object) {
      let mut path = prefix.clone();
      path.push(field.name.clone());
      // With `{ a: {b: 1} + {b: 2} }`, the right operand's field wins, as it does when evaluated.
      self.by_path.insert((*root, path), field.clone());
    }
    self.by_object.entry(field.object).or_default().push(field);
  }

  /// Fields of an object literal, in declaration order.
  pub fn fields_of(&self, object: ExprId) -> &[FieldDecl] {
    self.by_object.get(&object).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn field(&self, object: ExprId, name: &str) -> Option<&FieldDecl> {
    self.fields_of(object).iter().rev().find(|f| f.name == name)
  }

  pub fn get(&self, root: ExprId, path: &[String]) -> Option<&FieldDecl> {
    self.by_path.get(&(root, path.to_vec()))
  }

  /// The outermost object literal an object is nested in, and the field path leading to it.
  pub fn address(&self, object: ExprId) -> Option<(ExprId, &[String])> {
    self
      .address
      .get(&object)
      .map(|(root, path)| (*root, path.as_slice()))
  }

  /// Every field whose path from `root` starts with `prefix`.
  pub fn under(&self, root: ExprId, prefix: &[String]) -> Vec<(&[String], &FieldDecl)> {
    let mut out: Vec<_> = self
      .by_path
      .iter()
      .filter(|((r, path), _)| *r == root && path.starts_with(prefix))
      .map(|((_, path), field)| (path.as_slice(), field))
      .collect();
    out.sort_by(|a, b| a.1.range.begin.cmp(&b.1.range.begin));
    out
  }
}
