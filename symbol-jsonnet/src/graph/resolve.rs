use super::fields::FieldDecl;
use super::RefRoot;
use super::Reference;
use crate::file::ImportResolver;
use crate::file::ParsedFile;
use crate::scope::DeclId;
use crate::scope::DeclKind;
use parse_jsonnet::ast::BinaryOp;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::loc::LocationRange;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;
use tracing::trace;

/// An expression in a particular file.
#[derive(Clone)]
pub struct FileExpr {
  pub file: Arc<ParsedFile>,
  pub id: ExprId,
}

impl FileExpr {
  pub fn new(file: Arc<ParsedFile>, id: ExprId) -> FileExpr {
    FileExpr { file, id }
  }

  pub fn kind(&self) -> &ExprKind {
    self.file.ast.kind(self.id)
  }

  pub fn range(&self) -> Option<&LocationRange> {
    self.file.ast.range(self.id)
  }

  fn at(&self, id: ExprId) -> FileExpr {
    FileExpr::new(self.file.clone(), id)
  }
}

impl PartialEq for FileExpr {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.file, &other.file) && self.id == other.id
  }
}

impl Debug for FileExpr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}@{:?}", self.id, self.file.path)
  }
}

/// A literal field of an object in a particular file.
#[derive(Clone)]
pub struct FieldRef {
  pub file: Arc<ParsedFile>,
  pub field: FieldDecl,
}

impl FieldRef {
  pub fn body(&self) -> FileExpr {
    FileExpr::new(self.file.clone(), self.field.body)
  }
}

impl PartialEq for FieldRef {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.file, &other.file)
      && self.field.object == other.field.object
      && self.field.name == other.field.name
  }
}

impl Debug for FieldRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{:?}", self.field.name, self.file.path)
  }
}

// Shared by everything one lookup does, so branching through `+` and conditionals stays bounded.
const MAX_STEPS: usize = 4096;

/// State of one lookup.
struct Walk {
  /// Values whose objects or fields are being looked up further up the stack.
  active: Vec<FileExpr>,
  steps: usize,
}

impl Walk {
  fn new() -> Walk {
    Walk {
      active: Vec::new(),
      steps: MAX_STEPS,
    }
  }

  fn step(&mut self) -> bool {
    if self.steps == 0 {
      return false;
    }
    self.steps -= 1;
    true
  }
}

/// Works out syntactically what values are, following variables, parentheses, `local` bodies,
/// literal field accesses, imports and `+`. Nothing is evaluated. Cycles such as `local a = a + a`
/// stop where they loop back.
pub struct Resolver<'a> {
  imports: Option<&'a dyn ImportResolver>,
  max_depth: usize,
}

impl<'a> Resolver<'a> {
  pub fn new(imports: Option<&'a dyn ImportResolver>, max_depth: usize) -> Resolver<'a> {
    Resolver { imports, max_depth }
  }

  /// The file an `import` refers to: the one loaded with the graph, or else one loaded now.
  pub fn import(&self, file: &Arc<ParsedFile>, node: ExprId) -> Option<Arc<ParsedFile>> {
    if let Some(imported) = file.graph.import(node) {
      return Some(imported.clone());
    }
    let ExprKind::Import { file: path } = file.ast.kind(node) else {
      return None;
    };
    match self.imports?.resolve_import(file.path.as_deref(), path) {
      Ok(imported) => Some(imported),
      Err(err) => {
        debug!(path = path.as_str(), error = %err, "import left unresolved");
        None
      }
    }
  }

  /// The expression bound to a `local`, if any. Parameters and comprehension variables take values
  /// only known when evaluating, so they have none.
  pub fn decl_value(&self, file: &Arc<ParsedFile>, decl: DeclId) -> Option<FileExpr> {
    let decl = file.graph.decl(decl);
    match decl.kind {
      DeclKind::Local | DeclKind::ObjectLocal => Some(FileExpr::new(file.clone(), decl.value?)),
      _ => None,
    }
  }

  /// The expression a value is written as, through any number of indirections. A variable is
  /// returned as is when it has no value or its value loops back to it.
  pub fn value(&self, expr: &FileExpr) -> FileExpr {
    self.value_in(expr, &mut Walk::new())
  }

  fn value_in(&self, expr: &FileExpr, walk: &mut Walk) -> FileExpr {
    let mut cur = expr.clone();
    let mut chain: Vec<FileExpr> = Vec::new();
    loop {
      if chain.len() > self.max_depth || !walk.step() {
        trace!("resolution limit reached");
        return cur;
      }
      let next = match cur.kind() {
        ExprKind::Parens { inner } => Some(cur.at(*inner)),
        ExprKind::Local { body, .. } => Some(cur.at(*body)),
        ExprKind::Var { name } => cur
          .file
          .graph
          .lookup(cur.id, name)
          .and_then(|decl| self.decl_value(&cur.file, decl)),
        ExprKind::Index { target, index } => match cur.file.ast.kind(*index).as_string_literal() {
          Some(name) if walk.active.len() <= self.max_depth => {
            walk.active.push(cur.clone());
            let field = self.field_in(&cur.at(*target), name, walk);
            walk.active.pop();
            field.map(|f| f.body())
          }
          _ => None,
        },
        ExprKind::Import { .. } => self
          .import(&cur.file, cur.id)
          .map(|file| FileExpr::new(file.clone(), file.ast.root)),
        ExprKind::SelfRef | ExprKind::Dollar => cur.file.graph.object_of(cur.id).map(|o| cur.at(o)),
        _ => None,
      };
      let Some(next) = next else {
        return cur;
      };
      if next == cur || chain.contains(&next) || walk.active.contains(&next) {
        trace!("resolution cycle");
        return cur;
      }
      chain.push(std::mem::replace(&mut cur, next));
    }
  }

  /// Object literals a value may be, in the order fields are looked up: the right operand of `+`
  /// before the left.
  pub fn objects(&self, expr: &FileExpr) -> Vec<FileExpr> {
    self.objects_in(expr, &mut Walk::new())
  }

  fn objects_in(&self, expr: &FileExpr, walk: &mut Walk) -> Vec<FileExpr> {
    if walk.active.len() > self.max_depth || !walk.step() {
      return Vec::new();
    }
    let value = self.value_in(expr, walk);
    if walk.active.contains(&value) {
      return Vec::new();
    }
    walk.active.push(value.clone());
    let out = match value.kind() {
      ExprKind::Object { .. } | ExprKind::ObjectComp { .. } => vec![value.clone()],
      ExprKind::Binary {
        op: BinaryOp::Plus,
        left,
        right,
      } => {
        let mut out = self.objects_in(&value.at(*right), walk);
        out.extend(self.objects_in(&value.at(*left), walk));
        out
      }
      ExprKind::Conditional {
        then, otherwise, ..
      } => {
        let mut out = self.objects_in(&value.at(*then), walk);
        if let Some(otherwise) = otherwise {
          out.extend(self.objects_in(&value.at(*otherwise), walk));
        }
        out
      }
      ExprKind::Apply { target, .. } => {
        let func = self.value_in(&value.at(*target), walk);
        match func.kind() {
          ExprKind::Function { body, .. } => self.objects_in(&func.at(*body), walk),
          _ => Vec::new(),
        }
      }
      _ => Vec::new(),
    };
    walk.active.pop();
    out
  }

  /// The field a value has under `name`.
  pub fn field(&self, expr: &FileExpr, name: &str) -> Option<FieldRef> {
    self.field_in(expr, name, &mut Walk::new())
  }

  fn field_in(&self, expr: &FileExpr, name: &str, walk: &mut Walk) -> Option<FieldRef> {
    self
      .objects_in(expr, walk)
      .into_iter()
      .find_map(|object| {
        let field = object.file.graph.fields().field(object.id, name)?.clone();
        Some(FieldRef {
          file: object.file.clone(),
          field,
        })
      })
  }

  /// The field reached by following `names` from a value.
  pub fn field_path<S: AsRef<str>>(&self, expr: &FileExpr, names: &[S]) -> Option<FieldRef> {
    let mut cur = expr.clone();
    let mut found = None;
    for name in names {
      let field = self.field(&cur, name.as_ref())?;
      cur = field.body();
      found = Some(field);
    }
    found
  }

  /// Where a reference's chain starts.
  pub fn reference_root(&self, file: &Arc<ParsedFile>, reference: &Reference) -> Option<FileExpr> {
    match reference.root {
      RefRoot::Decl(decl) => self.decl_value(file, decl),
      RefRoot::Object(object) => Some(FileExpr::new(file.clone(), object)),
    }
  }

  /// The field a reference reaches `depth` segments into its written path.
  pub fn reference_field(
    &self,
    file: &Arc<ParsedFile>,
    reference: &Reference,
    depth: usize,
  ) -> Option<FieldRef> {
    let names = reference.names(depth);
    if names.is_empty() {
      return None;
    }
    let root = self.reference_root(file, reference)?;
    self.field_path(&root, &names)
  }
}
