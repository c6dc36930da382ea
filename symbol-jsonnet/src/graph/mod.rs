use crate::file::ImportResolver;
use crate::file::ParsedFile;
use crate::locate::locate;
use crate::scope::DeclId;
use crate::scope::DeclKind;
use crate::scope::Declaration;
use crate::scope::Scope;
use crate::scope::ScopeType;
use crate::STD;
use ahash::HashMap;
use fields::FieldDecl;
use fields::ObjectFieldIndex;
use parse_jsonnet::ast::Ast;
use parse_jsonnet::ast::BinaryOp;
use parse_jsonnet::ast::CompSpec;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::ast::FieldKind;
use parse_jsonnet::ast::ObjectMember;
use parse_jsonnet::error::SyntaxError;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use parse_jsonnet::matcher::RangeRecovery;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing::debug_span;

pub mod fields;
pub mod resolve;

/// Diagnostic codes: `JS0001` for [`ScopeError::UnresolvedImport`]; syntax errors keep their own.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeError {
  UnresolvedImport {
    path: String,
    range: Option<LocationRange>,
    reason: String,
  },
  Syntax(SyntaxError),
}

impl ScopeError {
  pub fn code(&self) -> &'static str {
    match self {
      ScopeError::UnresolvedImport { .. } => "JS0001",
      ScopeError::Syntax(err) => err.code(),
    }
  }
}

impl From<SyntaxError> for ScopeError {
  fn from(value: SyntaxError) -> Self {
    ScopeError::Syntax(value)
  }
}

impl fmt::Display for ScopeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScopeError::UnresolvedImport {
        path,
        range,
        reason,
      } => {
        if let Some(range) = range {
          write!(f, "{range} ")?;
        }
        write!(f, "JS0001: couldn't resolve import '{path}': {reason}")
      }
      ScopeError::Syntax(err) => write!(f, "{err}"),
    }
  }
}

impl Error for ScopeError {}

/// One literal step of a field access chain, such as `.b` in `a.b`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PathSegment {
  pub name: String,
  /// The index expression.
  pub node: ExprId,
  /// Where the field name is written.
  pub range: LocationRange,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum RefRoot {
  Decl(DeclId),
  /// `self` or `$`, normalized to the outermost object literal the referenced object is nested in.
  Object(ExprId),
}

/// A use of a variable, `self` or `$`, with the literal field accesses applied to it. The chain
/// stops at the first computed index, so `a[k].b` records just `a`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reference {
  pub root: RefRoot,
  pub node: ExprId,
  pub range: LocationRange,
  /// The implicit path from [`RefRoot::Object`] to the object `self` or `$` refers to.
  pub base: Vec<String>,
  pub path: Vec<PathSegment>,
}

impl Reference {
  /// Field names from the root through the first `depth` written segments.
  pub fn names(&self, depth: usize) -> Vec<String> {
    let mut names = self.base.clone();
    names.extend(self.path[..depth].iter().map(|s| s.name.clone()));
    names
  }

  /// Where the reference reaches `depth` segments into its path: the root itself for zero.
  pub fn site(&self, depth: usize) -> &LocationRange {
    match depth {
      0 => &self.range,
      d => &self.path[d - 1].range,
    }
  }

  fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
    self.path.len() >= path.len()
      && self
        .path
        .iter()
        .zip(path)
        .all(|(s, p)| s.name == p.as_ref())
  }
}

/// Declarations, scopes, references and object fields of one file.
pub struct ScopeGraph {
  decls: Vec<Declaration>,
  scopes: Vec<Option<Scope>>,
  references: Vec<Reference>,
  reference_of: HashMap<ExprId, usize>,
  fields: ObjectFieldIndex,
  object_of: HashMap<ExprId, ExprId>,
  imports: HashMap<ExprId, Arc<ParsedFile>>,
  std: DeclId,
}

impl ScopeGraph {
  /// Build the graph of a parsed file. With an import resolver, every `import` is loaded now and one
  /// that can't be is an error; without one, imports are left for queries to resolve.
  pub fn build(
    ast: &Ast,
    importer: Option<&Path>,
    imports: Option<&dyn ImportResolver>,
  ) -> Result<ScopeGraph, ScopeError> {
    let _span = debug_span!("build_scope_graph", exprs = ast.len()).entered();
    let std = DeclId(0);
    let mut builder = Builder {
      ast,
      recovery: RangeRecovery::new(ast),
      importer,
      imports,
      graph: ScopeGraph {
        decls: vec![Declaration {
          name: STD.to_string(),
          kind: DeclKind::Builtin,
          node: None,
          value: None,
          range: None,
        }],
        scopes: vec![None; ast.len()],
        references: Vec::new(),
        reference_of: HashMap::default(),
        fields: ObjectFieldIndex::default(),
        object_of: HashMap::default(),
        imports: HashMap::default(),
        std,
      },
    };
    let root = Scope::new(vec![(STD.to_string(), std)]);
    builder.visit(ast.root, &root, &Context::default())?;
    let graph = builder.graph;
    debug!(
      decls = graph.decls.len(),
      references = graph.references.len(),
      imports = graph.imports.len(),
      "built scope graph"
    );
    Ok(graph)
  }

  pub fn decl(&self, id: DeclId) -> &Declaration {
    &self.decls[id.index()]
  }

  pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
    self
      .decls
      .iter()
      .enumerate()
      .map(|(i, d)| (DeclId(i as u32), d))
  }

  /// The implicitly bound standard library.
  pub fn std(&self) -> DeclId {
    self.std
  }

  /// Bindings visible at an expression, including those the expression itself introduces.
  pub fn scope(&self, node: ExprId) -> Option<&Scope> {
    self.scopes.get(node.index()).and_then(Option::as_ref)
  }

  pub fn lookup(&self, node: ExprId, name: &str) -> Option<DeclId> {
    self.scope(node)?.find_symbol(name)
  }

  /// The scope at the innermost expression containing a position.
  pub fn at(&self, ast: &Ast, pos: Position) -> Option<&Scope> {
    self.scope(locate(ast, pos).ok()?)
  }

  /// The declaration whose name is written at a position.
  pub fn decl_at(&self, pos: Position) -> Option<DeclId> {
    self
      .decls()
      .find(|(_, d)| d.range.as_ref().is_some_and(|r| r.contains(pos)))
      .map(|(id, _)| id)
  }

  pub fn references(&self) -> &[Reference] {
    &self.references
  }

  /// The reference rooted at a variable, `self` or `$` expression.
  pub fn reference_of(&self, node: ExprId) -> Option<&Reference> {
    self.reference_of.get(&node).map(|&i| &self.references[i])
  }

  /// Where `decl` is used with `path` as the start of its field access chain. With an empty path,
  /// that's every use; otherwise it's where the last field of the path is written.
  pub fn references_to<S: AsRef<str>>(&self, decl: DeclId, path: &[S]) -> Vec<LocationRange> {
    self
      .references
      .iter()
      .filter(|r| r.root == RefRoot::Decl(decl) && r.matches(path))
      .map(|r| r.site(path.len()).clone())
      .collect()
  }

  pub fn fields(&self) -> &ObjectFieldIndex {
    &self.fields
  }

  /// The object literal a `self`, `$`, `super` or `in super` expression refers to.
  pub fn object_of(&self, node: ExprId) -> Option<ExprId> {
    self.object_of.get(&node).copied()
  }

  /// The file an `import` expression loaded while the graph was built.
  pub fn import(&self, node: ExprId) -> Option<&Arc<ParsedFile>> {
    self.imports.get(&node)
  }
}

#[derive(Clone, Default)]
struct Context {
  self_object: Option<ExprId>,
  dollar_object: Option<ExprId>,
  // Set while descending the value of a literal field, so nested objects can be addressed by path.
  field_path: Option<(ExprId, Vec<String>)>,
}

impl Context {
  fn without_path(&self) -> Context {
    Context {
      self_object: self.self_object,
      dollar_object: self.dollar_object,
      field_path: None,
    }
  }
}

struct Builder<'a> {
  ast: &'a Ast,
  recovery: RangeRecovery<'a>,
  importer: Option<&'a Path>,
  imports: Option<&'a dyn ImportResolver>,
  graph: ScopeGraph,
}

impl<'a> Builder<'a> {
  fn declare(
    &mut self,
    name: &str,
    kind: DeclKind,
    node: ExprId,
    value: Option<ExprId>,
    range: Option<LocationRange>,
  ) -> (String, DeclId) {
    let id = DeclId(self.graph.decls.len() as u32);
    self.graph.decls.push(Declaration {
      name: name.to_string(),
      kind,
      node: Some(node),
      value,
      range,
    });
    (name.to_string(), id)
  }

  fn set_scope(&mut self, id: ExprId, scope: &Scope) {
    self.graph.scopes[id.index()] = Some(scope.clone());
  }

  fn reference(&mut self, node: ExprId, root: RefRoot, base: Vec<String>) {
    let ast = self.ast;
    let Some(range) = ast.range(node).cloned() else {
      return;
    };
    let mut path = Vec::new();
    let mut cur = node;
    while let Some(parent) = self.recovery.parent(cur) {
      let ExprKind::Index { target, index } = ast.kind(parent) else {
        break;
      };
      if *target != cur {
        break;
      }
      let (Some(name), Some(name_range)) =
        (ast.kind(*index).as_string_literal(), ast.range(*index))
      else {
        break;
      };
      path.push(PathSegment {
        name: name.to_string(),
        node: parent,
        range: name_range.clone(),
      });
      cur = parent;
    }
    self
      .graph
      .reference_of
      .insert(node, self.graph.references.len());
    self.graph.references.push(Reference {
      root,
      node,
      range,
      base,
      path,
    });
  }

  fn object_reference(&mut self, node: ExprId, object: Option<ExprId>) {
    let Some(object) = object else {
      return;
    };
    self.graph.object_of.insert(node, object);
    let (root, base) = match self.graph.fields.address(object) {
      Some((root, base)) => (root, base.to_vec()),
      None => (object, Vec::new()),
    };
    self.reference(node, RefRoot::Object(root), base);
  }

  /// Declares comprehension variables, returning their bindings in spec order.
  fn declare_comp_vars(
    &mut self,
    comp: ExprId,
    specs: &[CompSpec],
  ) -> Result<Vec<(String, DeclId)>, ScopeError> {
    let mut ranges = self
      .recovery
      .comp_spec_ranges(comp)?
      .into_iter()
      .filter_map(|s| s.variable);
    let mut out = Vec::new();
    for spec in specs {
      if let CompSpec::For { var, iter } = spec {
        let range = ranges.next();
        out.push(self.declare(var, DeclKind::ComprehensionVariable, comp, Some(*iter), range));
      }
    }
    Ok(out)
  }

  fn visit_specs(
    &mut self,
    specs: &[CompSpec],
    vars: &[(String, DeclId)],
    scope: &Scope,
    ctx: &Context,
  ) -> Result<(), ScopeError> {
    let mut scope = scope.clone();
    let mut vars = vars.iter();
    for spec in specs {
      match spec {
        CompSpec::For { iter, .. } => {
          self.visit(*iter, &scope, ctx)?;
          if let Some(var) = vars.next() {
            scope = scope.create_child_scope(ScopeType::Comprehension, vec![var.clone()]);
          }
        }
        CompSpec::If { cond } => self.visit(*cond, &scope, ctx)?,
      }
    }
    Ok(())
  }

  fn visit_object(
    &mut self,
    id: ExprId,
    members: &[ObjectMember],
    outer: &Scope,
    ctx: &Context,
  ) -> Result<(), ScopeError> {
    let ast = self.ast;
    let (root, prefix) = match &ctx.field_path {
      Some((root, path)) => (*root, path.clone()),
      None => (id, Vec::new()),
    };
    self.graph.fields.add_object(id, root, prefix.clone());

    let mut locals = Vec::new();
    for member in members {
      if let ObjectMember::Local(b) = member {
        locals.push(self.declare(
          &b.name,
          DeclKind::ObjectLocal,
          id,
          Some(b.body),
          Some(b.name_range.clone()),
        ));
      }
    }
    let inner = outer.create_child_scope(ScopeType::Object, locals);
    self.set_scope(id, &inner);

    let member_ctx = Context {
      self_object: Some(id),
      dollar_object: ctx.dollar_object.or(Some(id)),
      field_path: None,
    };
    for member in members {
      match member {
        ObjectMember::Local(b) => self.visit(b.body, &inner, &member_ctx)?,
        ObjectMember::Assert(a) => {
          self.visit(a.cond, &inner, &member_ctx)?;
          if let Some(message) = a.message {
            self.visit(message, &inner, &member_ctx)?;
          }
        }
        ObjectMember::Field(field) => {
          self.visit(field.name, outer, &ctx.without_path())?;
          let name = match field.kind {
            FieldKind::Computed => None,
            FieldKind::Id | FieldKind::Str => ast.kind(field.name).as_string_literal(),
          };
          let mut body_ctx = member_ctx.clone();
          if let (Some(name), Some(range)) = (name, ast.range(field.name)) {
            self.graph.fields.add_field(FieldDecl {
              object: id,
              name: name.to_string(),
              name_node: field.name,
              range: range.clone(),
              body: field.body,
              hide: field.hide,
              method: field.method,
            });
            let mut path = prefix.clone();
            path.push(name.to_string());
            body_ctx.field_path = Some((root, path));
          }
          self.visit(field.body, &inner, &body_ctx)?;
        }
      }
    }
    Ok(())
  }

  fn visit(&mut self, id: ExprId, scope: &Scope, ctx: &Context) -> Result<(), ScopeError> {
    let ast = self.ast;
    match ast.kind(id) {
      ExprKind::Var { name } => {
        self.set_scope(id, scope);
        if let Some(decl) = scope.find_symbol(name) {
          self.reference(id, RefRoot::Decl(decl), Vec::new());
        }
      }
      ExprKind::SelfRef => {
        self.set_scope(id, scope);
        self.object_reference(id, ctx.self_object);
      }
      ExprKind::Dollar => {
        self.set_scope(id, scope);
        self.object_reference(id, ctx.dollar_object);
      }
      ExprKind::SuperIndex { index: inner } | ExprKind::InSuper { element: inner } => {
        self.set_scope(id, scope);
        if let Some(object) = ctx.self_object {
          self.graph.object_of.insert(id, object);
        }
        self.visit(*inner, scope, &ctx.without_path())?;
      }
      ExprKind::Local { binds, body } => {
        let bindings = binds
          .iter()
          .map(|b| {
            self.declare(
              &b.name,
              DeclKind::Local,
              id,
              Some(b.body),
              Some(b.name_range.clone()),
            )
          })
          .collect();
        let inner = scope.create_child_scope(ScopeType::Local, bindings);
        self.set_scope(id, &inner);
        for bind in binds {
          self.visit(bind.body, &inner, &ctx.without_path())?;
        }
        self.visit(*body, &inner, ctx)?;
      }
      ExprKind::Function { params, body } => {
        let ranges = self.recovery.param_ranges(id)?;
        let bindings = params
          .iter()
          .enumerate()
          .map(|(i, p)| {
            let range = ranges.get(i).map(|r| r.head.clone());
            self.declare(&p.name, DeclKind::Parameter, id, p.default, range)
          })
          .collect();
        let inner = scope.create_child_scope(ScopeType::Function, bindings);
        self.set_scope(id, &inner);
        let ctx = ctx.without_path();
        for default in params.iter().filter_map(|p| p.default) {
          self.visit(default, &inner, &ctx)?;
        }
        self.visit(*body, &inner, &ctx)?;
      }
      ExprKind::Object { members } => self.visit_object(id, members, scope, ctx)?,
      ExprKind::ObjectComp { members, specs } => {
        let vars = self.declare_comp_vars(id, specs)?;
        let all = scope.create_child_scope(ScopeType::Comprehension, vars.clone());
        self.visit_object(id, members, &all, &ctx.without_path())?;
        self.visit_specs(specs, &vars, scope, &ctx.without_path())?;
      }
      ExprKind::ArrayComp { body, specs } => {
        let vars = self.declare_comp_vars(id, specs)?;
        let all = scope.create_child_scope(ScopeType::Comprehension, vars.clone());
        self.set_scope(id, &all);
        let ctx = ctx.without_path();
        self.visit(*body, &all, &ctx)?;
        self.visit_specs(specs, &vars, scope, &ctx)?;
      }
      ExprKind::Import { file } => {
        self.set_scope(id, scope);
        if let Some(imports) = self.imports {
          let _span = debug_span!("resolve_import", path = file.as_str()).entered();
          match imports.resolve_import(self.importer, file) {
            Ok(parsed) => {
              self.graph.imports.insert(id, parsed);
            }
            Err(err) => {
              return Err(ScopeError::UnresolvedImport {
                path: file.clone(),
                range: ast.range(id).cloned(),
                reason: err.to_string(),
              });
            }
          }
        }
      }
      // The value of a field stays addressable through these.
      ExprKind::Parens { inner } => {
        self.set_scope(id, scope);
        self.visit(*inner, scope, ctx)?;
      }
      ExprKind::Binary {
        op: BinaryOp::Plus,
        left,
        right,
      } => {
        self.set_scope(id, scope);
        self.visit(*left, scope, ctx)?;
        self.visit(*right, scope, ctx)?;
      }
      ExprKind::Apply { .. }
      | ExprKind::Array { .. }
      | ExprKind::Assert { .. }
      | ExprKind::Binary { .. }
      | ExprKind::Conditional { .. }
      | ExprKind::Error { .. }
      | ExprKind::ImportBin { .. }
      | ExprKind::ImportStr { .. }
      | ExprKind::Index { .. }
      | ExprKind::LiteralBoolean { .. }
      | ExprKind::LiteralNull
      | ExprKind::LiteralNumber { .. }
      | ExprKind::LiteralString { .. }
      | ExprKind::Partial
      | ExprKind::Slice { .. }
      | ExprKind::Unary { .. } => {
        self.set_scope(id, scope);
        let ctx = ctx.without_path();
        for child in ast.kind(id).children() {
          self.visit(child, scope, &ctx)?;
        }
      }
    }
    Ok(())
  }
}
