use crate::analysis::AnalysisError;
use crate::cache::CacheError;
use crate::cache::CacheImports;
use crate::cache::NodeCache;
use crate::file::ImportResolver;
use crate::file::ParsedFile;
use crate::graph::resolve::FieldRef;
use crate::graph::resolve::FileExpr;
use crate::graph::resolve::Resolver;
use crate::graph::RefRoot;
use crate::graph::ScopeError;
use crate::host::Host;
use crate::locate::locate;
use crate::scope::DeclId;
use derive_more::From;
use parse_jsonnet::ast::Ast;
use parse_jsonnet::ast::ExprId;
use parse_jsonnet::ast::ExprKind;
use parse_jsonnet::ast::FieldKind;
use parse_jsonnet::ast::ObjectMember;
use parse_jsonnet::error::SyntaxError;
use parse_jsonnet::loc::LineIndex;
use parse_jsonnet::loc::LocationRange;
use parse_jsonnet::loc::Position;
use parse_jsonnet::parse;
use parse_jsonnet::parse_partial;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub mod completion;
pub mod config;
pub mod describe;
pub mod hover;
pub mod references;
pub mod signature;
pub mod symbols;

pub use completion::CompletionCandidate;
pub use completion::CompletionKind;
pub use config::EngineConfig;
pub use config::ImportResolution;
pub use describe::Description;
pub use references::Highlight;
pub use references::HighlightKind;
pub use signature::Signature;
pub use symbols::DocumentSymbol;
pub use symbols::SymbolKind;

/// Why a query couldn't be answered. A query that simply finds nothing at the position isn't an
/// error; it returns nothing.
#[derive(Clone, Debug, PartialEq, From)]
pub enum QueryError {
  Syntax(SyntaxError),
  Analysis(AnalysisError),
  Scope(ScopeError),
  Cache(CacheError),
}

impl QueryError {
  pub fn code(&self) -> &'static str {
    match self {
      QueryError::Syntax(err) => err.code(),
      QueryError::Analysis(err) => err.code(),
      QueryError::Scope(err) => err.code(),
      QueryError::Cache(CacheError::Syntax(err)) => err.code(),
      QueryError::Cache(CacheError::Scope(err)) => err.code(),
      QueryError::Cache(_) => "JC0001",
    }
  }
}

impl fmt::Display for QueryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryError::Syntax(err) => write!(f, "{err}"),
      QueryError::Analysis(err) => write!(f, "{err}"),
      QueryError::Scope(err) => write!(f, "{err}"),
      QueryError::Cache(err) => write!(f, "{err}"),
    }
  }
}

impl Error for QueryError {}

pub type QueryResult<T> = Result<T, QueryError>;

/// What a position in a file refers to.
#[derive(Clone, Debug)]
pub(crate) enum Target {
  Decl(DeclId),
  Field(FieldRef),
  /// What `self` or `$` refers to.
  Object(FileExpr),
  Value(ExprId),
}

/// Answers editor queries about Jsonnet files. Queried files are parsed afresh from the text given,
/// since editors query unsaved buffers, while the files they import are cached.
pub struct Engine {
  host: Arc<dyn Host>,
  cache: Arc<NodeCache>,
  config: EngineConfig,
}

impl Engine {
  pub fn new(host: Arc<dyn Host>) -> Engine {
    Engine {
      host,
      cache: Arc::new(NodeCache::new()),
      config: EngineConfig::default(),
    }
  }

  pub fn with_config(mut self, config: EngineConfig) -> Engine {
    self.config = config;
    self
  }

  /// Share a cache with other engines, such as one per workspace folder.
  pub fn with_cache(mut self, cache: Arc<NodeCache>) -> Engine {
    self.cache = cache;
    self
  }

  pub fn host(&self) -> &Arc<dyn Host> {
    &self.host
  }

  pub fn cache(&self) -> &Arc<NodeCache> {
    &self.cache
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub(crate) fn imports<'a>(&'a self, library_paths: &'a [PathBuf]) -> CacheImports<'a> {
    CacheImports {
      cache: &self.cache,
      host: self.host.as_ref(),
      library_paths,
    }
  }

  pub(crate) fn resolver<'a>(&self, imports: &'a CacheImports<'a>) -> Resolver<'a> {
    let imports: Option<&dyn ImportResolver> = match self.config.import_resolution {
      ImportResolution::Off => None,
      ImportResolution::Eager | ImportResolution::Lazy => Some(imports),
    };
    Resolver::new(imports, self.config.max_resolution_depth)
  }

  /// Parse and index a complete file.
  pub(crate) fn load(
    &self,
    file: Option<&str>,
    source: &str,
    imports: &CacheImports<'_>,
  ) -> QueryResult<Arc<ParsedFile>> {
    let ast = parse(file, source)?;
    let eager: Option<&dyn ImportResolver> = match self.config.import_resolution {
      ImportResolution::Eager => Some(imports),
      ImportResolution::Lazy | ImportResolution::Off => None,
    };
    Ok(Arc::new(ParsedFile::new(file.map(PathBuf::from), ast, eager)?))
  }

  /// Parse and index a file being typed, up to the position being typed at. Imports are left for
  /// the resolver, so one being typed doesn't fail the query.
  pub(crate) fn load_prefix(
    &self,
    file: Option<&str>,
    source: &str,
    pos: Position,
  ) -> QueryResult<Arc<ParsedFile>> {
    let offset = LineIndex::new(source).offset(source, pos);
    let ast = parse_partial(file, &source[..offset])?;
    Ok(Arc::new(ParsedFile::new(file.map(PathBuf::from), ast, None)?))
  }

  /// Find what a position refers to: a declaration's name, a variable, a field name in an object
  /// literal or field access, `self` or `$`, or otherwise the innermost expression there.
  pub(crate) fn target_at(
    &self,
    file: &Arc<ParsedFile>,
    resolver: &Resolver<'_>,
    pos: Position,
  ) -> Option<(Target, LocationRange)> {
    let graph = &file.graph;
    if let Some(decl) = graph.decl_at(pos) {
      let range = graph.decl(decl).range.clone()?;
      return Some((Target::Decl(decl), range));
    }
    let ast = &file.ast;
    let node = locate(ast, pos).ok()?;
    let range = ast.range(node)?.clone();
    let target = match ast.kind(node) {
      ExprKind::Var { .. } => match graph.reference_of(node)?.root {
        RefRoot::Decl(decl) => Target::Decl(decl),
        RefRoot::Object(_) => return None,
      },
      ExprKind::SelfRef | ExprKind::Dollar => {
        Target::Object(FileExpr::new(file.clone(), graph.object_of(node)?))
      }
      ExprKind::LiteralString { .. } => match field_name_target(file, resolver, node) {
        Some(field) => Target::Field(field),
        None => Target::Value(node),
      },
      _ => Target::Value(node),
    };
    Some((target, range))
  }
}

fn parent_of(ast: &Ast, node: ExprId) -> Option<ExprId> {
  ast.parents()[node.index()]
}

/// The field a string literal names, when it's a field access's name or a literal field's name.
fn field_name_target(
  file: &Arc<ParsedFile>,
  resolver: &Resolver<'_>,
  node: ExprId,
) -> Option<FieldRef> {
  let ast = &file.ast;
  let parent = parent_of(ast, node)?;
  match ast.kind(parent) {
    ExprKind::Index { target, index } if *index == node => {
      // Through the reference chain when there is one, so `self` and `$` resolve too.
      let mut root = *target;
      while let ExprKind::Index { target, .. } = ast.kind(root) {
        root = *target;
      }
      if let Some(reference) = file.graph.reference_of(root) {
        if let Some(depth) = reference.path.iter().position(|s| s.node == parent) {
          return resolver.reference_field(file, reference, depth + 1);
        }
      }
      let name = ast.kind(node).as_string_literal()?;
      resolver.field(&FileExpr::new(file.clone(), *target), name)
    }
    ExprKind::Object { members } => members.iter().find_map(|m| match m {
      ObjectMember::Field(f) if f.name == node && f.kind != FieldKind::Computed => {
        let field = file
          .graph
          .fields()
          .fields_of(parent)
          .iter()
          .find(|d| d.name_node == node)?
          .clone();
        Some(FieldRef {
          file: file.clone(),
          field,
        })
      }
      _ => None,
    }),
    _ => None,
  }
}

/// Orders ranges by where they start and drops duplicates.
pub(crate) fn sort_ranges(ranges: &mut Vec<LocationRange>) {
  ranges.sort_by(|a, b| {
    (a.file.as_deref(), a.begin, a.end).cmp(&(b.file.as_deref(), b.begin, b.end))
  });
  ranges.dedup();
}

#[cfg(test)]
mod tests;
