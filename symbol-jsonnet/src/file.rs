use crate::analysis::analyze;
use crate::analysis::AnalysisError;
use crate::cache::CacheError;
use crate::graph::ScopeError;
use crate::graph::ScopeGraph;
use parse_jsonnet::ast::Ast;
use std::fmt;
use std::fmt::Debug;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Loads the files `import` expressions refer to.
pub trait ImportResolver {
  /// Resolve `path` as written in a file at `importer`.
  fn resolve_import(
    &self,
    importer: Option<&Path>,
    path: &str,
  ) -> Result<Arc<ParsedFile>, CacheError>;
}

/// A parsed file with its scope graph.
pub struct ParsedFile {
  pub path: Option<PathBuf>,
  pub ast: Ast,
  pub graph: ScopeGraph,
  /// Static analysis never stops a file from being indexed, but queries that need a sound program
  /// report this error.
  pub analysis: Result<(), AnalysisError>,
}

impl ParsedFile {
  pub fn new(
    path: Option<PathBuf>,
    mut ast: Ast,
    imports: Option<&dyn ImportResolver>,
  ) -> Result<ParsedFile, ScopeError> {
    let analysis = analyze(&mut ast);
    let graph = ScopeGraph::build(&ast, path.as_deref(), imports)?;
    Ok(ParsedFile {
      path,
      ast,
      graph,
      analysis,
    })
  }
}

impl Debug for ParsedFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ParsedFile")
      .field("path", &self.path)
      .field("exprs", &self.ast.len())
      .field("decls", &self.graph.decls().count())
      .finish()
  }
}
