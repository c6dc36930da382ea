use crate::file::ImportResolver;
use crate::file::ParsedFile;
use crate::graph::ScopeError;
use crate::host::Host;
use crate::host::HostError;
use ahash::HashMap;
use ahash::HashSet;
use imports::collect_imports;
use imports::ImportKind;
use parking_lot::Mutex;
use parse_jsonnet::error::SyntaxError;
use parse_jsonnet::parse;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;
use tracing::debug_span;
use tracing::trace;

pub mod imports;

#[derive(Clone, Debug, PartialEq)]
pub enum CacheError {
  Host(HostError),
  ImportNotFound {
    name: String,
    importer: Option<PathBuf>,
  },
  Syntax(SyntaxError),
  Scope(ScopeError),
}

impl From<HostError> for CacheError {
  fn from(value: HostError) -> Self {
    CacheError::Host(value)
  }
}

impl From<SyntaxError> for CacheError {
  fn from(value: SyntaxError) -> Self {
    CacheError::Syntax(value)
  }
}

impl From<ScopeError> for CacheError {
  fn from(value: ScopeError) -> Self {
    CacheError::Scope(value)
  }
}

impl fmt::Display for CacheError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheError::Host(err) => write!(f, "host error: {err}"),
      CacheError::ImportNotFound {
        name,
        importer: Some(importer),
      } => write!(f, "couldn't find '{name}' imported from {}", importer.display()),
      CacheError::ImportNotFound {
        name,
        importer: None,
      } => write!(f, "couldn't find '{name}'"),
      CacheError::Syntax(err) => write!(f, "{err}"),
      CacheError::Scope(err) => write!(f, "{err}"),
    }
  }
}

impl Error for CacheError {}

#[derive(Clone, Debug)]
pub struct NodeCacheEntry {
  pub node: Arc<ParsedFile>,
  /// Files the entry was built from, with their modification times at the time.
  pub dependencies: Vec<(PathBuf, SystemTime)>,
  pub source_file: PathBuf,
  pub library_paths: Vec<PathBuf>,
}

impl NodeCacheEntry {
  /// Whether any dependency is strictly newer than the one `other` recorded.
  pub fn is_newer_than(&self, other: &NodeCacheEntry) -> bool {
    self.dependencies.iter().any(|(path, modified)| {
      match other.dependencies.iter().find(|(p, _)| p == path) {
        Some((_, recorded)) => modified > recorded,
        None => true,
      }
    })
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub hits: u64,
  pub misses: u64,
  /// Entries stored, whether new or replacing stale ones.
  pub rebuilds: u64,
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<PathBuf, NodeCacheEntry>,
  stats: CacheStats,
}

/// Parsed imported files, keyed by resolved path. Shared by concurrent queries; an entry is only
/// ever replaced by one built from strictly newer files.
///
/// Entries are built while holding the cache's lock, so concurrent requests for a stale file wait
/// for one rebuild rather than each doing their own.
#[derive(Default)]
pub struct NodeCache {
  state: Mutex<CacheState>,
}

/// Resolves `.` and `..` components without touching the file system.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(component);
        }
      }
      c => out.push(c),
    }
  }
  out
}

/// Where an import refers to: relative to the importing file's directory, then each library path
/// in order.
pub fn resolve_import_path(
  host: &dyn Host,
  importer: Option<&Path>,
  name: &str,
  library_paths: &[PathBuf],
) -> Option<PathBuf> {
  let name_path = Path::new(name);
  if name_path.is_absolute() {
    let path = normalize(name_path);
    return host.exists(&path).then_some(path);
  }
  let local = match importer.and_then(Path::parent) {
    Some(dir) => dir.join(name_path),
    None => name_path.to_path_buf(),
  };
  std::iter::once(local)
    .chain(library_paths.iter().map(|lib| lib.join(name_path)))
    .map(|candidate| normalize(&candidate))
    .find(|candidate| host.exists(candidate))
}

fn is_stale(host: &dyn Host, entry: &NodeCacheEntry) -> bool {
  entry
    .dependencies
    .iter()
    .any(|(path, recorded)| match host.modified(path) {
      Ok(modified) => modified > *recorded,
      Err(_) => true,
    })
}

fn build_entry(
  host: &dyn Host,
  path: &Path,
  library_paths: &[PathBuf],
) -> Result<NodeCacheEntry, CacheError> {
  let _span = debug_span!("build_cache_entry", path = %path.display()).entered();
  // Read the time first so a write racing with the read leaves the entry stale rather than fresh.
  let modified = host.modified(path)?;
  let source = host.read(path)?;
  let ast = parse(Some(&path.to_string_lossy()), &source)?;
  let node = ParsedFile::new(Some(path.to_path_buf()), ast, None)?;
  Ok(NodeCacheEntry {
    node: Arc::new(node),
    dependencies: vec![(path.to_path_buf(), modified)],
    source_file: path.to_path_buf(),
    library_paths: library_paths.to_vec(),
  })
}

impl NodeCache {
  pub fn new() -> NodeCache {
    NodeCache::default()
  }

  pub fn get(&self, path: &Path) -> Option<Arc<ParsedFile>> {
    let mut state = self.state.lock();
    let node = state.entries.get(path).map(|e| e.node.clone());
    match node {
      Some(_) => state.stats.hits += 1,
      None => state.stats.misses += 1,
    };
    node
  }

  pub fn entry(&self, path: &Path) -> Option<NodeCacheEntry> {
    self.state.lock().entries.get(path).cloned()
  }

  /// Store an entry unless one is already cached that no dependency of `entry` is newer than.
  /// Returns whether the entry was stored.
  pub fn set(&self, path: PathBuf, entry: NodeCacheEntry) -> bool {
    let mut state = self.state.lock();
    if let Some(existing) = state.entries.get(&path) {
      if !entry.is_newer_than(existing) {
        trace!(path = %path.display(), "cache entry is current");
        return false;
      }
    }
    state.entries.insert(path, entry);
    state.stats.rebuilds += 1;
    true
  }

  pub fn invalidate(&self, path: &Path) -> bool {
    self.state.lock().entries.remove(path).is_some()
  }

  pub fn clear(&self) {
    self.state.lock().entries.clear();
  }

  pub fn len(&self) -> usize {
    self.state.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn stats(&self) -> CacheStats {
    self.state.lock().stats
  }

  /// The parsed file at `path`, rebuilt first if it isn't cached or any file it was built from has
  /// since changed.
  pub fn load(
    &self,
    host: &dyn Host,
    path: &Path,
    library_paths: &[PathBuf],
  ) -> Result<Arc<ParsedFile>, CacheError> {
    let mut state = self.state.lock();
    if let Some(entry) = state.entries.get(path) {
      if !is_stale(host, entry) {
        let node = entry.node.clone();
        state.stats.hits += 1;
        return Ok(node);
      }
      debug!(path = %path.display(), "cache entry is stale");
    }
    state.stats.misses += 1;
    let entry = build_entry(host, path, library_paths)?;
    let node = entry.node.clone();
    state.entries.insert(path.to_path_buf(), entry);
    state.stats.rebuilds += 1;
    Ok(node)
  }

  /// Resolve and load the file `name` refers to when imported from `importer`.
  pub fn resolve(
    &self,
    host: &dyn Host,
    importer: Option<&Path>,
    name: &str,
    library_paths: &[PathBuf],
  ) -> Result<Arc<ParsedFile>, CacheError> {
    let path = resolve_import_path(host, importer, name, library_paths).ok_or_else(|| {
      CacheError::ImportNotFound {
        name: name.to_string(),
        importer: importer.map(Path::to_path_buf),
      }
    })?;
    self.load(host, &path, library_paths)
  }

  /// Refresh the entry of every file `path` imports, directly or not, returning their paths.
  /// Imports are found by lexing alone; ones that can't be found are skipped.
  pub fn update_from_file(
    &self,
    host: &dyn Host,
    path: &Path,
    library_paths: &[PathBuf],
  ) -> Result<Vec<PathBuf>, CacheError> {
    let _span = debug_span!("update_from_file", path = %path.display()).entered();
    let mut refreshed = Vec::new();
    let mut seen = HashSet::default();
    seen.insert(path.to_path_buf());
    let mut queue = VecDeque::from([path.to_path_buf()]);
    while let Some(file) = queue.pop_front() {
      let source = host.read(&file)?;
      for import in collect_imports(Some(&file.to_string_lossy()), &source)? {
        if import.kind != ImportKind::Code {
          continue;
        }
        let Some(resolved) = resolve_import_path(host, Some(&file), &import.path, library_paths)
        else {
          debug!(import = import.path.as_str(), "import not found");
          continue;
        };
        if seen.insert(resolved.clone()) {
          self.load(host, &resolved, library_paths)?;
          refreshed.push(resolved.clone());
          queue.push_back(resolved);
        }
      }
    }
    Ok(refreshed)
  }
}

/// Resolves imports through a [`NodeCache`].
pub struct CacheImports<'a> {
  pub cache: &'a NodeCache,
  pub host: &'a dyn Host,
  pub library_paths: &'a [PathBuf],
}

impl<'a> ImportResolver for CacheImports<'a> {
  fn resolve_import(
    &self,
    importer: Option<&Path>,
    path: &str,
  ) -> Result<Arc<ParsedFile>, CacheError> {
    self
      .cache
      .resolve(self.host, importer, path, self.library_paths)
  }
}

#[cfg(test)]
mod tests {
  use super::resolve_import_path;
  use super::CacheError;
  use super::NodeCache;
  use crate::host::Host;
  use crate::host::MemoryHost;
  use std::path::Path;
  use std::path::PathBuf;
  use std::sync::Arc;
  use std::time::Duration;
  use std::time::SystemTime;

  #[test]
  fn test_resolve_import_path_order() {
    let host = MemoryHost::new();
    host.write("/lib/a.libsonnet", "1");
    host.write("/src/b.libsonnet", "2");
    host.write("/lib/b.libsonnet", "3");
    let libs = vec![PathBuf::from("/lib")];
    let importer = Path::new("/src/main.jsonnet");
    assert_eq!(
      resolve_import_path(&host, Some(importer), "a.libsonnet", &libs),
      Some(PathBuf::from("/lib/a.libsonnet"))
    );
    assert_eq!(
      resolve_import_path(&host, Some(importer), "b.libsonnet", &libs),
      Some(PathBuf::from("/src/b.libsonnet"))
    );
    assert_eq!(
      resolve_import_path(&host, Some(importer), "/lib/b.libsonnet", &[]),
      Some(PathBuf::from("/lib/b.libsonnet"))
    );
    assert_eq!(resolve_import_path(&host, Some(importer), "c", &libs), None);
  }

  #[test]
  fn test_load_rebuilds_only_when_stale() {
    let host = MemoryHost::new();
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
    host.write_at("/a.libsonnet", "{ x: 1 }", t0);
    let cache = NodeCache::new();
    let path = Path::new("/a.libsonnet");

    let first = cache.load(&host, path, &[]).unwrap();
    let second = cache.load(&host, path, &[]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.stats().rebuilds, 1);

    host.write_at("/a.libsonnet", "{ x: 2 }", t0 + Duration::from_secs(1));
    let third = cache.load(&host, path, &[]).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(cache.stats().rebuilds, 2);
    assert_eq!(cache.stats().hits, 1);
  }

  #[test]
  fn test_load_errors() {
    let host = MemoryHost::new();
    host.write("/bad.libsonnet", "{ x: }");
    let cache = NodeCache::new();
    assert!(matches!(
      cache.load(&host, Path::new("/bad.libsonnet"), &[]),
      Err(CacheError::Syntax(_))
    ));
    assert!(matches!(
      cache.load(&host, Path::new("/missing.libsonnet"), &[]),
      Err(CacheError::Host(_))
    ));
    assert!(matches!(
      cache.resolve(&host, None, "missing.libsonnet", &[]),
      Err(CacheError::ImportNotFound { .. })
    ));
    assert!(cache.is_empty());
  }

  #[test]
  fn test_update_from_file_walks_imports() {
    let host = MemoryHost::new();
    host.write("/main.jsonnet", "local a = import 'a.libsonnet'; a");
    host.write(
      "/a.libsonnet",
      "{ b: import 'lib/b.libsonnet', s: importstr 'data.txt', m: import 'missing' }",
    );
    host.write("/lib/b.libsonnet", "{ c: import '../a.libsonnet' }");
    let cache = NodeCache::new();
    let refreshed = cache
      .update_from_file(&host, Path::new("/main.jsonnet"), &[])
      .unwrap();
    // `../a.libsonnet` from `/lib` is the same file, already seen.
    assert_eq!(refreshed, vec![
      PathBuf::from("/a.libsonnet"),
      PathBuf::from("/lib/b.libsonnet"),
    ]);
    assert!(cache.get(Path::new("/a.libsonnet")).is_some());
    assert!(cache.get(Path::new("/main.jsonnet")).is_none());
    assert!(host.exists(Path::new("/lib/b.libsonnet")));

    assert!(cache.invalidate(Path::new("/a.libsonnet")));
    assert!(cache.get(Path::new("/a.libsonnet")).is_none());
    cache.clear();
    assert!(cache.is_empty());
  }
}
