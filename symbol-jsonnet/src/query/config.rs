use std::path::PathBuf;
use std::str::FromStr;

/// When the files `import` expressions refer to are loaded.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ImportResolution {
  /// While indexing the queried file. An import that can't be loaded fails the query.
  #[default]
  Eager,
  /// Only when a query needs to look inside one. Imports that can't be loaded are opaque.
  Lazy,
  /// Never; imports are always opaque.
  Off,
}

impl FromStr for ImportResolution {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "eager" => Ok(ImportResolution::Eager),
      "lazy" => Ok(ImportResolution::Lazy),
      "off" => Ok(ImportResolution::Off),
      _ => Err(()),
    }
  }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
  /// Directories searched, in order, for imports not found next to the importing file.
  pub library_paths: Vec<PathBuf>,
  pub import_resolution: ImportResolution,
  /// How many variables, fields and imports a value is followed through before giving up.
  pub max_resolution_depth: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      library_paths: Vec::new(),
      import_resolution: ImportResolution::default(),
      max_resolution_depth: 32,
    }
  }
}

impl EngineConfig {
  pub fn with_library_paths(mut self, library_paths: Vec<PathBuf>) -> Self {
    self.library_paths = library_paths;
    self
  }

  pub fn with_import_resolution(mut self, import_resolution: ImportResolution) -> Self {
    self.import_resolution = import_resolution;
    self
  }

  pub fn with_max_resolution_depth(mut self, max_resolution_depth: usize) -> Self {
    self.max_resolution_depth = max_resolution_depth;
    self
  }
}
