use ahash::HashMap;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
  NotFound { path: PathBuf },
  Io { path: PathBuf, message: String },
}

impl fmt::Display for HostError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HostError::NotFound { path } => write!(f, "file {} not found", path.display()),
      HostError::Io { path, message } => write!(f, "failed to read {}: {message}", path.display()),
    }
  }
}

impl Error for HostError {}

/// Access to the files imports refer to.
pub trait Host: Send + Sync + 'static {
  /// Return the full text of a file.
  fn read(&self, path: &Path) -> Result<Arc<str>, HostError>;
  /// Last modification time, used to decide whether a cached parse is stale.
  fn modified(&self, path: &Path) -> Result<SystemTime, HostError>;

  fn exists(&self, path: &Path) -> bool {
    self.modified(path).is_ok()
  }
}

fn io_error(path: &Path, err: std::io::Error) -> HostError {
  if err.kind() == std::io::ErrorKind::NotFound {
    HostError::NotFound {
      path: path.to_path_buf(),
    }
  } else {
    HostError::Io {
      path: path.to_path_buf(),
      message: err.to_string(),
    }
  }
}

/// Reads files from the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsHost;

impl Host for OsHost {
  fn read(&self, path: &Path) -> Result<Arc<str>, HostError> {
    fs::read_to_string(path)
      .map(Arc::from)
      .map_err(|err| io_error(path, err))
  }

  fn modified(&self, path: &Path) -> Result<SystemTime, HostError> {
    fs::metadata(path)
      .and_then(|m| m.modified())
      .map_err(|err| io_error(path, err))
  }

  fn exists(&self, path: &Path) -> bool {
    path.is_file()
  }
}

/// Files held in memory, such as unsaved editor buffers. Every write advances the file's
/// modification time.
#[derive(Default)]
pub struct MemoryHost {
  files: Mutex<HashMap<PathBuf, (Arc<str>, SystemTime)>>,
}

impl MemoryHost {
  pub fn new() -> MemoryHost {
    MemoryHost::default()
  }

  pub fn write(&self, path: impl Into<PathBuf>, text: &str) {
    let mut files = self.files.lock();
    let path = path.into();
    let now = SystemTime::now();
    // Writes within the clock's resolution must still look newer.
    let modified = match files.get(&path) {
      Some((_, prev)) if *prev >= now => *prev + std::time::Duration::from_nanos(1),
      _ => now,
    };
    files.insert(path, (Arc::from(text), modified));
  }

  /// Store a file with an explicit modification time.
  pub fn write_at(&self, path: impl Into<PathBuf>, text: &str, modified: SystemTime) {
    self
      .files
      .lock()
      .insert(path.into(), (Arc::from(text), modified));
  }

  pub fn remove(&self, path: &Path) {
    self.files.lock().remove(path);
  }
}

impl Host for MemoryHost {
  fn read(&self, path: &Path) -> Result<Arc<str>, HostError> {
    self
      .files
      .lock()
      .get(path)
      .map(|(text, _)| text.clone())
      .ok_or_else(|| HostError::NotFound {
        path: path.to_path_buf(),
      })
  }

  fn modified(&self, path: &Path) -> Result<SystemTime, HostError> {
    self
      .files
      .lock()
      .get(path)
      .map(|(_, modified)| *modified)
      .ok_or_else(|| HostError::NotFound {
        path: path.to_path_buf(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::Host;
  use super::HostError;
  use super::MemoryHost;
  use std::path::Path;

  #[test]
  fn test_memory_host_writes_advance_time() {
    let host = MemoryHost::new();
    host.write("/a.jsonnet", "1");
    let first = host.modified(Path::new("/a.jsonnet")).unwrap();
    host.write("/a.jsonnet", "2");
    let second = host.modified(Path::new("/a.jsonnet")).unwrap();
    assert!(second > first);
    assert_eq!(&*host.read(Path::new("/a.jsonnet")).unwrap(), "2");
    assert!(matches!(
      host.read(Path::new("/b.jsonnet")),
      Err(HostError::NotFound { .. })
    ));
    assert!(!host.exists(Path::new("/b.jsonnet")));
  }
}
