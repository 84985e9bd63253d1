//! Entry resolution.
//!
//! An entry names either a file on disk or an artifact of the build in
//! progress. Files are returned verbatim. Artifacts are bundle output whose
//! value is captured by wrapping it as `module.exports = <bundle>;`.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::compilation::{Asset, Compilation};

/// Errors that can occur while resolving an entry.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  /// The entry is neither a path on disk nor a known artifact or chunk.
  #[error("output file not found: \"{entry}\"")]
  NotFound { entry: String },

  #[error("cannot read '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Filesystem access needed to resolve entries.
pub trait SourceFs {
  fn exists(&self, path: &Path) -> bool;
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`SourceFs`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SourceFs for OsFs {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    std::fs::read(path)
  }
}

/// Where a piece of source text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
  File(PathBuf),
  Artifact { name: String },
}

/// Source bytes ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
  bytes: Vec<u8>,
  origin: SourceOrigin,
}

impl SourceText {
  pub fn file(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
    Self {
      bytes,
      origin: SourceOrigin::File(path.into()),
    }
  }

  /// Wrap raw bundle output so its value is assigned to `module.exports`.
  pub fn artifact(name: impl Into<String>, raw: &[u8]) -> Self {
    let mut bytes = Vec::with_capacity(raw.len() + 20);
    bytes.extend_from_slice(b"module.exports = ");
    bytes.extend_from_slice(raw);
    bytes.push(b';');
    Self {
      bytes,
      origin: SourceOrigin::Artifact { name: name.into() },
    }
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn origin(&self) -> &SourceOrigin {
    &self.origin
  }

  pub fn as_text(&self) -> Cow<'_, str> {
    String::from_utf8_lossy(&self.bytes)
  }
}

/// Resolves entries against the filesystem and a compilation.
pub struct Resolver<'a> {
  fs: &'a dyn SourceFs,
  compilation: &'a Compilation,
}

impl<'a> Resolver<'a> {
  pub fn new(fs: &'a dyn SourceFs, compilation: &'a Compilation) -> Self {
    Self { fs, compilation }
  }

  pub fn resolve(&self, entry: &str) -> Result<SourceText, ResolveError> {
    let path = Path::new(entry);
    if self.fs.exists(path) {
      let bytes = self.fs.read(path).map_err(|source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
      })?;
      debug!(entry, bytes = bytes.len(), "resolved entry from filesystem");
      return Ok(SourceText::file(path, bytes));
    }

    let (name, asset) = self.find_asset(entry).ok_or_else(|| ResolveError::NotFound {
      entry: entry.to_string(),
    })?;
    debug!(entry, asset = name, bytes = asset.size(), "resolved entry from build output");
    Ok(SourceText::artifact(name, asset.source()))
  }

  /// Look up a registered artifact by name, then fall back to the chunk table.
  fn find_asset(&self, entry: &str) -> Option<(&'a str, &'a Arc<dyn Asset>)> {
    if let Some(found) = self.compilation.asset_entry(entry) {
      return Some(found);
    }

    let chunk = self.compilation.stats().assets_by_chunk_name.get(entry)?;
    self.compilation.asset_entry(chunk.primary()?)
  }
}
