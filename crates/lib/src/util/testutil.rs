//! Test utilities for entryeval-lib.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::resolve::SourceFs;

/// An in-memory [`SourceFs`] so resolver tests do not depend on the working
/// directory.
#[derive(Debug, Default)]
pub struct MemoryFs {
  files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryFs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_file(mut self, path: &str, content: &str) -> Self {
    self.files.insert(PathBuf::from(path), content.as_bytes().to_vec());
    self
  }
}

impl SourceFs for MemoryFs {
  fn exists(&self, path: &Path) -> bool {
    self.files.contains_key(path)
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self
      .files
      .get(path)
      .cloned()
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
  }
}
