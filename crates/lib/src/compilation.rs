//! The host build a pass runs against.
//!
//! A `Compilation` holds the artifacts the build has produced so far, keyed by
//! name, plus the stats snapshot describing which chunk produced which files.
//! Hosts either assemble one in memory or load a finished output directory
//! together with its webpack-style `stats.json`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Stats file looked up inside the output directory when none is given.
pub const DEFAULT_STATS_FILE: &str = "stats.json";

/// A build artifact: a byte payload plus its length.
pub trait Asset: fmt::Debug + Send + Sync {
  fn source(&self) -> &[u8];

  fn size(&self) -> usize {
    self.source().len()
  }
}

/// An artifact whose bytes are held as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset(Vec<u8>);

impl Asset for RawAsset {
  fn source(&self) -> &[u8] {
    &self.0
  }
}

impl From<Vec<u8>> for RawAsset {
  fn from(bytes: Vec<u8>) -> Self {
    Self(bytes)
  }
}

impl From<String> for RawAsset {
  fn from(text: String) -> Self {
    Self(text.into_bytes())
  }
}

impl From<&str> for RawAsset {
  fn from(text: &str) -> Self {
    Self(text.as_bytes().to_vec())
  }
}

/// The files a chunk was emitted as.
///
/// Webpack reports a bare string for single-file chunks and an array when a
/// chunk has several outputs (bundle plus source map, for example).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkOutputs {
  Single(String),
  Multiple(Vec<String>),
}

impl ChunkOutputs {
  /// The chunk's main output file.
  ///
  /// For multi-file chunks this is the first element. Build tools have so far
  /// listed the bundle before its source map, but that ordering is an
  /// assumption rather than a documented guarantee.
  pub fn primary(&self) -> Option<&str> {
    match self {
      ChunkOutputs::Single(path) => Some(path.as_str()),
      ChunkOutputs::Multiple(paths) => paths.first().map(String::as_str),
    }
  }
}

impl From<&str> for ChunkOutputs {
  fn from(path: &str) -> Self {
    ChunkOutputs::Single(path.to_string())
  }
}

impl From<Vec<&str>> for ChunkOutputs {
  fn from(paths: Vec<&str>) -> Self {
    ChunkOutputs::Multiple(paths.into_iter().map(str::to_string).collect())
  }
}

/// The subset of build stats a pass consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
  #[serde(default)]
  pub assets_by_chunk_name: BTreeMap<String, ChunkOutputs>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub public_path: Option<String>,
}

impl BuildStats {
  /// Read a stats file. Keys other than `assetsByChunkName` and `publicPath`
  /// are ignored.
  pub fn load(path: &Path) -> Result<Self, CompilationError> {
    let content = fs::read_to_string(path).map_err(|source| CompilationError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| CompilationError::Stats {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Errors that can occur while loading a build from disk.
#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
  #[error("cannot walk build output directory '{}': {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("cannot read '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid stats file '{}': {source}", path.display())]
  Stats {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// In-progress build state: named artifacts plus a stats snapshot.
#[derive(Debug, Default)]
pub struct Compilation {
  assets: BTreeMap<String, Arc<dyn Asset>>,
  stats: BuildStats,
}

impl Compilation {
  pub fn new(stats: BuildStats) -> Self {
    Self {
      assets: BTreeMap::new(),
      stats,
    }
  }

  /// Load every file under `dir` as an artifact named by its `/`-separated
  /// relative path, and read chunk stats from `stats` (or
  /// `<dir>/stats.json` when present).
  pub fn from_output_dir(dir: &Path, stats: Option<&Path>) -> Result<Self, CompilationError> {
    let stats_path = stats.map(Path::to_path_buf).unwrap_or_else(|| dir.join(DEFAULT_STATS_FILE));
    let build_stats = if stats.is_some() || stats_path.exists() {
      BuildStats::load(&stats_path)?
    } else {
      debug!(dir = %dir.display(), "no stats file, chunk table is empty");
      BuildStats::default()
    };

    let mut compilation = Compilation::new(build_stats);

    for entry in WalkDir::new(dir).sort_by_file_name() {
      let entry = entry.map_err(|source| CompilationError::Walk {
        path: dir.to_path_buf(),
        source,
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
      let name = asset_name(relative);
      let bytes = fs::read(entry.path()).map_err(|source| CompilationError::Io {
        path: entry.path().to_path_buf(),
        source,
      })?;

      debug!(asset = %name, bytes = bytes.len(), "loaded build output");
      compilation.insert_asset(name, RawAsset::from(bytes));
    }

    info!(
      dir = %dir.display(),
      assets = compilation.assets.len(),
      chunks = compilation.stats.assets_by_chunk_name.len(),
      "loaded build output"
    );
    Ok(compilation)
  }

  /// Register an artifact, replacing any previous one with the same name.
  pub fn insert_asset(&mut self, name: impl Into<String>, asset: impl Asset + 'static) {
    self.assets.insert(name.into(), Arc::new(asset));
  }

  pub fn asset(&self, name: &str) -> Option<&Arc<dyn Asset>> {
    self.assets.get(name)
  }

  /// Like [`Compilation::asset`], also returning the stored name.
  pub fn asset_entry(&self, name: &str) -> Option<(&str, &Arc<dyn Asset>)> {
    self.assets.get_key_value(name).map(|(k, v)| (k.as_str(), v))
  }

  pub fn assets(&self) -> impl Iterator<Item = (&str, &Arc<dyn Asset>)> {
    self.assets.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn stats(&self) -> &BuildStats {
    &self.stats
  }

  /// The configured public path prefix, if any.
  pub fn public_path(&self) -> Option<&str> {
    self.stats.public_path.as_deref()
  }

  /// Override the public path reported by the stats.
  pub fn set_public_path(&mut self, public_path: Option<String>) {
    self.stats.public_path = public_path;
  }
}

fn asset_name(relative: &Path) -> String {
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
