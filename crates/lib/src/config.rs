//! `entryeval.toml` loading.
//!
//! Every field is optional so a config file can cover part of a run and leave
//! the rest to command-line flags. Relative paths are taken relative to the
//! directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::js::BaseScope;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "entryeval.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("cannot read config '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config '{}': {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  /// Entries evaluated in order. Paths or build artifact names.
  #[serde(default)]
  pub entries: Vec<String>,

  /// Name of the emitted artifact within the build output.
  pub destination: Option<String>,

  /// JavaScript template module.
  pub template: Option<PathBuf>,

  /// Build output directory.
  pub output_dir: Option<PathBuf>,

  /// Stats file, defaulting to `stats.json` inside `output_dir`.
  pub stats: Option<PathBuf>,

  /// Overrides the stats file's `publicPath`.
  pub public_path: Option<String>,

  /// Bindings placed on the global object before any entry runs.
  #[serde(default)]
  pub scope: BaseScope,
}

impl Config {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    let dir = dunce::canonicalize(dir).map_err(|source| ConfigError::Read {
      path: dir.to_path_buf(),
      source,
    })?;
    config.resolve_relative_to(&dir);

    debug!(path = %path.display(), entries = config.entries.len(), "loaded config");
    Ok(config)
  }

  /// Anchor relative paths at `dir`.
  ///
  /// Entries are only rewritten when the anchored path exists; anything else
  /// is left alone so it can still name a build artifact.
  pub fn resolve_relative_to(&mut self, dir: &Path) {
    for field in [&mut self.template, &mut self.output_dir, &mut self.stats] {
      if let Some(path) = field.as_mut() {
        if path.is_relative() {
          *path = dir.join(&*path);
        }
      }
    }

    for entry in &mut self.entries {
      let candidate = Path::new(entry.as_str());
      if candidate.is_relative() {
        let anchored = dir.join(candidate);
        if anchored.exists() {
          *entry = anchored.to_string_lossy().into_owned();
        }
      }
    }
  }
}
