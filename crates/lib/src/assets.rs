//! Public paths of build outputs.
//!
//! Templates reference other build outputs (scripts, stylesheets) by the URL
//! they will be served from. This module maps each chunk to that URL.

use std::collections::BTreeMap;

use tracing::warn;

use crate::compilation::{ChunkOutputs, Compilation};

/// Chunk name to public path.
pub type AssetMap = BTreeMap<String, String>;

/// Map every chunk to its primary output, prefixed with `public_path` when one
/// is configured.
///
/// Chunks that report no outputs at all are skipped.
pub fn map_assets(chunks: &BTreeMap<String, ChunkOutputs>, public_path: Option<&str>) -> AssetMap {
  let prefix = public_path.unwrap_or_default();

  chunks
    .iter()
    .filter_map(|(chunk, outputs)| match outputs.primary() {
      Some(path) => Some((chunk.clone(), format!("{}{}", prefix, path))),
      None => {
        warn!(chunk = %chunk, "chunk has no outputs, leaving it out of the asset map");
        None
      }
    })
    .collect()
}

/// [`map_assets`] over a compilation's stats snapshot.
pub fn compilation_assets(compilation: &Compilation) -> AssetMap {
  map_assets(&compilation.stats().assets_by_chunk_name, compilation.public_path())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compilation::BuildStats;

  fn chunks() -> BTreeMap<String, ChunkOutputs> {
    let mut chunks = BTreeMap::new();
    chunks.insert("main".to_string(), ChunkOutputs::from(vec!["main.js", "main.js.map"]));
    chunks.insert("vendor".to_string(), ChunkOutputs::from("vendor.js"));
    chunks
  }

  #[test]
  fn bare_paths_without_public_path() {
    let map = map_assets(&chunks(), None);
    assert_eq!(map["main"], "main.js");
    assert_eq!(map["vendor"], "vendor.js");
  }

  #[test]
  fn empty_public_path_passes_paths_through() {
    let map = map_assets(&chunks(), Some(""));
    assert_eq!(map["main"], "main.js");
  }

  #[test]
  fn public_path_is_prepended() {
    let map = map_assets(&chunks(), Some("/static/"));
    assert_eq!(map["main"], "/static/main.js");
    assert_eq!(map["vendor"], "/static/vendor.js");
  }

  #[test]
  fn multi_output_chunk_never_maps_to_later_outputs() {
    let map = map_assets(&chunks(), Some("https://cdn.example.com/"));
    assert_eq!(map["main"], "https://cdn.example.com/main.js");
    assert!(map.values().all(|path| !path.ends_with(".map")));
  }

  #[test]
  fn chunk_without_outputs_is_skipped() {
    let mut chunks = chunks();
    chunks.insert("empty".to_string(), ChunkOutputs::Multiple(vec![]));
    let map = map_assets(&chunks, None);
    assert_eq!(map.len(), 2);
    assert!(!map.contains_key("empty"));
  }

  #[test]
  fn compilation_assets_uses_stats_public_path() {
    let compilation = Compilation::new(BuildStats {
      assets_by_chunk_name: chunks(),
      public_path: Some("/assets/".to_string()),
    });
    let map = compilation_assets(&compilation);
    assert_eq!(map["vendor"], "/assets/vendor.js");
  }
}
