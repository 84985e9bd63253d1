//! entryeval-lib: evaluate bundle entries and render their export into a new
//! build artifact.
//!
//! A build pass runs in a few steps:
//! - `resolve`: entry name to source text, from disk or the build in progress
//! - `js`: one isolated global scope per pass, shared by every entry
//! - `assets`: chunk names mapped to their public paths
//! - `template`: the exported value plus the asset map rendered to a string
//! - `assemble`: the pass itself, producing an [`assemble::OutputArtifact`]
//!
//! `compilation` models the host build and `plugin` hooks a pass into its emit
//! phase.

pub mod assemble;
pub mod assets;
pub mod compilation;
pub mod config;
pub mod diagnostics;
pub mod js;
pub mod plugin;
pub mod resolve;
pub mod template;

#[cfg(test)]
mod util;
