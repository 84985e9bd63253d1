//! Hooking a build pass into a host's emit phase.
//!
//! Hosts call [`EmitPlugin::emit`] once per build, while the compilation is
//! still open for new artifacts. The plugin adds what it produced and reports
//! the outcome through `done`, which it calls exactly once.

use tracing::debug;

use crate::assemble::{AssemblyError, EntryEvaluator};
use crate::compilation::Compilation;

pub trait EmitPlugin {
  fn name(&self) -> &str;

  fn emit<F>(&self, compilation: &mut Compilation, done: F)
  where
    F: FnOnce(Result<(), AssemblyError>);
}

impl EmitPlugin for EntryEvaluator {
  fn name(&self) -> &str {
    "entry-evaluator"
  }

  fn emit<F>(&self, compilation: &mut Compilation, done: F)
  where
    F: FnOnce(Result<(), AssemblyError>),
  {
    match self.run_build_pass(compilation) {
      Ok(artifact) => {
        debug!(plugin = self.name(), asset = %artifact.path(), "emitting artifact");
        compilation.insert_asset(artifact.path().to_string(), artifact);
        done(Ok(()));
      }
      Err(err) => done(Err(err)),
    }
  }
}

/// Drive `plugin` through one emit phase and return what it reported.
///
/// A plugin that returns without signalling fails with
/// [`AssemblyError::NotSignalled`].
pub fn run_emit<P: EmitPlugin>(plugin: &P, compilation: &mut Compilation) -> Result<(), AssemblyError> {
  let mut outcome = None;
  plugin.emit(compilation, |result| outcome = Some(result));
  outcome.unwrap_or_else(|| {
    Err(AssemblyError::NotSignalled {
      plugin: plugin.name().to_string(),
    })
  })
}
