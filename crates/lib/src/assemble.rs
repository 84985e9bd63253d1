//! Build passes: evaluate entries, render the template, produce the artifact.
//!
//! A pass creates one [`EvalContext`], runs every entry against it in order,
//! reads the effective export once the last entry has run, and hands it to the
//! template together with the public-path map of the build. The first failure
//! ends the pass; nothing is emitted for a failed pass.

use std::fmt;

use tracing::{error, info};

use crate::assets::compilation_assets;
use crate::compilation::{Asset, Compilation};
use crate::js::{BaseScope, EvalContext, EvaluationError, ExportError, ScopeError};
use crate::resolve::{OsFs, ResolveError, Resolver, SourceFs};
use crate::template::{Template, TemplateError, TemplateInput};

/// The artifact a build pass produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
  path: String,
  content: String,
}

impl OutputArtifact {
  pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      content: content.into(),
    }
  }

  /// Destination path within the build output.
  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn content(&self) -> &str {
    &self.content
  }
}

impl Asset for OutputArtifact {
  fn source(&self) -> &[u8] {
    self.content.as_bytes()
  }
}

/// The first failure of a build pass.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Evaluate(#[from] EvaluationError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Scope(#[from] ScopeError),

  #[error("cannot read the exported value for '{destination}': {source}")]
  Export {
    destination: String,
    #[source]
    source: ExportError,
  },

  #[error("plugin '{plugin}' finished without reporting an outcome")]
  NotSignalled { plugin: String },
}

impl AssemblyError {
  /// Source excerpt for evaluation failures.
  pub fn diagnostic(&self) -> Option<String> {
    match self {
      AssemblyError::Evaluate(err) => Some(err.diagnostic()),
      _ => None,
    }
  }
}

/// Run one build pass.
///
/// Entries are resolved through `fs` and `compilation`, evaluated in order in
/// a single fresh context seeded with `base_scope`, and the effective export is
/// rendered by `template` into an artifact at `destination`.
pub fn assemble(
  entries: &[String],
  destination: &str,
  base_scope: &BaseScope,
  template: &dyn Template,
  compilation: &Compilation,
  fs: &dyn SourceFs,
) -> Result<OutputArtifact, AssemblyError> {
  let resolver = Resolver::new(fs, compilation);
  let mut context = EvalContext::new(base_scope)?;

  for entry in entries {
    let source = resolver.resolve(entry)?;
    if let Err(err) = context.evaluate(&source, entry) {
      error!(entry = %entry, "{}", err.diagnostic());
      return Err(err.into());
    }
  }

  let content = context
    .effective_export()
    .map_err(|source| AssemblyError::Export {
      destination: destination.to_string(),
      source,
    })?;

  let input = TemplateInput {
    content,
    assets: compilation_assets(compilation),
  };
  let rendered = template.render(&input)?;

  Ok(OutputArtifact::new(destination, rendered))
}

/// Everything a build pass needs besides the build itself.
///
/// Holds no engine state: every [`EntryEvaluator::run_build_pass`] starts from
/// a fresh context, so one evaluator can serve any number of passes.
pub struct EntryEvaluator {
  entries: Vec<String>,
  destination: String,
  scope: BaseScope,
  template: Box<dyn Template + Send + Sync>,
}

impl EntryEvaluator {
  pub fn new<I, S>(entries: I, destination: impl Into<String>, template: impl Template + Send + Sync + 'static) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      entries: entries.into_iter().map(Into::into).collect(),
      destination: destination.into(),
      scope: BaseScope::new(),
      template: Box::new(template),
    }
  }

  /// Bindings placed on the global object before the first entry runs.
  pub fn with_scope(mut self, scope: BaseScope) -> Self {
    self.scope = scope;
    self
  }

  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  pub fn destination(&self) -> &str {
    &self.destination
  }

  pub fn scope(&self) -> &BaseScope {
    &self.scope
  }

  /// Run a pass against `compilation`, reading file entries from disk.
  pub fn run_build_pass(&self, compilation: &Compilation) -> Result<OutputArtifact, AssemblyError> {
    self.run_build_pass_with(&OsFs, compilation)
  }

  pub fn run_build_pass_with(
    &self,
    fs: &dyn SourceFs,
    compilation: &Compilation,
  ) -> Result<OutputArtifact, AssemblyError> {
    info!(
      entries = self.entries.len(),
      destination = %self.destination,
      "starting build pass"
    );

    let artifact = assemble(
      &self.entries,
      &self.destination,
      &self.scope,
      self.template.as_ref(),
      compilation,
      fs,
    )?;

    info!(destination = %artifact.path(), bytes = artifact.size(), "build pass finished");
    Ok(artifact)
  }
}

impl fmt::Debug for EntryEvaluator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EntryEvaluator")
      .field("entries", &self.entries)
      .field("destination", &self.destination)
      .field("scope", &self.scope)
      .finish_non_exhaustive()
  }
}
