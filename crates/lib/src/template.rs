//! Templates turn the exported value and the asset map into artifact content.
//!
//! A template is opaque to the assembler: it receives
//! `{ content, assets }` and returns a string, and whatever error it reports
//! is passed through untouched. Rust callers wrap a closure with [`from_fn`];
//! templates written in JavaScript load through [`JsTemplate`].

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use boa_engine::JsValue;
use serde::Serialize;
use tracing::debug;

use crate::assets::AssetMap;
use crate::js::{BaseScope, EvalContext, EvaluationError, ScopeError, ScriptException};
use crate::resolve::SourceText;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// What a template is called with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateInput {
  /// The effective exported value of the evaluated entries.
  pub content: serde_json::Value,
  /// Chunk name to public path.
  pub assets: AssetMap,
}

/// A template failed. Wraps the template's own error unchanged.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TemplateError {
  #[source]
  source: BoxError,
}

impl TemplateError {
  pub fn new(err: impl Into<BoxError>) -> Self {
    Self { source: err.into() }
  }

  /// The error the template reported.
  pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
    self.source.as_ref()
  }

  pub fn into_inner(self) -> BoxError {
    self.source
  }
}

/// Renders the output artifact's content.
pub trait Template {
  fn render(&self, input: &TemplateInput) -> Result<String, TemplateError>;
}

/// A template backed by a closure. See [`from_fn`].
pub struct FnTemplate<F>(F);

impl<F> fmt::Debug for FnTemplate<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("FnTemplate")
  }
}

/// Use a closure as a template.
///
/// ```ignore
/// let template = from_fn(|input| Ok(format!("<html>{}</html>", input.content.as_str().unwrap_or_default())));
/// ```
pub fn from_fn<F>(f: F) -> FnTemplate<F>
where
  F: Fn(&TemplateInput) -> Result<String, BoxError>,
{
  FnTemplate(f)
}

impl<F> Template for FnTemplate<F>
where
  F: Fn(&TemplateInput) -> Result<String, BoxError>,
{
  fn render(&self, input: &TemplateInput) -> Result<String, TemplateError> {
    (self.0)(input).map_err(TemplateError::new)
  }
}

/// Errors raised by [`JsTemplate`].
#[derive(Debug, thiserror::Error)]
pub enum JsTemplateError {
  #[error("cannot read template '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Scope(#[from] ScopeError),

  #[error(transparent)]
  Evaluate(#[from] EvaluationError),

  #[error("template '{label}' must export a function")]
  NotAFunction { label: String },

  #[error("template '{label}' returned {kind} instead of a string")]
  NotAString { label: String, kind: &'static str },

  #[error("cannot pass template input: {0}")]
  Input(#[from] serde_json::Error),
}

/// A template written in JavaScript.
///
/// The script must export a function (directly or as `default`) taking
/// `{ content, assets }` and returning a string. Each render runs in a fresh
/// evaluation context of its own.
#[derive(Debug, Clone)]
pub struct JsTemplate {
  label: String,
  source: SourceText,
}

impl JsTemplate {
  pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
    let label = label.into();
    let source = SourceText::file(label.as_str(), code.into().into_bytes());
    Self { label, source }
  }

  pub fn from_file(path: &Path) -> Result<Self, JsTemplateError> {
    let bytes = std::fs::read(path).map_err(|source| JsTemplateError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self {
      label: path.display().to_string(),
      source: SourceText::file(path, bytes),
    })
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  fn render_js(&self, input: &TemplateInput) -> Result<String, JsTemplateError> {
    let mut context = EvalContext::new(&BaseScope::new())?;
    context.evaluate(&self.source, &self.label)?;

    let exported = context
      .effective_export_value()
      .map_err(|exception| self.script_error(exception))?;
    let function = exported
      .as_callable()
      .cloned()
      .ok_or_else(|| JsTemplateError::NotAFunction {
        label: self.label.clone(),
      })?;

    let arg = serde_json::to_value(input)?;
    let rendered = context
      .call(&function, &arg)
      .map_err(|exception| self.script_error(exception))?;

    debug!(template = %self.label, "rendered template");
    match rendered.as_string() {
      Some(text) => Ok(text.to_std_string_lossy()),
      None => Err(JsTemplateError::NotAString {
        label: self.label.clone(),
        kind: kind_of(&rendered),
      }),
    }
  }

  fn script_error(&self, exception: ScriptException) -> JsTemplateError {
    JsTemplateError::Evaluate(EvaluationError {
      label: self.label.clone(),
      source_text: self.source.as_text().into_owned(),
      exception,
    })
  }
}

impl Template for JsTemplate {
  fn render(&self, input: &TemplateInput) -> Result<String, TemplateError> {
    self.render_js(input).map_err(TemplateError::new)
  }
}

fn kind_of(value: &JsValue) -> &'static str {
  if value.is_undefined() {
    "undefined"
  } else if value.is_null() {
    "null"
  } else if value.is_boolean() {
    "a boolean"
  } else if value.is_number() {
    "a number"
  } else {
    "an object"
  }
}
