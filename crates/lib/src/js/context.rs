//! The isolated global scope entries run in.

use std::path::Path;

use boa_engine::error::JsNativeErrorKind;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{Context, JsError, JsObject, JsString, JsValue, Source, js_string};
use tracing::debug;

use super::value::{self, ToJsonError};
use crate::diagnostics;
use crate::resolve::SourceText;

/// Bindings copied onto the global object before any entry runs.
pub type BaseScope = serde_json::Map<String, serde_json::Value>;

/// A value thrown by evaluated code, captured in a thread-safe form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptException {
  /// `name: message` for error objects, the value itself otherwise.
  pub message: String,
  /// The thrown object's `name`, if it had one.
  pub name: Option<String>,
  /// The thrown object's `stack`, if it had one.
  pub stack: Option<String>,
  /// JSON form of the thrown value, when it has one.
  pub value: Option<serde_json::Value>,
}

impl ScriptException {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      name: None,
      stack: None,
      value: None,
    }
  }
}

/// Evaluating an entry threw.
#[derive(Debug, thiserror::Error)]
#[error("evaluation of '{label}' failed: {exception}")]
pub struct EvaluationError {
  /// Label of the failing entry.
  pub label: String,
  /// The source that was being evaluated.
  pub source_text: String,
  /// What was thrown.
  pub exception: ScriptException,
}

impl EvaluationError {
  /// Source excerpt around the failure, or the bare error when no location
  /// can be recovered.
  pub fn diagnostic(&self) -> String {
    diagnostics::format(&self.exception, &self.source_text, &self.label)
  }
}

/// The base scope could not be installed.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
  #[error("cannot bind '{name}' in the evaluation scope: {message}")]
  Binding { name: String, message: String },

  #[error("cannot initialize evaluation context: {message}")]
  Setup { message: String },
}

/// The exported value could not be read out of the engine.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
  #[error("exported {kind} cannot be represented as JSON")]
  NotRepresentable { kind: &'static str },

  #[error("reading exports threw: {0}")]
  Script(ScriptException),

  #[error("engine produced invalid JSON: {0}")]
  Json(#[from] serde_json::Error),
}

/// One build pass worth of global state.
///
/// Holds a fresh engine whose global object carries the base scope plus the
/// `module`/`exports` and `global`/`window` conventions. Evaluations share it,
/// so each entry sees what earlier entries left behind.
pub struct EvalContext {
  context: Context,
  stringify: JsObject,
}

impl EvalContext {
  pub fn new(base_scope: &BaseScope) -> Result<Self, ScopeError> {
    let mut context = Context::default();
    let stringify = value::lookup_stringify(&mut context).map_err(|err| ScopeError::Setup {
      message: err.to_string(),
    })?;

    for (name, binding) in base_scope {
      let binding_error = |err: JsError| ScopeError::Binding {
        name: name.clone(),
        message: err.to_string(),
      };
      let js = value::from_json(binding, &mut context).map_err(binding_error)?;
      context
        .register_global_property(JsString::from(name.as_str()), js, Attribute::all())
        .map_err(binding_error)?;
    }

    let global = context.global_object();
    let exports = JsObject::with_object_proto(context.intrinsics());
    let module = ObjectInitializer::new(&mut context)
      .property(js_string!("exports"), exports.clone(), Attribute::all())
      .build();

    let conventions: [(&str, JsValue); 4] = [
      ("exports", exports.into()),
      ("module", module.into()),
      ("global", global.clone().into()),
      ("window", global.into()),
    ];
    for (name, binding) in conventions {
      context
        .register_global_property(JsString::from(name), binding, Attribute::all())
        .map_err(|err| ScopeError::Setup {
          message: err.to_string(),
        })?;
    }

    debug!(bindings = base_scope.len(), "created evaluation context");
    Ok(Self { context, stringify })
  }

  /// Run `source` against the shared global scope.
  pub fn evaluate(&mut self, source: &SourceText, label: &str) -> Result<(), EvaluationError> {
    let script = Source::from_bytes(source.bytes()).with_path(Path::new(label));
    match self.context.eval(script) {
      Ok(_) => {
        debug!(label, bytes = source.bytes().len(), "evaluated entry");
        Ok(())
      }
      Err(err) => Err(EvaluationError {
        label: label.to_string(),
        source_text: source.as_text().into_owned(),
        exception: self.capture(err),
      }),
    }
  }

  /// Current `module.exports`, as JSON.
  pub fn exports(&mut self) -> Result<serde_json::Value, ExportError> {
    let exports = self.module_exports().map_err(|err| ExportError::Script(self.capture(err)))?;
    self.to_json(&exports)
  }

  /// `module.exports.default` when exports carry a `default` key, otherwise
  /// `module.exports` itself, as JSON.
  pub fn effective_export(&mut self) -> Result<serde_json::Value, ExportError> {
    let exported = self.effective_export_value().map_err(ExportError::Script)?;
    self.to_json(&exported)
  }

  /// The effective export as a raw engine value.
  pub(crate) fn effective_export_value(&mut self) -> Result<JsValue, ScriptException> {
    self.unwrap_default().map_err(|err| self.capture(err))
  }

  fn unwrap_default(&mut self) -> Result<JsValue, JsError> {
    let exports = self.module_exports()?;
    if let Some(object) = exports.as_object() {
      if object.has_own_property(js_string!("default"), &mut self.context)? {
        return object.get(js_string!("default"), &mut self.context);
      }
    }
    Ok(exports)
  }

  /// Call `function` with a single JSON argument.
  pub(crate) fn call(&mut self, function: &JsObject, arg: &serde_json::Value) -> Result<JsValue, ScriptException> {
    let arg = value::from_json(arg, &mut self.context).map_err(|err| self.capture(err))?;
    function
      .call(&JsValue::undefined(), &[arg], &mut self.context)
      .map_err(|err| self.capture(err))
  }

  fn module_exports(&mut self) -> Result<JsValue, JsError> {
    let module = self.context.global_object().get(js_string!("module"), &mut self.context)?;
    match module.as_object() {
      Some(module) => module.get(js_string!("exports"), &mut self.context),
      None => Ok(JsValue::undefined()),
    }
  }

  fn to_json(&mut self, value: &JsValue) -> Result<serde_json::Value, ExportError> {
    value::to_json(value, &self.stringify, &mut self.context).map_err(|err| match err {
      ToJsonError::NotRepresentable { kind } => ExportError::NotRepresentable { kind },
      ToJsonError::Thrown(err) => ExportError::Script(self.capture(err)),
      ToJsonError::Json(err) => ExportError::Json(err),
    })
  }

  fn capture(&mut self, err: JsError) -> ScriptException {
    // Runtime-limit errors have no script-visible value.
    if let Some(native) = err.as_native() {
      if matches!(native.kind, JsNativeErrorKind::RuntimeLimit) {
        return ScriptException {
          message: format!("RuntimeLimit: {}", native.message()),
          name: Some("RuntimeLimit".to_string()),
          stack: None,
          value: None,
        };
      }
    }

    let thrown = err.to_opaque(&mut self.context);

    let (name, message, stack) = match thrown.as_object() {
      Some(object) => (
        read_string(object, "name", &mut self.context),
        read_string(object, "message", &mut self.context),
        read_string(object, "stack", &mut self.context),
      ),
      None => (None, None, None),
    };

    let message = match (name.as_deref(), message, thrown.as_string()) {
      (Some(name), Some(message), _) if message.is_empty() => name.to_string(),
      (Some(name), Some(message), _) => format!("{}: {}", name, message),
      (None, Some(message), _) => message,
      (_, None, Some(text)) => text.to_std_string_escaped(),
      _ => err.to_string(),
    };

    let value = value::to_json(&thrown, &self.stringify, &mut self.context).ok();

    ScriptException {
      message,
      name,
      stack,
      value,
    }
  }
}

fn read_string(object: &JsObject, key: &str, context: &mut Context) -> Option<String> {
  object
    .get(JsString::from(key), context)
    .ok()?
    .as_string()
    .map(JsString::to_std_string_escaped)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn script(code: &str) -> SourceText {
    SourceText::file("test.js", code.as_bytes().to_vec())
  }

  fn run(scope: &BaseScope, entries: &[&str]) -> Result<EvalContext, EvaluationError> {
    let mut ctx = EvalContext::new(scope).unwrap();
    for (i, code) in entries.iter().enumerate() {
      ctx.evaluate(&script(code), &format!("entry{}.js", i))?;
    }
    Ok(ctx)
  }

  #[test]
  fn exports_start_empty() -> Result<(), ExportError> {
    let mut ctx = EvalContext::new(&BaseScope::new()).unwrap();
    assert_eq!(ctx.exports()?, json!({}));
    assert_eq!(ctx.effective_export()?, json!({}));
    Ok(())
  }

  #[test]
  fn module_and_global_conventions_are_exposed() -> Result<(), ExportError> {
    let mut ctx = run(
      &BaseScope::new(),
      &["module.exports = { sameExports: exports === module.exports, windowIsGlobal: window === global };"],
    )
    .unwrap();

    assert_eq!(ctx.exports()?, json!({ "sameExports": true, "windowIsGlobal": true }));
    Ok(())
  }

  #[test]
  fn globals_written_through_window_are_visible_as_globals() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["window.answer = 42;", "module.exports = answer;"]).unwrap();
    assert_eq!(ctx.exports()?, json!(42));
    Ok(())
  }

  #[test]
  fn base_scope_bindings_are_seeded() -> Result<(), ExportError> {
    let mut scope = BaseScope::new();
    scope.insert("SITE".to_string(), json!("docs"));
    scope.insert("config".to_string(), json!({ "debug": true }));

    let mut ctx = run(&scope, &["module.exports = SITE + ':' + config.debug;"]).unwrap();
    assert_eq!(ctx.exports()?, json!("docs:true"));
    Ok(())
  }

  #[test]
  fn host_globals_are_not_reachable() -> Result<(), ExportError> {
    let mut ctx = run(
      &BaseScope::new(),
      &["module.exports = [typeof process, typeof require, typeof setTimeout];"],
    )
    .unwrap();
    assert_eq!(ctx.exports()?, json!(["undefined", "undefined", "undefined"]));
    Ok(())
  }

  #[test]
  fn later_entries_see_state_from_earlier_ones() -> Result<(), ExportError> {
    let mut ctx = run(
      &BaseScope::new(),
      &[
        "module.exports.registry = { greeting: 'hello' };",
        "module.exports = { default: module.exports.registry.greeting + ' world' };",
      ],
    )
    .unwrap();
    assert_eq!(ctx.effective_export()?, json!("hello world"));
    Ok(())
  }

  #[test]
  fn default_export_is_unwrapped() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["module.exports = { default: 'X', other: 'Y' };"]).unwrap();
    assert_eq!(ctx.effective_export()?, json!("X"));
    assert_eq!(ctx.exports()?, json!({ "default": "X", "other": "Y" }));
    Ok(())
  }

  #[test]
  fn exports_without_default_are_used_whole() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["module.exports = { a: 1 };"]).unwrap();
    assert_eq!(ctx.effective_export()?, json!({ "a": 1 }));
    Ok(())
  }

  #[test]
  fn default_assigned_through_exports_alias() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["exports.default = 'via alias';"]).unwrap();
    assert_eq!(ctx.effective_export()?, json!("via alias"));
    Ok(())
  }

  #[test]
  fn default_is_unwrapped_once() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["module.exports = { default: { default: 'inner' } };"]).unwrap();
    assert_eq!(ctx.effective_export()?, json!({ "default": "inner" }));
    Ok(())
  }

  #[test]
  fn undefined_exports_become_null() -> Result<(), ExportError> {
    let mut ctx = run(&BaseScope::new(), &["module.exports = undefined;"]).unwrap();
    assert_eq!(ctx.effective_export()?, json!(null));
    Ok(())
  }

  #[test]
  fn exported_function_is_not_representable() {
    let mut ctx = run(&BaseScope::new(), &["module.exports = function render() {};"]).unwrap();
    assert!(matches!(
      ctx.effective_export(),
      Err(ExportError::NotRepresentable { kind: "function" })
    ));
  }

  #[test]
  fn contexts_do_not_share_state() -> Result<(), ExportError> {
    let pass = "global.counter = (global.counter || 0) + 1; module.exports = counter;";
    let mut first = run(&BaseScope::new(), &[pass]).unwrap();
    let mut second = run(&BaseScope::new(), &[pass]).unwrap();
    assert_eq!(first.exports()?, json!(1));
    assert_eq!(second.exports()?, json!(1));
    Ok(())
  }

  #[test]
  fn thrown_error_keeps_label_source_and_message() {
    let code = "var a = 1;\nthrow new Error('boom');";
    let err = run(&BaseScope::new(), &[code]).err().unwrap();

    assert_eq!(err.label, "entry0.js");
    assert_eq!(err.source_text, code);
    assert_eq!(err.exception.name.as_deref(), Some("Error"));
    assert_eq!(err.exception.message, "Error: boom");
    assert!(err.to_string().contains("entry0.js"));
  }

  #[test]
  fn thrown_string_is_captured_verbatim() {
    let err = run(&BaseScope::new(), &["throw 'plain failure';"]).err().unwrap();
    assert_eq!(err.exception.message, "plain failure");
    assert_eq!(err.exception.value, Some(json!("plain failure")));
  }

  #[test]
  fn thrown_object_keeps_stack_and_value() {
    let err = run(
      &BaseScope::new(),
      &["throw { name: 'RenderError', message: 'bad', stack: 'RenderError: bad\\n    at page.js:3:9', code: 7 };"],
    )
    .err()
    .unwrap();

    assert_eq!(err.exception.message, "RenderError: bad");
    assert_eq!(err.exception.stack.as_deref(), Some("RenderError: bad\n    at page.js:3:9"));
    assert_eq!(err.exception.value.as_ref().unwrap()["code"], json!(7));
  }

  #[test]
  fn syntax_error_is_an_evaluation_error() {
    let err = run(&BaseScope::new(), &["module.exports = {;"]).err().unwrap();
    assert_eq!(err.label, "entry0.js");
    assert!(!err.exception.message.is_empty());
  }

  #[test]
  fn syntax_error_diagnostic_points_at_source() {
    let err = run(&BaseScope::new(), &["var a = 1;\nvar = 2;"]).err().unwrap();
    let diagnostic = err.diagnostic();

    assert!(diagnostic.starts_with("entry0.js:2\n"), "{diagnostic}");
    assert!(diagnostic.contains("1 | var a = 1;\n"), "{diagnostic}");
    assert!(diagnostic.contains("2 | var = 2;\n  |     ^\n"), "{diagnostic}");
  }

  #[test]
  fn runtime_error_diagnostic_is_the_message() {
    let err = run(&BaseScope::new(), &["var page = null;\npage.render();"]).err().unwrap();
    assert_eq!(err.exception.stack, None);
    assert_eq!(err.diagnostic(), err.exception.message);
  }

  #[test]
  fn runaway_recursion_is_an_evaluation_error() {
    let err = run(&BaseScope::new(), &["function recurse() { return recurse(); }\nrecurse();"]).err().unwrap();

    assert_eq!(err.label, "entry0.js");
    assert_eq!(err.exception.name.as_deref(), Some("RuntimeLimit"));
    assert!(err.exception.message.starts_with("RuntimeLimit: "));
  }

  #[test]
  fn failure_stops_nothing_already_evaluated() -> Result<(), ExportError> {
    let mut ctx = EvalContext::new(&BaseScope::new()).unwrap();
    ctx.evaluate(&script("module.exports = 'kept';"), "ok.js").unwrap();
    assert!(ctx.evaluate(&script("null.x;"), "bad.js").is_err());
    assert_eq!(ctx.exports()?, json!("kept"));
    Ok(())
  }
}
