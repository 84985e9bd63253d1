//! Moving values between JSON and the engine.
//!
//! JSON is the shape values take outside the engine: base-scope bindings come
//! in as JSON and exported values leave as JSON. Conversion out goes through
//! the engine's own `JSON.stringify`, so `toJSON` hooks and the usual
//! dropping of function-valued properties apply.

use boa_engine::{Context, JsError, JsNativeError, JsObject, JsResult, JsValue, js_string};

/// Why a value could not leave the engine.
#[derive(Debug)]
pub(crate) enum ToJsonError {
  NotRepresentable { kind: &'static str },
  Thrown(JsError),
  Json(serde_json::Error),
}

/// Capture the realm's `JSON.stringify` before any user code can shadow it.
pub(crate) fn lookup_stringify(context: &mut Context) -> JsResult<JsObject> {
  let json = context.global_object().get(js_string!("JSON"), context)?;
  let stringify = match json.as_object() {
    Some(json) => json.get(js_string!("stringify"), context)?,
    None => JsValue::undefined(),
  };

  stringify
    .as_callable()
    .cloned()
    .ok_or_else(|| JsNativeError::typ().with_message("JSON.stringify is not callable").into())
}

pub(crate) fn from_json(value: &serde_json::Value, context: &mut Context) -> JsResult<JsValue> {
  JsValue::from_json(value, context)
}

/// Convert an engine value to JSON. `undefined` becomes `null`.
pub(crate) fn to_json(
  value: &JsValue,
  stringify: &JsObject,
  context: &mut Context,
) -> Result<serde_json::Value, ToJsonError> {
  if value.is_undefined() {
    return Ok(serde_json::Value::Null);
  }
  if value.is_callable() {
    return Err(ToJsonError::NotRepresentable { kind: "function" });
  }
  if value.is_symbol() {
    return Err(ToJsonError::NotRepresentable { kind: "symbol" });
  }

  let text = stringify
    .call(&JsValue::undefined(), &[value.clone()], context)
    .map_err(ToJsonError::Thrown)?;

  match text.as_string() {
    Some(text) => serde_json::from_str(&text.to_std_string_escaped()).map_err(ToJsonError::Json),
    // toJSON hooks can still produce undefined
    None => Err(ToJsonError::NotRepresentable { kind: "value" }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use boa_engine::Source;
  use serde_json::json;

  fn eval_to_json(code: &str) -> Result<serde_json::Value, ToJsonError> {
    let mut context = Context::default();
    let stringify = lookup_stringify(&mut context).unwrap();
    let value = context.eval(Source::from_bytes(code)).unwrap();
    to_json(&value, &stringify, &mut context)
  }

  #[test]
  fn plain_values_convert() {
    assert_eq!(eval_to_json("'<p>hi</p>'").unwrap(), json!("<p>hi</p>"));
    assert_eq!(eval_to_json("42").unwrap(), json!(42));
    assert_eq!(eval_to_json("true").unwrap(), json!(true));
    assert_eq!(eval_to_json("null").unwrap(), json!(null));
  }

  #[test]
  fn undefined_becomes_null() {
    assert_eq!(eval_to_json("undefined").unwrap(), json!(null));
  }

  #[test]
  fn nested_objects_and_arrays_convert() {
    let value = eval_to_json("({ title: 'Home', tags: ['a', 'b'], meta: { n: 1 } })").unwrap();
    assert_eq!(value, json!({ "title": "Home", "tags": ["a", "b"], "meta": { "n": 1 } }));
  }

  #[test]
  fn function_properties_are_dropped() {
    let value = eval_to_json("({ html: '<p></p>', render: function () {} })").unwrap();
    assert_eq!(value, json!({ "html": "<p></p>" }));
  }

  #[test]
  fn top_level_function_is_rejected() {
    let result = eval_to_json("(function () {})");
    assert!(matches!(result, Err(ToJsonError::NotRepresentable { kind: "function" })));
  }

  #[test]
  fn json_round_trips_into_engine() {
    let mut context = Context::default();
    let stringify = lookup_stringify(&mut context).unwrap();
    let input = json!({ "content": "<p>x</p>", "assets": { "main": "/main.js" } });
    let value = from_json(&input, &mut context).unwrap();
    assert_eq!(to_json(&value, &stringify, &mut context).unwrap(), input);
  }
}
