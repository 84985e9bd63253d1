//! JavaScript evaluation.
//!
//! Entries run inside a fresh `boa_engine` context per build pass. The engine
//! only exposes ECMAScript built-ins plus whatever the base scope provides, so
//! bundles cannot reach into the host process.
//!
//! # Submodules
//!
//! - [`context`] - The per-pass global scope and entry evaluation
//! - `value` - JSON conversion in and out of the engine

pub mod context;
mod value;

pub use context::{BaseScope, EvalContext, EvaluationError, ExportError, ScopeError, ScriptException};
