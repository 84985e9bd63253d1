//! Source excerpts for evaluation failures.
//!
//! When an entry throws, the failing location is recovered from the thrown
//! value's stack or, for syntax errors, from the engine's message. The
//! surrounding source is then rendered with a caret under the failing column:
//!
//! ```text
//! bundle.js:3
//! 1 | var items = [];
//! 2 | items.push(1);
//! 3 | var = items;
//!   |     ^
//! 4 | module.exports = items;
//! SyntaxError: expected token 'identifier', got '=' in var declaration at line 3, col 5
//! ```
//!
//! Formatting is best effort. Without a usable location the raw error text is
//! returned as-is. boa attaches no `stack` to thrown values and puts no
//! position in runtime error messages, so runtime failures in entries report
//! the bare message.

use std::sync::LazyLock;

use regex::Regex;

use crate::js::ScriptException;

/// Source lines shown on each side of the failing line.
pub const CONTEXT_LINES: usize = 9;

static V8_FRAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*at (?:.*? \()?(.+?):(\d+):(\d+)\)?\s*$").expect("valid frame pattern"));

static GECKO_FRAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(?:[^@\s]*@)?(.+?):(\d+):(\d+)$").expect("valid frame pattern"));

static MESSAGE_POSITION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)line (\d+), col(?:umn)? (\d+)").expect("valid position pattern"));

/// Where evaluated code failed. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
  /// The script label from the stack frame; `None` means the failing entry.
  pub label: Option<String>,
  pub line: usize,
  pub column: usize,
}

/// Recovers a failure location from a thrown value.
pub trait LocateError {
  fn locate(&self, exception: &ScriptException) -> Option<ErrorLocation>;
}

/// Reads the top frame of a `stack` string, falling back to a
/// `line L, col C` position in the error message.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackLocator;

impl LocateError for StackLocator {
  fn locate(&self, exception: &ScriptException) -> Option<ErrorLocation> {
    let from_stack = exception.stack.as_deref().and_then(|stack| {
      stack.lines().find_map(|line| {
        let caps = V8_FRAME.captures(line).or_else(|| GECKO_FRAME.captures(line))?;
        location(Some(caps[1].to_string()), &caps[2], &caps[3])
      })
    });

    from_stack.or_else(|| {
      let caps = MESSAGE_POSITION.captures(&exception.message)?;
      location(None, &caps[1], &caps[2])
    })
  }
}

fn location(label: Option<String>, line: &str, column: &str) -> Option<ErrorLocation> {
  let line: usize = line.parse().ok().filter(|&line| line > 0)?;
  let column: usize = column.parse().ok()?;
  Some(ErrorLocation {
    label,
    line,
    column: column.max(1),
  })
}

/// Render a diagnostic for `exception` thrown while evaluating `source`.
pub fn format(exception: &ScriptException, source: &str, label: &str) -> String {
  format_with(&StackLocator, exception, source, label)
}

/// [`format`] with a caller-chosen location strategy.
pub fn format_with(locator: &dyn LocateError, exception: &ScriptException, source: &str, label: &str) -> String {
  let Some(location) = locator.locate(exception).filter(|location| location.line > 0) else {
    return exception.message.clone();
  };

  // A frame in another script has no source here to excerpt.
  let same_script = location.label.as_deref().is_none_or(|frame| frame == label);
  let mut out = format!("{}:{}\n", location.label.as_deref().unwrap_or(label), location.line);

  let lines: Vec<&str> = source.lines().collect();
  if same_script && location.line <= lines.len() {
    render_excerpt(&mut out, &lines, location.line, location.column.max(1));
  }

  out.push_str(&exception.message);
  out
}

fn render_excerpt(out: &mut String, lines: &[&str], line: usize, column: usize) {
  let index = line - 1;
  let start = index.saturating_sub(CONTEXT_LINES);
  let end = (index + CONTEXT_LINES + 1).min(lines.len());
  let width = end.to_string().len();

  for (offset, text) in lines[start..end].iter().enumerate() {
    let number = start + offset + 1;
    out.push_str(&format!("{:>width$} | {}\n", number, text, width = width));
    if number == line {
      out.push_str(&format!("{:>width$} | {}^\n", "", caret_padding(text, column), width = width));
    }
  }
}

/// Whitespace that lines the caret up under `column`, keeping tabs so the
/// alignment survives tab-indented source.
fn caret_padding(text: &str, column: usize) -> String {
  text
    .chars()
    .take(column - 1)
    .map(|c| if c == '\t' { '\t' } else { ' ' })
    .collect()
}
