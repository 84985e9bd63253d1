//! Implementation of the `entryeval render` command.
//!
//! Loads a finished build output directory, runs one build pass over the
//! configured entries and writes the rendered artifact next to the other
//! build outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::info;

use entryeval_lib::assemble::EntryEvaluator;
use entryeval_lib::compilation::{Asset, Compilation};
use entryeval_lib::config::DEFAULT_CONFIG_FILE;
use entryeval_lib::js::BaseScope;
use entryeval_lib::template::JsTemplate;

use crate::output::{OutputFormat, format_bytes, print_json, print_stat, print_success};

#[derive(Debug, Args)]
pub struct RenderArgs {
  /// Config file (default: ./entryeval.toml when present)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Entry to evaluate, as a path or build artifact name. Repeat to evaluate
  /// several in order
  #[arg(short, long = "entry", value_name = "ENTRY")]
  pub entries: Vec<String>,

  /// Name of the rendered artifact within the build output
  #[arg(short, long)]
  pub dest: Option<String>,

  /// JavaScript module exporting the template function
  #[arg(short, long)]
  pub template: Option<PathBuf>,

  /// Build output directory
  #[arg(short, long)]
  pub output_dir: Option<PathBuf>,

  /// Stats file (default: <output-dir>/stats.json)
  #[arg(long)]
  pub stats: Option<PathBuf>,

  /// Prefix for asset paths, overriding the stats file
  #[arg(long)]
  pub public_path: Option<String>,

  /// JSON file of base scope bindings
  #[arg(long)]
  pub scope: Option<PathBuf>,

  /// Directory to write the artifact into (default: the output directory)
  #[arg(long)]
  pub write_to: Option<PathBuf>,

  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct RenderSummary {
  destination: String,
  path: PathBuf,
  entries: usize,
  bytes: usize,
  elapsed_ms: u128,
}

/// Execute the render command.
///
/// Flags take precedence over the config file. Scope bindings from `--scope`
/// are layered on top of the config file's `[scope]` table.
pub fn cmd_render(args: RenderArgs) -> Result<()> {
  let config = super::load_config(args.config.as_deref())?;

  let entries = if args.entries.is_empty() {
    config.entries
  } else {
    args.entries
  };
  if entries.is_empty() {
    bail!("no entries given; pass --entry or set `entries` in {}", DEFAULT_CONFIG_FILE);
  }
  let destination = args
    .dest
    .or(config.destination)
    .context("no destination given; pass --dest or set `destination`")?;
  let template_path = args
    .template
    .or(config.template)
    .context("no template given; pass --template or set `template`")?;
  let output_dir = args
    .output_dir
    .or(config.output_dir)
    .context("no output directory given; pass --output-dir or set `output_dir`")?;
  let stats = args.stats.or(config.stats);
  let public_path = args.public_path.or(config.public_path);

  let mut scope = config.scope;
  if let Some(path) = &args.scope {
    scope.extend(load_scope(path)?);
  }

  let mut compilation = Compilation::from_output_dir(&output_dir, stats.as_deref())
    .with_context(|| format!("Failed to load build output from {}", output_dir.display()))?;
  if public_path.is_some() {
    compilation.set_public_path(public_path);
  }

  let template = JsTemplate::from_file(&template_path).context("Failed to load template")?;
  let evaluator = EntryEvaluator::new(entries, destination, template).with_scope(scope);

  let started = Instant::now();
  let artifact = evaluator.run_build_pass(&compilation).context("Build pass failed")?;
  let elapsed = started.elapsed();

  let write_to = args.write_to.unwrap_or(output_dir);
  let target = write_to.join(artifact.path());
  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(&target, artifact.source()).with_context(|| format!("Failed to write {}", target.display()))?;
  let target = dunce::canonicalize(&target).unwrap_or(target);
  info!(path = %target.display(), "wrote artifact");

  if args.format.is_json() {
    return print_json(&RenderSummary {
      destination: artifact.path().to_string(),
      path: target,
      entries: evaluator.entries().len(),
      bytes: artifact.size(),
      elapsed_ms: elapsed.as_millis(),
    });
  }

  print_success(&format!("Rendered {}", artifact.path()));
  print_stat("Path", &target.display().to_string());
  print_stat("Entries", &evaluator.entries().len().to_string());
  print_stat("Size", &format_bytes(artifact.size() as u64));
  let rounded = Duration::from_millis(elapsed.as_millis() as u64);
  print_stat("Time", &humantime::format_duration(rounded).to_string());

  Ok(())
}

/// Read a JSON object of base scope bindings.
fn load_scope(path: &Path) -> Result<BaseScope> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read scope file {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("Scope file {} must hold a JSON object", path.display()))
}
