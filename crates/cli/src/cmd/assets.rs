//! Implementation of the `entryeval assets` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::{OwoColorize, Stream};

use entryeval_lib::assets::map_assets;
use entryeval_lib::compilation::{BuildStats, DEFAULT_STATS_FILE};

use crate::output::{OutputFormat, print_info, print_json, symbols};

#[derive(Debug, Args)]
pub struct AssetsArgs {
  /// Config file (default: ./entryeval.toml when present)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Build output directory holding stats.json
  #[arg(short, long)]
  pub output_dir: Option<PathBuf>,

  /// Stats file (default: <output-dir>/stats.json)
  #[arg(long)]
  pub stats: Option<PathBuf>,

  /// Prefix for asset paths, overriding the stats file
  #[arg(long)]
  pub public_path: Option<String>,

  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

/// Execute the assets command: print the map a template would receive.
pub fn cmd_assets(args: AssetsArgs) -> Result<()> {
  let config = super::load_config(args.config.as_deref())?;

  let stats_path = match args.stats.or(config.stats) {
    Some(path) => path,
    None => args
      .output_dir
      .or(config.output_dir)
      .context("no stats file given; pass --stats or --output-dir")?
      .join(DEFAULT_STATS_FILE),
  };
  let stats = BuildStats::load(&stats_path).with_context(|| format!("Failed to load {}", stats_path.display()))?;

  let public_path = args.public_path.or(config.public_path).or(stats.public_path.clone());
  let assets = map_assets(&stats.assets_by_chunk_name, public_path.as_deref());

  if args.format.is_json() {
    return print_json(&assets);
  }

  if assets.is_empty() {
    print_info("No chunks in build stats");
    return Ok(());
  }
  for (chunk, path) in &assets {
    println!(
      "{} {} {}",
      chunk.if_supports_color(Stream::Stdout, |s| s.bold()),
      symbols::ARROW,
      path
    );
  }

  Ok(())
}
