mod assets;
mod render;

pub use assets::{AssetsArgs, cmd_assets};
pub use render::{RenderArgs, cmd_render};

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use entryeval_lib::config::{Config, DEFAULT_CONFIG_FILE};

/// Load `explicit`, or `./entryeval.toml` when it exists, or nothing.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
  let path = match explicit {
    Some(path) => path,
    None => {
      let default = Path::new(DEFAULT_CONFIG_FILE);
      if !default.exists() {
        debug!("no config file, using flags only");
        return Ok(Config::default());
      }
      default
    }
  };

  Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}
