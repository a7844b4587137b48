//! CLI command implementations.

mod invalidate;
mod path;
mod run;

use std::path::PathBuf;

use clap::Args;
use tagcache::{HashAlgorithm, TagCache};
use tagcache_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use invalidate::{InvalidateKeyArgs, InvalidateTagArgs};
pub(crate) use path::PathArgs;
pub(crate) use run::RunArgs;

/// Options shared by every command.
#[derive(Args, Debug)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover tagcache.toml).
    #[arg(short, long, global = true, env = "TAGCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Cache root directory (overrides config).
    #[arg(short, long, global = true, env = "TAGCACHE_ROOT")]
    root: Option<PathBuf>,

    /// Hash function for storage paths: sha256 or md5 (overrides config).
    #[arg(long, global = true)]
    hash: Option<HashAlgorithm>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Load configuration with these overrides, plus a default expiry
    /// override from the command.
    fn load_config(&self, expire: Option<u64>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            root_dir: self.root.clone(),
            hash: self.hash,
            expire,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::info!(root = %config.cache_resolved.root_dir.display(), "Using cache root");
        Ok(config)
    }

    fn open_cache(&self) -> Result<TagCache, CliError> {
        Ok(self.load_config(None)?.open_cache()?)
    }
}
