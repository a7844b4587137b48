//! `tagcache invalidate-tag` and `tagcache invalidate-key` implementations.

use clap::Args;

use super::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the invalidate-tag command.
#[derive(Args, Debug)]
pub(crate) struct InvalidateTagArgs {
    /// Tags to invalidate.
    #[arg(required = true, value_name = "TAG")]
    tags: Vec<String>,
}

impl InvalidateTagArgs {
    /// Execute the invalidate-tag command.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let cache = global.open_cache()?;
        for tag in &self.tags {
            cache.invalidate_tag(tag)?;
            output.success(&format!("Invalidated tag {tag}"));
        }
        Ok(())
    }
}

/// Arguments for the invalidate-key command.
#[derive(Args, Debug)]
pub(crate) struct InvalidateKeyArgs {
    /// Keys to invalidate.
    #[arg(required = true, value_name = "KEY")]
    keys: Vec<String>,
}

impl InvalidateKeyArgs {
    /// Execute the invalidate-key command.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let cache = global.open_cache()?;
        for key in &self.keys {
            cache.invalidate_key(key)?;
            output.success(&format!("Invalidated key {key}"));
        }
        Ok(())
    }
}
