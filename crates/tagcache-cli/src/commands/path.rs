//! `tagcache path` command implementation.

use clap::{ArgGroup, Args};

use super::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the path command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["key", "tag"])))]
pub(crate) struct PathArgs {
    /// Print the entry file path for this key.
    #[arg(long)]
    key: Option<String>,

    /// Print the bucket directory path for this tag.
    #[arg(long)]
    tag: Option<String>,
}

impl PathArgs {
    /// Execute the path command.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let cache = global.open_cache()?;
        // clap guarantees exactly one of the two
        let path = match &self.key {
            Some(key) => cache.key_path(key)?,
            None => cache.tag_path(self.tag.as_deref().unwrap_or_default())?,
        };
        Output::new().line(&path.display().to_string())?;
        Ok(())
    }
}
