//! `tagcache run` command implementation.

use std::io;
use std::process::{Command, ExitStatus, Stdio};

use clap::Args;
use tagcache::Produced;

use super::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Cache key.
    #[arg(short, long)]
    key: String,

    /// Expiry in seconds, 0 never expires (overrides config).
    #[arg(short, long)]
    expire: Option<u64>,

    /// Tag the entry, repeatable (added to configured default tags).
    #[arg(short, long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Command whose stdout is cached, with its arguments.
    #[arg(last = true, required = true, value_name = "CMD")]
    command: Vec<String>,
}

impl RunArgs {
    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be used, the command cannot be
    /// spawned, or the command exits unsuccessfully.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let config = global.load_config(self.expire)?;
        let cache = config.open_cache()?;
        let options = config.defaults.entry_options().tags(self.tags);
        let entry = cache.entry(&self.key, options)?;

        let mut failure = None;
        let stdout = entry.get(|| produce(&self.command, &mut failure))?;
        output.payload(&stdout)?;

        match failure {
            Some(status) => Err(CliError::CommandFailed(status)),
            None => Ok(()),
        }
    }
}

/// Run `command` and capture its stdout. Unsuccessful runs are not cached.
fn produce(command: &[String], failure: &mut Option<ExitStatus>) -> io::Result<Produced<Vec<u8>>> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    tracing::info!(program, "Running command");
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()?;

    if result.status.success() {
        Ok(Produced::Cached(result.stdout))
    } else {
        *failure = Some(result.status);
        Ok(Produced::Uncached(result.stdout))
    }
}
