//! CLI error types.

use tagcache::CacheError;
use tagcache_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed ({0}), result was not cached")]
    CommandFailed(std::process::ExitStatus),
}
