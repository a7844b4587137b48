//! Configuration management for tagcache.
//!
//! Parses `tagcache.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Path Expansion
//!
//! `cache.root_dir` supports `~` and environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Relative paths resolve against the directory holding the config file.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tagcache::{EntryOptions, HashAlgorithm, NameKind, TagCache, validate_name};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override cache root directory.
    pub root_dir: Option<PathBuf>,
    /// Override path hash function.
    pub hash: Option<HashAlgorithm>,
    /// Override default expiry in seconds.
    pub expire: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tagcache.toml";

/// Cache root used when no config file sets one.
const DEFAULT_ROOT_DIR: &str = ".tagcache";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache configuration (root path is a raw string from TOML).
    cache: CacheConfigRaw,
    /// Defaults applied to every entry.
    pub defaults: DefaultsConfig,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    root_dir: Option<String>,
    hash: HashAlgorithm,
    create_root: bool,
}

/// Resolved cache configuration with an absolute root.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Cache root directory.
    pub root_dir: PathBuf,
    /// Hash function for path sharding.
    pub hash: HashAlgorithm,
    /// Whether to create `root_dir` when it is missing.
    pub create_root: bool,
}

/// Per-entry defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Expiry in seconds, 0 never expires.
    pub expire: u64,
    /// Tags added to every entry.
    pub tags: Vec<String>,
}

impl DefaultsConfig {
    /// Entry options carrying these defaults.
    #[must_use]
    pub fn entry_options(&self) -> EntryOptions {
        EntryOptions::new()
            .expire(Duration::from_secs(self.expire))
            .tags(self.tags.iter().cloned())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`cache.root_dir`").
        field: String,
        /// Error message (e.g., "${`CACHE_DIR`} not set").
        message: String,
    },
    /// The configured cache could not be opened.
    #[error(transparent)]
    Cache(#[from] tagcache::CacheError),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tagcache.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the result does not validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root_dir) = &settings.root_dir {
            self.cache_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(hash) = settings.hash {
            self.cache_resolved.hash = hash;
        }
        if let Some(expire) = settings.expire {
            self.defaults.expire = expire;
        }
    }

    /// Open the configured cache.
    ///
    /// Creates the root directory first when `create_root` is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the root cannot be created and
    /// `ConfigError::Cache` if it is not a usable directory.
    pub fn open_cache(&self) -> Result<TagCache, ConfigError> {
        let root = &self.cache_resolved.root_dir;
        if self.cache_resolved.create_root {
            std::fs::create_dir_all(root)?;
        }
        let cache = TagCache::open(root)?.with_boxed_hasher(self.cache_resolved.hash.hasher());
        Ok(cache)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_resolved.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache.root_dir cannot be empty".to_owned(),
            ));
        }
        for tag in &self.defaults.tags {
            validate_name(NameKind::Tag, tag)
                .map_err(|e| ConfigError::Validation(format!("defaults.tags: {e}")))?;
        }
        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            cache: CacheConfigRaw::default(),
            defaults: DefaultsConfig::default(),
            cache_resolved: CacheConfig {
                root_dir: base.join(DEFAULT_ROOT_DIR),
                hash: HashAlgorithm::default(),
                create_root: false,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand and resolve the raw cache section against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let root_dir = match self.cache.root_dir.as_deref() {
            Some(raw) => config_dir.join(expand::expand_path(raw, "cache.root_dir")?),
            None => config_dir.join(DEFAULT_ROOT_DIR),
        };

        self.cache_resolved = CacheConfig {
            root_dir,
            hash: self.cache.hash,
            create_root: self.cache.create_root,
        };
        Ok(())
    }
}
