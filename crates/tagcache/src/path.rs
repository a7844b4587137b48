//! Name validation and sharded path mapping.
//!
//! Every name is stored under `data/<h0h1>/<h2h3>/<ns>:<hex(name)>`, where
//! `h` is the hex digest of the leaf component. Lookups never scan a
//! directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::{CacheError, NameKind, Result};
use crate::hash::KeyHasher;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-_.@]+$").expect("valid name regex"));

/// Check a key or tag against the safe character class.
///
/// # Errors
///
/// Returns [`CacheError::InvalidNameFormat`] if `name` is empty or contains a
/// character outside `[A-Za-z0-9-_.@]`.
pub fn validate_name(kind: NameKind, name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CacheError::InvalidNameFormat {
            kind,
            name: name.to_owned(),
        })
    }
}

/// Storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Entry files, one per key.
    Key,
    /// Tag bucket directories, one per tag.
    Tag,
}

impl Namespace {
    fn prefix(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Tag => "tag",
        }
    }

    fn name_kind(self) -> NameKind {
        match self {
            Self::Key => NameKind::Key,
            Self::Tag => NameKind::Tag,
        }
    }
}

/// Maps `(namespace, name)` pairs to sharded paths under a data directory.
#[derive(Clone)]
pub struct PathMapper {
    data_dir: PathBuf,
    hasher: Arc<dyn KeyHasher>,
}

impl PathMapper {
    /// Create a mapper rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: PathBuf, hasher: Arc<dyn KeyHasher>) -> Self {
        Self { data_dir, hasher }
    }

    /// Directory all shards live under.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve the storage path for `name` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] for unsafe names, or
    /// [`CacheError::Configuration`] if the hasher yields fewer than two
    /// digest bytes. No I/O is performed.
    pub fn resolve(&self, namespace: Namespace, name: &str) -> Result<PathBuf> {
        validate_name(namespace.name_kind(), name)?;

        let leaf = format!("{}:{}", namespace.prefix(), hex::encode(name));
        let digest = self.hasher.hex_digest(leaf.as_bytes());
        if digest.len() < 4 || !digest.is_ascii() {
            return Err(CacheError::Configuration(format!(
                "hasher produced {digest:?}, need at least 2 bytes of hex digest"
            )));
        }
        Ok(self
            .data_dir
            .join(&digest[..2])
            .join(&digest[2..4])
            .join(leaf))
    }
}

impl std::fmt::Debug for PathMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathMapper")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}
