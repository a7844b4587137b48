//! File-based tag cache rooted at a directory on disk.
//!
//! Directory layout:
//! ```text
//! {root}/
//! +-- data/
//! |   +-- 3f/a2/key:626c6f67       # entry file
//! |   +-- 3f/a2/key:626c6f67.lock  # per-key lock marker
//! |   +-- 9c/01/tag:686f6d65/      # tag bucket
//! |       +-- 07/64769-1234507     # hardlink to a tagged entry
//! +-- tmp/                         # scratch area for atomic publication
//! ```
//!
//! `data/` and `tmp/` share a filesystem, so publishing an entry is a single
//! `rename(2)`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{Codec, RawCodec};
use crate::entry::{CacheEntry, LinkName, Produced};
use crate::error::{CacheError, NameKind, Result};
use crate::hash::{KeyHasher, Sha256Hasher};
use crate::path::{Namespace, PathMapper, validate_name};
use crate::record;

/// Per-entry options: expiry and tags.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    expire: Option<Duration>,
    tags: Vec<String>,
}

impl EntryOptions {
    /// No expiry, no tags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire entries `expire` after they are written. Zero never expires.
    #[must_use]
    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    /// Add one tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Tag cache rooted at a directory.
///
/// Holds everything an entry operation needs (root, hasher, codec), so
/// independently configured caches can coexist in one process. The cache
/// itself keeps no state between calls; all coordination goes through the
/// filesystem.
pub struct TagCache<C = RawCodec> {
    root: PathBuf,
    tmp_dir: PathBuf,
    mapper: PathMapper,
    codec: C,
}

impl TagCache<RawCodec> {
    /// Open a cache rooted at `root` with the default hasher and raw byte
    /// payloads.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Configuration`] if `root` does not exist or is not
    /// a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CacheError::Configuration(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let root = fs::canonicalize(root).map_err(|e| CacheError::io("resolve", root, e))?;
        tracing::debug!(root = %root.display(), "Opened tag cache");

        Ok(Self {
            tmp_dir: root.join("tmp"),
            mapper: PathMapper::new(root.join("data"), Arc::new(Sha256Hasher)),
            root,
            codec: RawCodec,
        })
    }
}

impl<C> TagCache<C> {
    /// Replace the payload codec.
    #[must_use]
    pub fn with_codec<D: Codec>(self, codec: D) -> TagCache<D> {
        TagCache {
            root: self.root,
            tmp_dir: self.tmp_dir,
            mapper: self.mapper,
            codec,
        }
    }

    /// Replace the hash function used for path sharding.
    ///
    /// Entries written with another hasher become unreachable.
    #[must_use]
    pub fn with_hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.mapper = PathMapper::new(self.mapper.data_dir().to_path_buf(), Arc::new(hasher));
        self
    }

    /// Same as [`TagCache::with_hasher`] for an already boxed hasher.
    #[must_use]
    pub fn with_boxed_hasher(mut self, hasher: Box<dyn KeyHasher>) -> Self {
        self.mapper = PathMapper::new(self.mapper.data_dir().to_path_buf(), Arc::from(hasher));
        self
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    /// Storage path of the entry file for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] for unsafe keys.
    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        self.mapper.resolve(Namespace::Key, key)
    }

    /// Storage path of the bucket directory for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] for unsafe tags.
    pub fn tag_path(&self, tag: &str) -> Result<PathBuf> {
        self.mapper.resolve(Namespace::Tag, tag)
    }

    pub(crate) fn ensure_tmp_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.tmp_dir)
            .map_err(|e| CacheError::io("create directory", &self.tmp_dir, e))?;
        Ok(&self.tmp_dir)
    }

    /// Invalidate every entry tagged with `tag`.
    ///
    /// The bucket is renamed into `tmp/` and deleted there, so links created
    /// concurrently land in a fresh bucket. Invalidating a tag without members
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] for unsafe tags and
    /// [`CacheError::Io`] if the bucket cannot be removed.
    pub fn invalidate_tag(&self, tag: &str) -> Result<()> {
        let bucket = self.tag_path(tag)?;
        let tmp_dir = self.ensure_tmp_dir()?;
        let graveyard = tempfile::Builder::new()
            .prefix("tag-")
            .tempdir_in(tmp_dir)
            .map_err(|e| CacheError::io("create temp directory in", tmp_dir, e))?;

        match fs::rename(&bucket, graveyard.path().join("bucket")) {
            Ok(()) => tracing::debug!(tag, "Invalidated tag"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(tag, "Tag has no bucket, nothing to invalidate");
            }
            Err(e) => return Err(CacheError::io("move bucket", &bucket, e)),
        }

        let graveyard_path = graveyard.path().to_path_buf();
        graveyard
            .close()
            .map_err(|e| CacheError::io("remove bucket", graveyard_path, e))
    }

    /// Invalidate the entry for `key` and remove its tag links.
    ///
    /// Invalidating a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] for unsafe keys and
    /// [`CacheError::Io`] if the entry file cannot be removed.
    pub fn invalidate_key(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let Some(file) =
            crate::fs::open_existing(&path).map_err(|e| CacheError::io("open entry", &path, e))?
        else {
            return Ok(());
        };

        crate::fs::remove_file_if_exists(&path)
            .map_err(|e| CacheError::io("remove entry", &path, e))?;
        tracing::debug!(key, "Invalidated key");

        // Unreadable entries have no known tags; bulk invalidation reclaims
        // their links.
        if let Ok(record) = record::read_record(&file, &path)
            && let Ok(link) = LinkName::of(&file)
        {
            self.unlink_generation(link, &record.tags);
        }
        Ok(())
    }

    /// Best-effort removal of one generation's bucket links.
    pub(crate) fn unlink_generation(&self, link: LinkName, tags: &BTreeSet<String>) {
        for tag in tags {
            let Ok(bucket) = self.tag_path(tag) else {
                continue;
            };
            let path = bucket.join(link.relative_path());
            if let Err(e) = crate::fs::remove_file_if_exists(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove stale tag link");
            }
        }
    }
}

impl<C: Codec> TagCache<C> {
    /// Create an entry handle for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNameFormat`] if the key or any tag is
    /// unsafe. No I/O is performed.
    pub fn entry(&self, key: &str, options: EntryOptions) -> Result<CacheEntry<'_, C>> {
        let path = self.key_path(key)?;
        let tags = options
            .tags
            .into_iter()
            .map(|tag| validate_name(NameKind::Tag, &tag).map(|()| tag))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(CacheEntry::new(self, key.to_owned(), options.expire, tags, path))
    }

    /// Shorthand for `self.entry(key, options)?.get(producer)`.
    ///
    /// # Errors
    ///
    /// See [`TagCache::entry`] and [`CacheEntry::get`].
    pub fn get_or_produce<F, E>(&self, key: &str, options: EntryOptions, producer: F) -> Result<C::Value>
    where
        F: FnOnce() -> std::result::Result<Produced<C::Value>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.entry(key, options)?.get(producer)
    }
}

impl<C> std::fmt::Debug for TagCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagCache")
            .field("root", &self.root)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}
