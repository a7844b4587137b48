//! File-based memoization cache with tag invalidation.
//!
//! Every cached value lives in one file under the cache root. Tags are
//! expressed as hardlinks: an entry tagged `blog` and `home` has one link in
//! each tag's bucket directory, so its link count is `1 + tags`. Invalidating
//! a tag removes its bucket, which drops the link count of every member and
//! marks it stale without touching the entry files.
//!
//! Coordination goes through the filesystem only:
//!
//! - Readers never lock a valid entry.
//! - A per-key lock file serializes regeneration.
//! - New generations are written to `tmp/` and renamed into place, so readers
//!   see either the old or the new file, never a partial one.
//!
//! Several processes may share one cache root.
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use std::time::Duration;
//! use tagcache::{EntryOptions, Produced, StringCodec, TagCache};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let cache = TagCache::open(dir.path()).unwrap().with_codec(StringCodec);
//! let options = EntryOptions::new()
//!     .expire(Duration::from_secs(300))
//!     .tags(["blog", "home"]);
//!
//! let entry = cache.entry("blog-home", options).unwrap();
//! let html = entry
//!     .get(|| Ok::<_, Infallible>(Produced::Cached("<h1>Blog</h1>".to_owned())))
//!     .unwrap();
//! assert_eq!(html, "<h1>Blog</h1>");
//!
//! // Served from disk, the producer is not called
//! let again = entry.get(|| -> Result<Produced<String>, Infallible> { unreachable!() });
//! assert_eq!(again.unwrap(), "<h1>Blog</h1>");
//!
//! cache.invalidate_tag("home").unwrap();
//! let fresh = entry
//!     .get(|| Ok::<_, Infallible>(Produced::Cached("<h1>Blog v2</h1>".to_owned())))
//!     .unwrap();
//! assert_eq!(fresh, "<h1>Blog v2</h1>");
//! ```

mod cache;
mod codec;
mod entry;
mod error;
mod fs;
mod hash;
mod lock;
mod path;
mod record;

pub use cache::{EntryOptions, TagCache};
pub use codec::{Codec, JsonCodec, RawCodec, StringCodec};
pub use entry::{CacheEntry, Produced};
pub use error::{CacheError, CodecError, NameKind, Result};
pub use hash::{HashAlgorithm, KeyHasher, Md5Hasher, Sha256Hasher};
pub use lock::{FileLock, LockMode};
pub use path::{Namespace, PathMapper, validate_name};
pub use record::NEVER_EXPIRES;
