//! Cache entry read/validate/regenerate protocol.
//!
//! A reader opens the entry file without locking. Only a miss, a stale entry
//! or an unreadable entry touches the per-key lock:
//!
//! - **Miss**: wait for the exclusive lock, re-check, regenerate. Concurrent
//!   first callers queue behind whoever creates the entry and then read it.
//! - **Stale**: try the exclusive lock without waiting. The winner
//!   regenerates; everyone else gets the old value immediately.
//! - **Unreadable** (corrupt header or undecodable payload): handled like a
//!   miss, the file is overwritten.
//!
//! An entry is stale when it has expired, was written with a different tag
//! set, or lost one of its tag bucket links (its link count is no longer
//! `1 + tags`).

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use crate::cache::TagCache;
use crate::codec::Codec;
use crate::error::{CacheError, Result};
use crate::fs;
use crate::lock::{FileLock, LockMode};
use crate::record::{self, NEVER_EXPIRES, Record};

/// Result of a content producer.
///
/// Producers return `Uncached` for values that must not be stored, e.g. an
/// error page. The value is handed back to the caller and the next call
/// invokes the producer again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced<T> {
    /// Store the value and return it.
    Cached(T),
    /// Return the value without storing it.
    Uncached(T),
}

impl<T> Produced<T> {
    /// Unwrap the produced value.
    pub fn into_inner(self) -> T {
        match self {
            Self::Cached(value) | Self::Uncached(value) => value,
        }
    }

    /// Whether the value will be stored.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Name of a generation's links inside tag buckets.
///
/// Derived from the device and inode of the entry file, which are unique
/// among live files and stay fixed across the final rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkName {
    dev: u64,
    ino: u64,
}

impl LinkName {
    pub(crate) fn of(file: &File) -> std::io::Result<Self> {
        let meta = file.metadata()?;
        Ok(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    /// Path of the link relative to a bucket directory.
    pub(crate) fn relative_path(self) -> PathBuf {
        PathBuf::from(format!("{:02}", self.ino % 100)).join(format!("{}-{}", self.dev, self.ino))
    }
}

/// A generation read from disk that a regeneration is about to replace.
struct Previous {
    link: LinkName,
    tags: BTreeSet<String>,
}

/// One cached value, identified by key and requested tag set.
///
/// Created with [`TagCache::entry`]. Paths are resolved at construction; the
/// handle does no I/O until [`CacheEntry::get`].
#[derive(Debug)]
pub struct CacheEntry<'c, C> {
    cache: &'c TagCache<C>,
    key: String,
    expire: Option<Duration>,
    tags: BTreeSet<String>,
    path: PathBuf,
    lock_path: PathBuf,
}

impl<'c, C: Codec> CacheEntry<'c, C> {
    pub(crate) fn new(
        cache: &'c TagCache<C>,
        key: String,
        expire: Option<Duration>,
        tags: BTreeSet<String>,
        path: PathBuf,
    ) -> Self {
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self {
            cache,
            key,
            expire: expire.filter(|d| !d.is_zero()),
            tags,
            path,
            lock_path: lock_path.into(),
        }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Requested tag set.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Path of the entry file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the per-key lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Return the cached value, calling `producer` when it is missing or
    /// stale.
    ///
    /// A stale value is returned without calling `producer` if another caller
    /// is regenerating the entry at the same time.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Producer`] if `producer` fails; nothing is published.
    /// - [`CacheError::KeyMismatch`] if the file at this key's path belongs
    ///   to another key.
    /// - [`CacheError::LockUnavailable`], [`CacheError::Io`] or
    ///   [`CacheError::Codec`] (on encode) for I/O and encoding failures.
    pub fn get<F, E>(&self, producer: F) -> Result<C::Value>
    where
        F: FnOnce() -> std::result::Result<Produced<C::Value>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        // Released on every return path by Drop.
        let mut lock = FileLock::new(&self.lock_path);

        let file = match self.open()? {
            Some(file) => file,
            None => {
                lock.acquire(LockMode::Exclusive)?;
                // Someone may have created it while we waited.
                match self.open()? {
                    Some(file) => {
                        lock.release();
                        file
                    }
                    None => {
                        tracing::debug!(key = %self.key, "Cache miss");
                        return self.generate(producer, None);
                    }
                }
            }
        };

        let record = match record::read_record(&file, &self.path) {
            Ok(record) => record,
            Err(e) if e.is_corruption() => return self.repair(&mut lock, producer, &e),
            Err(e) => return Err(e),
        };

        if self.check(&file, &record)? {
            return match self.cache.codec().decode(&record.payload) {
                Ok(value) => Ok(value),
                Err(e) => self.repair(&mut lock, producer, &e.into()),
            };
        }

        if lock.try_acquire(LockMode::Exclusive)? {
            let previous = Previous {
                link: LinkName::of(&file).map_err(|e| CacheError::io("stat entry", &self.path, e))?,
                tags: record.tags,
            };
            tracing::debug!(key = %self.key, "Regenerating stale entry");
            return self.generate(producer, Some(previous));
        }

        tracing::debug!(key = %self.key, "Entry is being regenerated elsewhere, serving stale value");
        match self.cache.codec().decode(&record.payload) {
            Ok(value) => Ok(value),
            Err(e) => self.repair(&mut lock, producer, &e.into()),
        }
    }

    fn open(&self) -> Result<Option<File>> {
        fs::open_existing(&self.path).map_err(|e| CacheError::io("open entry", &self.path, e))
    }

    /// Validate a record against this entry.
    fn check(&self, file: &File, record: &Record) -> Result<bool> {
        if record.key != self.key {
            return Err(CacheError::KeyMismatch {
                expected: self.key.clone(),
                found: record.key.clone(),
            });
        }

        if !record::is_live(record.expire_at) {
            return Ok(false);
        }

        if record.tags != self.tags {
            return Ok(false);
        }

        let nlink = file
            .metadata()
            .map_err(|e| CacheError::io("stat entry", &self.path, e))?
            .nlink();
        Ok(nlink == 1 + record.tags.len() as u64)
    }

    /// Replace an unreadable entry, waiting for the lock like a miss does.
    fn repair<F, E>(&self, lock: &mut FileLock, producer: F, cause: &CacheError) -> Result<C::Value>
    where
        F: FnOnce() -> std::result::Result<Produced<C::Value>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        tracing::warn!(key = %self.key, error = %cause, "Discarding unreadable cache entry");
        lock.acquire(LockMode::Exclusive)?;

        let mut previous = None;
        if let Some(file) = self.open()?
            && let Ok(record) = record::read_record(&file, &self.path)
        {
            if self.check(&file, &record)?
                && let Ok(value) = self.cache.codec().decode(&record.payload)
            {
                return Ok(value);
            }
            if let Ok(link) = LinkName::of(&file) {
                previous = Some(Previous {
                    link,
                    tags: record.tags,
                });
            }
        }

        self.generate(producer, previous)
    }

    /// Produce, encode and publish a new generation. Caller holds the lock.
    fn generate<F, E>(&self, producer: F, previous: Option<Previous>) -> Result<C::Value>
    where
        F: FnOnce() -> std::result::Result<Produced<C::Value>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let value = match producer().map_err(|e| CacheError::Producer(e.into()))? {
            Produced::Cached(value) => value,
            Produced::Uncached(value) => {
                tracing::debug!(key = %self.key, "Producer asked not to cache result");
                return Ok(value);
            }
        };

        let payload = self.cache.codec().encode(&value)?;
        let expire_at = self.expire_at();
        self.publish(expire_at, &payload)?;
        tracing::debug!(key = %self.key, expire_at, tags = self.tags.len(), "Published cache entry");

        if let Some(previous) = previous {
            self.cache.unlink_generation(previous.link, &previous.tags);
        }

        Ok(value)
    }

    /// Absolute expire time, clamped to the never-expires sentinel.
    fn expire_at(&self) -> u64 {
        self.expire.map_or(NEVER_EXPIRES, |expire| {
            record::now_secs()
                .saturating_add(expire.as_secs())
                .min(NEVER_EXPIRES)
        })
    }

    /// Write the record to a temp file, link it into every tag bucket and
    /// rename it onto the entry path.
    fn publish(&self, expire_at: u64, payload: &[u8]) -> Result<()> {
        let tmp_dir = self.cache.ensure_tmp_dir()?;
        let mut tmp = tempfile::Builder::new()
            .prefix("entry-")
            .tempfile_in(tmp_dir)
            .map_err(|e| CacheError::io("create temp file in", tmp_dir, e))?;

        let write = |file: &mut File| -> std::io::Result<()> {
            file.write_all(&record::encode_header(&self.key, expire_at, &self.tags))?;
            file.write_all(payload)?;
            match UNIX_EPOCH.checked_add(Duration::from_secs(expire_at)) {
                Some(mtime) => file.set_modified(mtime),
                None => Ok(()),
            }
        };
        write(tmp.as_file_mut()).map_err(|e| CacheError::io("write", tmp.path(), e))?;

        let mut links = Vec::with_capacity(self.tags.len());
        if !self.tags.is_empty() {
            let name = LinkName::of(tmp.as_file())
                .map_err(|e| CacheError::io("stat", tmp.path(), e))?;
            for tag in &self.tags {
                let link = self.cache.tag_path(tag)?.join(name.relative_path());
                if let Err(e) = fs::link_file(tmp.path(), &link) {
                    remove_links(&links);
                    return Err(CacheError::io("link tag", &link, e));
                }
                links.push(link);
            }
        }

        // Closes the file; the path is still removed on drop until kept.
        let tmp_path = tmp.into_temp_path();
        if let Err(e) = fs::rename_file(&tmp_path, &self.path) {
            remove_links(&links);
            return Err(CacheError::io("publish", &self.path, e));
        }
        // Renamed away, nothing left to clean up.
        let _ = tmp_path.keep();
        Ok(())
    }
}

fn remove_links(links: &[PathBuf]) {
    for link in links {
        if let Err(e) = fs::remove_file_if_exists(link) {
            tracing::warn!(path = %link.display(), error = %e, "Failed to roll back tag link");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryOptions;
    use crate::codec::{JsonCodec, StringCodec};
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, mpsc};
    use std::thread;
    use tempfile::TempDir;

    fn string_cache(tmp: &TempDir) -> TagCache<StringCodec> {
        TagCache::open(tmp.path()).unwrap().with_codec(StringCodec)
    }

    fn tagged(tags: &[&str]) -> EntryOptions {
        EntryOptions::new().tags(tags.iter().copied())
    }

    fn cached(value: &str) -> std::result::Result<Produced<String>, Infallible> {
        Ok(Produced::Cached(value.to_owned()))
    }

    fn nlink(path: &Path) -> u64 {
        std::fs::metadata(path).unwrap().nlink()
    }

    /// Rewrite an entry's expire time in place, keeping its inode and links.
    fn backdate(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        let mut lines = bytes.splitn(3, |&b| b == b'\n');
        let key = lines.next().unwrap().to_vec();
        lines.next().unwrap();
        let rest = lines.next().unwrap().to_vec();

        let mut out = key;
        out.extend_from_slice(b"\n1\n");
        out.extend_from_slice(&rest);
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn test_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("home", EntryOptions::new()).unwrap();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = entry
                .get(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    cached("<html>home</html>")
                })
                .unwrap();
            assert_eq!(value, "<html>home</html>");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read(entry.path()).unwrap(),
            b"home\n4294967296\n\n<html>home</html>"
        );
    }

    #[test]
    fn test_hit_takes_no_lock() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("home", EntryOptions::new()).unwrap();
        entry.get(|| cached("v1")).unwrap();

        // A valid entry is readable while another holder has the lock
        let mut holder = FileLock::new(entry.lock_path());
        holder.acquire(LockMode::Exclusive).unwrap();
        let value = entry.get(|| cached("never")).unwrap();
        assert_eq!(value, "v1");
    }

    #[test]
    fn test_link_count_matches_tags() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("post-1", tagged(&["a", "b"])).unwrap();
        entry.get(|| cached("body")).unwrap();

        assert_eq!(nlink(entry.path()), 3);

        let untagged = cache.entry("post-2", EntryOptions::new()).unwrap();
        untagged.get(|| cached("body")).unwrap();
        assert_eq!(nlink(untagged.path()), 1);
    }

    #[test]
    fn test_removed_tag_link_forces_regeneration() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("post-1", tagged(&["a", "b"])).unwrap();
        entry.get(|| cached("v1")).unwrap();

        // Remove only the link in bucket "a"
        let link = {
            let file = File::open(entry.path()).unwrap();
            cache
                .tag_path("a")
                .unwrap()
                .join(LinkName::of(&file).unwrap().relative_path())
        };
        std::fs::remove_file(link).unwrap();
        assert_eq!(nlink(entry.path()), 2);

        let value = entry.get(|| cached("v2")).unwrap();
        assert_eq!(value, "v2");
        assert_eq!(nlink(entry.path()), 3);
    }

    #[test]
    fn test_tag_set_is_part_of_identity() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let calls = AtomicUsize::new(0);
        let produce = |value: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            cached(value)
        };

        let first = cache.entry("page", tagged(&["a"])).unwrap();
        assert_eq!(first.get(|| produce("one")).unwrap(), "one");

        let second = cache.entry("page", tagged(&["a", "b"])).unwrap();
        assert_eq!(second.get(|| produce("two")).unwrap(), "two");
        assert_eq!(second.get(|| produce("three")).unwrap(), "two");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(nlink(second.path()), 3);
    }

    #[test]
    fn test_expired_entry_regenerates() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let options = EntryOptions::new().expire(Duration::from_secs(3600));
        let entry = cache.entry("feed", options).unwrap();

        entry.get(|| cached("old")).unwrap();
        backdate(entry.path());

        assert_eq!(entry.get(|| cached("new")).unwrap(), "new");
        assert_eq!(entry.get(|| cached("newer")).unwrap(), "new");
    }

    #[test]
    fn test_expire_sets_header_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let options = EntryOptions::new().expire(Duration::from_secs(600));
        let entry = cache.entry("feed", options).unwrap();

        let before = record::now_secs();
        entry.get(|| cached("x")).unwrap();

        let file = File::open(entry.path()).unwrap();
        let record = record::read_record(&file, entry.path()).unwrap();
        assert!(record.expire_at >= before + 600);
        assert!(record.expire_at <= record::now_secs() + 600);

        let mtime = std::fs::metadata(entry.path()).unwrap().mtime();
        assert_eq!(u64::try_from(mtime).unwrap(), record.expire_at);
    }

    #[test]
    fn test_zero_expire_never_expires() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache
            .entry("forever", EntryOptions::new().expire(Duration::ZERO))
            .unwrap();
        entry.get(|| cached("x")).unwrap();

        let file = File::open(entry.path()).unwrap();
        let record = record::read_record(&file, entry.path()).unwrap();
        assert_eq!(record.expire_at, NEVER_EXPIRES);
    }

    #[test]
    fn test_huge_expire_is_clamped_to_never() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        for (key, secs) in [("max", u64::MAX), ("half", u64::MAX / 2)] {
            let entry = cache
                .entry(key, EntryOptions::new().expire(Duration::from_secs(secs)))
                .unwrap();
            assert_eq!(entry.get(|| cached("x")).unwrap(), "x");
            assert_eq!(entry.get(|| cached("y")).unwrap(), "x");

            let file = File::open(entry.path()).unwrap();
            let record = record::read_record(&file, entry.path()).unwrap();
            assert_eq!(record.expire_at, NEVER_EXPIRES);
        }
    }

    #[test]
    fn test_non_notfound_io_error_propagates() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("blocked", EntryOptions::new()).unwrap();
        // A directory where the entry file belongs
        std::fs::create_dir_all(entry.path()).unwrap();

        let calls = AtomicUsize::new(0);
        let err = entry
            .get(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                cached("never")
            })
            .unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(entry.path().is_dir());
    }

    #[test]
    fn test_uncached_result_is_not_stored() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("flaky", tagged(&["a"])).unwrap();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = entry
                .get(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Produced::Uncached("error page".to_owned()))
                })
                .unwrap();
            assert_eq!(value, "error page");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!entry.path().exists());
        assert!(!cache.tag_path("a").unwrap().exists());
    }

    #[test]
    fn test_producer_failure_leaves_nothing() {
        #[derive(Debug, thiserror::Error)]
        #[error("backend down")]
        struct BackendDown;

        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("report", tagged(&["a"])).unwrap();

        let err = entry
            .get(|| Err::<Produced<String>, _>(BackendDown))
            .unwrap_err();
        assert!(err.producer_error::<BackendDown>().is_some());
        assert!(!entry.path().exists());

        // The lock was released: the next call regenerates right away
        assert_eq!(entry.get(|| cached("ok")).unwrap(), "ok");
        let leftovers = std::fs::read_dir(tmp.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_key_mismatch_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("mine", EntryOptions::new()).unwrap();
        std::fs::create_dir_all(entry.path().parent().unwrap()).unwrap();
        std::fs::write(entry.path(), b"theirs\n4294967296\n\npayload").unwrap();

        let err = entry.get(|| cached("never")).unwrap_err();
        assert!(
            matches!(&err, CacheError::KeyMismatch { expected, found } if expected == "mine" && found == "theirs"),
            "{err:?}"
        );
    }

    #[test]
    fn test_corrupt_header_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let entry = cache.entry("home", EntryOptions::new()).unwrap();
        entry.get(|| cached("v1")).unwrap();

        std::fs::write(entry.path(), b"home\ngarb").unwrap();

        assert_eq!(entry.get(|| cached("v2")).unwrap(), "v2");
        assert_eq!(entry.get(|| cached("v3")).unwrap(), "v2");
    }

    #[test]
    fn test_undecodable_payload_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let cache = TagCache::open(tmp.path())
            .unwrap()
            .with_codec(JsonCodec::<Vec<u32>>::new());
        let entry = cache.entry("numbers", EntryOptions::new()).unwrap();
        std::fs::create_dir_all(entry.path().parent().unwrap()).unwrap();
        std::fs::write(entry.path(), b"numbers\n4294967296\n\n{broken").unwrap();

        let value = entry
            .get(|| Ok::<_, Infallible>(Produced::Cached(vec![1, 2, 3])))
            .unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(
            entry
                .get(|| Ok::<_, Infallible>(Produced::Cached(vec![])))
                .unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_stale_value_served_while_regenerating() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(string_cache(&tmp));
        let options = EntryOptions::new().expire(Duration::from_secs(60));
        cache
            .entry("slow", options.clone())
            .unwrap()
            .get(|| cached("old"))
            .unwrap();
        backdate(&cache.key_path("slow").unwrap());

        let (started_tx, started_rx) = mpsc::channel();
        let (finish_tx, finish_rx) = mpsc::channel::<()>();
        let regenerator = {
            let cache = Arc::clone(&cache);
            let options = options.clone();
            thread::spawn(move || {
                let entry = cache.entry("slow", options).unwrap();
                entry
                    .get(|| {
                        started_tx.send(()).unwrap();
                        finish_rx.recv().unwrap();
                        cached("new")
                    })
                    .unwrap()
            })
        };

        started_rx.recv().unwrap();
        // The producer above is blocked; this call must not wait for it
        let entry = cache.entry("slow", options).unwrap();
        let value = entry
            .get(|| -> std::result::Result<Produced<String>, Infallible> {
                panic!("stale reader must not regenerate")
            })
            .unwrap();
        assert_eq!(value, "old");

        finish_tx.send(()).unwrap();
        assert_eq!(regenerator.join().unwrap(), "new");
        assert_eq!(entry.get(|| cached("newest")).unwrap(), "new");
    }

    #[test]
    fn test_concurrent_first_creation_produces_once() {
        const THREADS: usize = 8;

        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(string_cache(&tmp));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let entry = cache.entry("fresh", tagged(&["t"])).unwrap();
                    barrier.wait();
                    entry
                        .get(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(100));
                            cached(&format!("value-{i}"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| v == &values[0]), "{values:?}");
        assert_eq!(nlink(&cache.key_path("fresh").unwrap()), 2);
    }

    #[test]
    fn test_regeneration_reclaims_previous_links() {
        let tmp = TempDir::new().unwrap();
        let cache = string_cache(&tmp);
        let options = tagged(&["a", "b"]).expire(Duration::from_secs(60));
        let entry = cache.entry("post", options).unwrap();
        entry.get(|| cached("v1")).unwrap();

        let old = LinkName::of(&File::open(entry.path()).unwrap()).unwrap();
        backdate(entry.path());
        entry.get(|| cached("v2")).unwrap();
        let new = LinkName::of(&File::open(entry.path()).unwrap()).unwrap();
        assert_ne!(old, new);

        for tag in ["a", "b"] {
            let bucket = cache.tag_path(tag).unwrap();
            assert!(!bucket.join(old.relative_path()).exists());
            assert!(bucket.join(new.relative_path()).exists());
        }
    }

    #[test]
    fn test_link_name_layout() {
        let name = LinkName { dev: 64769, ino: 1_234_507 };
        assert_eq!(name.relative_path(), PathBuf::from("07/64769-1234507"));
    }

    #[test]
    fn test_produced_helpers() {
        assert!(Produced::Cached(1).is_cached());
        assert!(!Produced::Uncached(1).is_cached());
        assert_eq!(Produced::Uncached("x").into_inner(), "x");
    }
}
