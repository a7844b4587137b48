//! Filesystem helpers that create missing parent directories on demand.
//!
//! Each helper first attempts the plain operation and only falls back to
//! `create_dir_all` on `NotFound`, so the common case costs one syscall.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Retry `op` once after creating the parent of `target` if it failed with
/// `NotFound`.
fn with_parent<T>(target: &Path, op: impl Fn() -> io::Result<T>) -> io::Result<T> {
    match op() {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            ensure_parent(target)?;
            op()
        }
        result => result,
    }
}

/// Open `path` read-write, creating it and its parent directories if absent.
///
/// The file is never truncated.
pub(crate) fn open_or_create(path: &Path) -> io::Result<File> {
    with_parent(path, || {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
    })
}

/// Hardlink `src` to `dst`, creating the parent directories of `dst`.
pub(crate) fn link_file(src: &Path, dst: &Path) -> io::Result<()> {
    with_parent(dst, || fs::hard_link(src, dst))
}

/// Atomically rename `src` onto `dst`, creating the parent directories of
/// `dst`.
pub(crate) fn rename_file(src: &Path, dst: &Path) -> io::Result<()> {
    with_parent(dst, || fs::rename(src, dst))
}

/// Remove a file, treating `NotFound` as success.
///
/// Returns whether a file was removed.
pub(crate) fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Open an existing file for reading, mapping `NotFound` to `None`.
pub(crate) fn open_existing(path: &Path) -> io::Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
