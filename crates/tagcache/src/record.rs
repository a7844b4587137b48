//! On-disk entry record format.
//!
//! ```text
//! blog-home          <- key
//! 1492334827         <- expire time (epoch seconds)
//! blog:home          <- tags joined by ':', empty line if untagged
//! <payload bytes>
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CacheError, Result};

/// Expire time written for entries that never expire (2106-02-07).
pub const NEVER_EXPIRES: u64 = 1 << 32;

const TAG_SEPARATOR: char = ':';

/// A parsed entry file.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Record {
    pub key: String,
    pub expire_at: u64,
    pub tags: BTreeSet<String>,
    pub payload: Vec<u8>,
}

/// Current wall-clock time in whole epoch seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Whether an entry expiring at `expire_at` is still live.
pub(crate) fn is_live(expire_at: u64) -> bool {
    expire_at == NEVER_EXPIRES || expire_at > now_secs()
}

/// Serialize the three header lines.
pub(crate) fn encode_header(key: &str, expire_at: u64, tags: &BTreeSet<String>) -> Vec<u8> {
    let joined = tags
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&TAG_SEPARATOR.to_string());
    format!("{key}\n{expire_at}\n{joined}\n").into_bytes()
}

/// Read and parse a whole entry file from its start.
///
/// Malformed headers yield [`CacheError::CorruptRecord`]; read failures yield
/// [`CacheError::Io`].
pub(crate) fn read_record(file: &File, path: &Path) -> Result<Record> {
    let mut reader = BufReader::new(file);

    let key = read_line(&mut reader, path, "key")?;
    let expire_line = read_line(&mut reader, path, "expire time")?;
    let expire_at = expire_line.parse::<u64>().map_err(|_| CacheError::CorruptRecord {
        path: path.to_path_buf(),
        reason: format!("non-numeric expire time {expire_line:?}"),
    })?;
    let tags = read_line(&mut reader, path, "tags")?
        .split(TAG_SEPARATOR)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect();

    let mut payload = Vec::new();
    reader
        .read_to_end(&mut payload)
        .map_err(|e| CacheError::io("read entry", path, e))?;

    Ok(Record {
        key,
        expire_at,
        tags,
        payload,
    })
}

fn read_line(reader: &mut impl BufRead, path: &Path, field: &str) -> Result<String> {
    let corrupt = |reason: String| CacheError::CorruptRecord {
        path: path.to_path_buf(),
        reason,
    };

    let mut buf = Vec::new();
    reader
        .read_until(b'\n', &mut buf)
        .map_err(|e| CacheError::io("read entry", path, e))?;
    if buf.pop() != Some(b'\n') {
        return Err(corrupt(format!("truncated header, missing {field} line")));
    }
    String::from_utf8(buf).map_err(|_| corrupt(format!("{field} line is not UTF-8")))
}
