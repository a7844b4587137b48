//! Digest functions used for path sharding.
//!
//! The digest only spreads names across shard directories; it is not used for
//! any security decision. [`Sha256Hasher`] is the default.

use md5::{Digest as _, Md5};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// A digest function mapping bytes to a fixed-length hash.
///
/// Digests must be at least 2 bytes long; the first two bytes name the shard
/// directories.
pub trait KeyHasher: Send + Sync {
    /// Hash `data` into a fixed-length digest.
    fn digest(&self, data: &[u8]) -> Vec<u8>;

    /// Hex-encoded digest of `data`.
    fn hex_digest(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }
}

/// SHA-256 digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl KeyHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }
}

/// MD5 digest. Shorter names, same layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Hasher;

impl KeyHasher for Md5Hasher {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }
}

/// Built-in digest selection, as named in configuration files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// [`Sha256Hasher`].
    #[default]
    Sha256,
    /// [`Md5Hasher`].
    Md5,
}

impl HashAlgorithm {
    /// Instantiate the selected hasher.
    #[must_use]
    pub fn hasher(self) -> Box<dyn KeyHasher> {
        match self {
            Self::Sha256 => Box::new(Sha256Hasher),
            Self::Md5 => Box::new(Md5Hasher),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            other => Err(format!("unknown hash algorithm {other:?} (expected sha256 or md5)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Sha256Hasher.hex_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_md5_known_vector() {
        assert_eq!(
            Md5Hasher.hex_digest(b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_hash_algorithm_from_str() {
        assert_eq!("sha256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("MD5".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Md5));
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_hash_algorithm_hasher_lengths() {
        assert_eq!(HashAlgorithm::Sha256.hasher().digest(b"x").len(), 32);
        assert_eq!(HashAlgorithm::Md5.hasher().digest(b"x").len(), 16);
    }
}
