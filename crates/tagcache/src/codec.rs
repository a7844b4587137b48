//! Payload codecs.
//!
//! A [`Codec`] turns the producer's value into the bytes stored after the
//! record header, and back. Three codecs are provided:
//!
//! - [`RawCodec`]: `Vec<u8>` stored as-is
//! - [`StringCodec`]: UTF-8 strings
//! - [`JsonCodec`]: any serde type, stored as JSON
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tagcache::{Codec, JsonCodec};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Page { title: String }
//!
//! let codec = JsonCodec::<Page>::new();
//! let bytes = codec.encode(&Page { title: "Home".into() }).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), Page { title: "Home".into() });
//! ```

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Encodes values to bytes and decodes them back.
///
/// Implementations must be deterministic and round-trip exactly for every
/// value the producer can return.
pub trait Codec: Send + Sync {
    /// The value type this codec handles.
    type Value;

    /// Encode a value into payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the value cannot be represented.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Decode payload bytes into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the bytes are not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

/// Identity codec for raw bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// JSON codec for serde types.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a JSON codec for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
