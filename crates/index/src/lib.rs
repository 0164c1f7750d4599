//! # Akin Index
//!
//! Banded locality-sensitive hashing over MinHash signatures, plus the
//! key-value blob store the engine persists its state in.
//!
//! ## Core Features
//!
//! - **LSH Index**: [`LshIndex`] files each signature under one bucket per
//!   band and answers candidate queries in `O(bands)` lookups.
//! - **Parameter Optimizer**: [`LshParams::optimal`] picks the band/row split
//!   of a signature that minimises the weighted false-positive and
//!   false-negative areas for a similarity threshold.
//! - **Pluggable Backends**: storage goes through the [`StorageBackend`]
//!   trait. Out of the box it provides:
//!   - An in-memory ordered map, ideal for tests and one-shot runs.
//!   - A Redb backend for persistent on-disk storage (enabled via the
//!     `backend-redb` feature).
//! - **Compact Blobs**: [`BlobStore`] serializes values with bincode and
//!   compresses them (Zstd by default) before they reach the backend.
//!
//! ## Example Usage
//!
//! ```
//! use index::{BlobStore, LshIndex, ErrorWeights, StoreConfig};
//!
//! let mut lsh = LshIndex::with_threshold(0.5, 8, ErrorWeights::default()).unwrap();
//! lsh.insert(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
//! lsh.insert(1, &[1, 2, 3, 4, 0, 0, 0, 0]).unwrap();
//! assert_eq!(lsh.query(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(), vec![0, 1]);
//!
//! let store = BlobStore::new(StoreConfig::default()).unwrap();
//! store.put("groups/customers", &lsh).unwrap();
//! let restored: LshIndex = store.get("groups/customers").unwrap().unwrap();
//! assert_eq!(restored, lsh);
//! ```

mod backend;
pub mod lsh;
pub mod params;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, StorageBackend};
pub use lsh::LshIndex;
pub use params::{ErrorWeights, LshParams};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Compression codec options for stored blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    /// Store blobs as encoded.
    None,
    #[default]
    Zstd,
}

/// Blob compression settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level, 1..=22.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening a [`BlobStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend storage configuration (in-memory or Redb).
    pub backend: BackendConfig,
    /// Compression settings for stored blobs.
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// Custom error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("signature length mismatch: index expects {expected}, got {got}")]
    SignatureLength { expected: usize, got: usize },
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Typed blob storage on top of a [`StorageBackend`].
pub struct BlobStore {
    backend: Box<dyn StorageBackend>,
    compression: CompressionConfig,
}

impl BlobStore {
    /// Open a store, building the backend from the config.
    pub fn new(cfg: StoreConfig) -> Result<Self, IndexError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg.compression, backend))
    }

    /// Build a store around a custom backend.
    pub fn with_backend(compression: CompressionConfig, backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            compression,
        }
    }

    /// Encode and store `value` under `key`, replacing any previous blob.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), IndexError> {
        let payload = self.encode(value)?;
        self.backend.put(key, &payload)
    }

    /// Store many values in one backend batch.
    pub fn put_many<T: Serialize>(&self, entries: &[(String, T)]) -> Result<(), IndexError> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            encoded.push((key.clone(), self.encode(value)?));
        }
        self.backend.batch_put(encoded)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, IndexError> {
        match self.backend.get(key)? {
            Some(data) => Ok(Some(self.decode(&data)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.backend.delete(key)
    }

    pub fn delete_prefix(&self, prefix: &str) -> Result<(), IndexError> {
        self.backend.delete_prefix(prefix)
    }

    /// Decode every blob stored under `prefix`, in key order.
    pub fn scan<T: DeserializeOwned>(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, T) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.backend.scan_prefix(prefix, &mut |key, data| {
            let value = self.decode(data)?;
            visitor(key, value)
        })
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(value, standard())?;
        self.compression.compress(&encoded)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, IndexError> {
        let decompressed = self.compression.decompress(data)?;
        let (value, _) = decode_from_slice(&decompressed, standard())?;
        Ok(value)
    }
}
