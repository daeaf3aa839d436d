//! Error types for nested archive resolution and extraction.

use thiserror::Error;

/// Convenience return type.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or unsupported ZIP structure.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The record magic does not occur anywhere in the scanned window.
    #[error("{record} signature not found")]
    SignatureNotFound { record: &'static str },

    /// A record starts with the wrong magic.
    #[error("invalid {record} signature: {found:02x?}")]
    SignatureMismatch { record: &'static str, found: Vec<u8> },

    /// A record is shorter than its declared or fixed size.
    #[error("truncated {record}: needed {needed} bytes, got {available}")]
    TruncatedRecord {
        record: &'static str,
        needed: usize,
        available: usize,
    },

    /// A declared region lies outside the bytes that contain it.
    #[error("{what} out of bounds: offset {offset} + length {len} exceeds {limit}")]
    EntryOutOfBounds {
        what: &'static str,
        offset: u64,
        len: u64,
        limit: u64,
    },
}

/// Combined error type for resolution, verification and extraction.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// No central directory entry satisfied the lookup.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Two records (or a record and the data) disagree on a size, as with
    /// entries whose sizes were deferred to a data descriptor.
    #[error("{what} size mismatch for {name}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        name: String,
        what: &'static str,
        expected: u64,
        actual: u64,
    },

    /// The local header names a different compression method than the
    /// central directory.
    #[error("compression method mismatch for {name}: central directory says {central}, local header says {local}")]
    MethodMismatch { name: String, central: u16, local: u16 },

    #[error("unsupported compression method {method} for {name}")]
    UnsupportedCompression { name: String, method: u16 },

    /// The decoded bytes do not hash to the declared CRC32.
    #[error("CRC32 mismatch for {name}: expected {expected:08x}, computed {actual:08x}")]
    Integrity {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("deflate stream is corrupt: {0}")]
    Decompress(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Range source failure, passed through as reported.
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}
