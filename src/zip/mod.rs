//! ZIP structure parsing and nested extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP records (EOCD, central directory entries, local headers)
//! - [`parser`]: pure decoding of those records from fetched bytes
//! - [`resolver`]: walks an outer archive into an inner one by range reads
//! - [`verifier`]: decompression and CRC32 check of a fetched payload
//! - [`extractor`]: resolve, verify, then write
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! An inner archive stored (uncompressed) as an entry of an outer one keeps
//! the same layout, shifted by the position of that entry's data.
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only
//! - No ZIP64, encryption, multi-disk archives or data descriptors
//! - The inner archive must itself be stored in the outer archive

mod extractor;
pub mod parser;
mod resolver;
mod structures;
mod verifier;

pub use extractor::NestedExtractor;
pub use resolver::{IntermediateArchive, NestedExtractionResolver, ResolvedPayload, ResolverOptions};
pub use structures::*;
pub use verifier::verify_payload;
