//! # nestzip
//!
//! Extract one file from a ZIP archive that is itself stored inside another
//! ZIP archive, without downloading either of them.
//!
//! Only the outer archive's tail, both central directories, two local file
//! headers and the target payload are fetched, each with a few HTTP Range
//! requests at most. Offsets inside the inner archive are translated into the
//! outer object's coordinates, and the payload is decompressed and checked
//! against its CRC32 before anything is written.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nestzip::{HttpRangeSource, NestedExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Arc::new(HttpRangeSource::new("https://example.com/factory.zip".to_string()).await?);
//!     let extractor = NestedExtractor::new(source);
//!
//!     let payload = extractor
//!         .resolver()
//!         .resolve(|name| name.ends_with("image.zip"), "boot.img")
//!         .await?;
//!     let data = extractor.extract_to_memory(&payload).await?;
//!     println!("{} bytes from {}", data.len(), payload.intermediate_name);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, FormatError, Result};
pub use io::{HttpRangeSource, LocalFileSource, MemorySource, RangeSource};
pub use zip::{NestedExtractionResolver, NestedExtractor, ResolvedPayload, ResolverOptions};
