mod http;
mod local;
mod memory;

pub use http::{HttpOptions, HttpRangeSource};
pub use local::LocalFileSource;
pub use memory::MemorySource;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Random access to a remote (or remote-like) object by byte range
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Total size of the object, as reported when the source was opened
    fn size(&self) -> u64;

    /// Fetch exactly the bytes `start..=end_inclusive`
    async fn get_range(&self, start: u64, end_inclusive: u64) -> Result<Vec<u8>>;
}

/// Reject empty, inverted or out-of-bounds ranges before any request is made.
pub(crate) fn check_range(start: u64, end_inclusive: u64, size: u64) -> Result<()> {
    if start > end_inclusive {
        bail!("invalid byte range {start}-{end_inclusive}");
    }
    if end_inclusive >= size {
        bail!("byte range {start}-{end_inclusive} exceeds object size {size}");
    }
    Ok(())
}
