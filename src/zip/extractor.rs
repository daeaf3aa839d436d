use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::Result;
use crate::io::RangeSource;

use super::resolver::{NestedExtractionResolver, ResolvedPayload, ResolverOptions};
use super::verifier::verify_payload;

/// Nested ZIP file extractor
///
/// Every output path goes through [`extract_to_memory`](Self::extract_to_memory)
/// first, so nothing is written unless the payload decoded and its CRC32
/// matched.
pub struct NestedExtractor<R: RangeSource> {
    resolver: NestedExtractionResolver<R>,
}

impl<R: RangeSource> NestedExtractor<R> {
    pub fn new(source: Arc<R>) -> Self {
        Self::with_options(source, ResolverOptions::default())
    }

    pub fn with_options(source: Arc<R>, options: ResolverOptions) -> Self {
        Self {
            resolver: NestedExtractionResolver::with_options(source, options),
        }
    }

    pub fn resolver(&self) -> &NestedExtractionResolver<R> {
        &self.resolver
    }

    /// Fetch, decode and verify the payload
    pub async fn extract_to_memory(&self, payload: &ResolvedPayload) -> Result<Vec<u8>> {
        let raw = self.resolver.fetch_payload(payload).await?;
        verify_payload(payload, raw)
    }

    /// Extract payload to disk
    pub async fn extract_to_file(&self, payload: &ResolvedPayload, output_path: &Path) -> Result<()> {
        let data = self.extract_to_memory(payload).await?;

        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(output_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        info!(path = %output_path.display(), bytes = data.len(), "wrote payload");
        Ok(())
    }

    /// Extract payload to stdout
    pub async fn extract_to_stdout(&self, payload: &ResolvedPayload) -> Result<()> {
        let data = self.extract_to_memory(payload).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&data).await?;
        stdout.flush().await?;

        Ok(())
    }
}
