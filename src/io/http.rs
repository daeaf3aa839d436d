use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{RangeSource, check_range};
use anyhow::{Context, Result, anyhow, bail};

/// Transport settings for [`HttpRangeSource`]
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries on timeout or connection errors; 0 disables retrying
    pub max_retry: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retry: 10,
        }
    }
}

/// HTTP Range source for remote archives
pub struct HttpRangeSource {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeSource {
    /// Create a new HTTP Range source with default options
    pub async fn new(url: String) -> Result<Self> {
        Self::with_options(url, HttpOptions::default()).await
    }

    /// Create a new HTTP Range source
    ///
    /// This will send a HEAD request to get the object size
    pub async fn with_options(url: String, options: HttpOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;

        let resp = client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("HEAD {url}"))?;

        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        // Range support is only proven by the first 206; many servers omit this header
        let accept_ranges = resp
            .headers()
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            warn!(%accept_ranges, "server does not advertise byte ranges");
        }

        let size = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        debug!(%url, %size, "opened remote object");
        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: options.max_retry,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn get_range(&self, start: u64, end_inclusive: u64) -> Result<Vec<u8>> {
        check_range(start, end_inclusive, self.size)?;

        let expected_size = (end_inclusive - start + 1) as usize;
        let mut buf = Vec::with_capacity(expected_size);
        let mut retry_count = 0;

        // A server may return fewer bytes than asked; keep requesting the rest
        while buf.len() < expected_size {
            let current_start = start + buf.len() as u64;
            let range = format!("bytes={}-{}", current_start, end_inclusive);

            let result = self
                .client
                .get(&self.url)
                .header(header::RANGE, &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!("Range request {range} failed with status: {}", resp.status());
                    }

                    let (first, _, total) = resp
                        .headers()
                        .get(header::CONTENT_RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_content_range)
                        .ok_or_else(|| {
                            anyhow!("Range request {range} returned no valid Content-Range")
                        })?;
                    if first != current_start {
                        bail!("Range request {range} answered from byte {first}");
                    }
                    if let Some(total) = total
                        && total != self.size
                    {
                        bail!(
                            "Range request {range} reports object size {total}, expected {}",
                            self.size
                        );
                    }

                    let bytes = resp.bytes().await?;
                    let chunk_len = bytes.len().min(expected_size - buf.len());
                    if chunk_len == 0 {
                        bail!("Range request {range} returned an empty body");
                    }
                    buf.extend_from_slice(&bytes[..chunk_len]);

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count > self.max_retry {
                        return Err(anyhow::Error::new(e).context("Max retries exceeded"));
                    }
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(buf)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Parse a `Content-Range` value of the form `bytes first-last/total`,
/// where `total` may be `*`
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let (span, total) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    let (first, last) = span.split_once('-')?;
    let (first, last): (u64, u64) = (first.trim().parse().ok()?, last.trim().parse().ok()?);
    if last < first {
        return None;
    }
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some((first, last, total))
}
