//! Nested archive resolution.
//!
//! Walks an outer archive to the entry holding an inner archive, then walks
//! the inner archive to a leaf entry, using nothing but byte-range reads
//! against the outer object.
//!
//! ## Coordinate spaces
//!
//! Offsets stored in the inner archive's EOCD and central directory are
//! relative to the inner archive's first byte. That byte sits at
//! `base = intermediate.lfh_offset + local header length` in the outer
//! object, so every inner offset is translated by `base` before it is
//! requested.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, FormatError, Result};
use crate::io::RangeSource;

use super::parser;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
const MAX_COMMENT_SIZE: u64 = 65535;

/// Bounds for the trailing windows scanned for an EOCD record.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// First window fetched from the end of the outer object
    pub eocd_window: u64,
    /// First window fetched from the end of the inner archive
    pub inner_eocd_window: u64,
    /// Windows double up to this size before the search gives up
    pub max_eocd_window: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            eocd_window: 64 * 1024,
            inner_eocd_window: 64 * 1024,
            max_eocd_window: MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64,
        }
    }
}

/// The entry of the outer archive whose payload is the inner archive.
#[derive(Debug, Clone)]
pub struct IntermediateArchive {
    pub entry: CentralDirectoryEntry,
    /// Absolute offset of the inner archive's first byte
    pub base: u64,
    /// Absolute offset one past the inner archive's last byte
    pub end: u64,
}

/// Location and checksum data for a leaf payload, in outer-object coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayload {
    pub intermediate_name: String,
    pub file_name: String,
    pub start: u64,
    /// Exclusive
    pub end: u64,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
}

impl ResolvedPayload {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Where the leaf lands on disk: the intermediate entry's parent
    /// directory joined with the leaf's own name.
    ///
    /// Only normal path components are kept, so archive names cannot
    /// climb out of the output directory.
    pub fn output_path(&self) -> PathBuf {
        let parent = Path::new(&self.intermediate_name)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        parent
            .join(&self.file_name)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect()
    }
}

/// Resolves a leaf file inside an archive nested in a ranged object.
pub struct NestedExtractionResolver<R: RangeSource> {
    source: Arc<R>,
    options: ResolverOptions,
}

impl<R: RangeSource> NestedExtractionResolver<R> {
    pub fn new(source: Arc<R>) -> Self {
        Self::with_options(source, ResolverOptions::default())
    }

    pub fn with_options(source: Arc<R>, options: ResolverOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &Arc<R> {
        &self.source
    }

    /// Resolve `file_name` inside the first outer entry accepted by `predicate`.
    pub async fn resolve<P>(&self, predicate: P, file_name: &str) -> Result<ResolvedPayload>
    where
        P: Fn(&str) -> bool,
    {
        let intermediate = self.locate_intermediate(predicate).await?;
        self.resolve_leaf(&intermediate, file_name).await
    }

    /// Find the outer entry holding the inner archive and compute its bounds.
    ///
    /// The first match in central directory order wins.
    #[instrument(level = "debug", skip_all)]
    pub async fn locate_intermediate<P>(&self, predicate: P) -> Result<IntermediateArchive>
    where
        P: Fn(&str) -> bool,
    {
        let size = self.source.size();
        let eocd = self.read_eocd(0, size, self.options.eocd_window).await?;
        let entries = self.read_central_directory(0, &eocd, size).await?;

        let mut candidates = entries.into_iter().filter(|e| predicate(e.file_name.as_str()));
        let entry = candidates
            .next()
            .ok_or_else(|| Error::not_found("no entry in the outer archive matches the pattern"))?;
        let others: Vec<String> = candidates.map(|e| e.file_name).collect();
        if !others.is_empty() {
            warn!(chosen = %entry.file_name, ?others, "several entries match, using the first");
        }
        info!(name = %entry.file_name, offset = entry.lfh_offset(), "found intermediate archive");

        // A compressed inner archive cannot be addressed by range
        if entry.compression_method() != CompressionMethod::Stored {
            return Err(Error::UnsupportedCompression {
                name: entry.file_name.clone(),
                method: entry.compression_method().as_u16(),
            });
        }

        let base = self.read_local_header(0, &entry, size).await?;
        let end = base + entry.compressed_size();
        debug!(%base, %end, "inner archive bounds");

        Ok(IntermediateArchive { entry, base, end })
    }

    /// List the entries of the inner archive.
    #[instrument(level = "debug", skip_all, fields(archive = %inner.entry.file_name))]
    pub async fn list_inner(&self, inner: &IntermediateArchive) -> Result<Vec<CentralDirectoryEntry>> {
        let eocd = self
            .read_eocd(inner.base, inner.end, self.options.inner_eocd_window)
            .await?;
        debug!(?eocd, "inner end of central directory");
        self.read_central_directory(inner.base, &eocd, inner.end)
            .await
    }

    /// Compute the payload range of `file_name` inside the inner archive.
    pub async fn resolve_leaf(
        &self,
        inner: &IntermediateArchive,
        file_name: &str,
    ) -> Result<ResolvedPayload> {
        let leaf = self
            .list_inner(inner)
            .await?
            .into_iter()
            .find(|e| e.file_name == file_name)
            .ok_or_else(|| {
                Error::not_found(format!("{file_name} in {}", inner.entry.file_name))
            })?;
        info!(
            name = %leaf.file_name,
            crc32 = %format!("{:08x}", leaf.crc32()),
            compressed_size = leaf.compressed_size(),
            uncompressed_size = leaf.uncompressed_size(),
            "found leaf entry"
        );

        let method = leaf.compression_method();
        if !method.is_supported() {
            return Err(Error::UnsupportedCompression {
                name: leaf.file_name.clone(),
                method: method.as_u16(),
            });
        }
        if method == CompressionMethod::Stored && leaf.compressed_size() != leaf.uncompressed_size()
        {
            return Err(Error::SizeMismatch {
                name: leaf.file_name.clone(),
                what: "stored entry",
                expected: leaf.uncompressed_size(),
                actual: leaf.compressed_size(),
            });
        }

        let start = self.read_local_header(inner.base, &leaf, inner.end).await?;
        let end = start + leaf.compressed_size();
        debug!(%start, %end, "leaf payload range");

        Ok(ResolvedPayload {
            intermediate_name: inner.entry.file_name.clone(),
            file_name: leaf.file_name.clone(),
            start,
            end,
            compression_method: method,
            compressed_size: leaf.compressed_size(),
            uncompressed_size: leaf.uncompressed_size(),
            crc32: leaf.crc32(),
        })
    }

    /// Fetch the raw (still compressed) payload bytes.
    pub async fn fetch_payload(&self, payload: &ResolvedPayload) -> Result<Vec<u8>> {
        self.fetch(payload.start, payload.len()).await
    }

    async fn fetch(&self, start: u64, len: u64) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        self.source
            .get_range(start, start + len - 1)
            .await
            .map_err(Error::Transport)
    }

    /// Find the EOCD of the archive occupying `floor..end`.
    ///
    /// Scans a trailing window of `initial` bytes; when the magic is absent
    /// the window doubles (extending the buffer backwards) up to the
    /// configured maximum or the start of the archive.
    async fn read_eocd(&self, floor: u64, end: u64, initial: u64) -> Result<EndOfCentralDirectory> {
        let available = end - floor;
        let mut window = initial
            .max(EndOfCentralDirectory::SIZE as u64)
            .min(available);
        let mut start = end - window;
        let mut buf = self.fetch(start, window).await?;

        loop {
            let can_grow = window < available && window < self.options.max_eocd_window;
            match parser::find_eocd(&buf) {
                Ok((eocd, at)) => {
                    debug!(
                        offset = start + at as u64,
                        entries = eocd.total_entries,
                        "found end of central directory"
                    );
                    return Ok(eocd);
                }
                Err(FormatError::SignatureNotFound { .. }) if can_grow => {
                    let next = (window * 2)
                        .min(self.options.max_eocd_window)
                        .min(available);
                    debug!(%window, %next, "end of central directory not in window, widening");

                    let next_start = end - next;
                    let mut grown = self.fetch(next_start, start - next_start).await?;
                    grown.extend_from_slice(&buf);
                    buf = grown;
                    start = next_start;
                    window = next;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetch and parse a central directory whose offsets are relative to `base`.
    async fn read_central_directory(
        &self,
        base: u64,
        eocd: &EndOfCentralDirectory,
        limit: u64,
    ) -> Result<Vec<CentralDirectoryEntry>> {
        let offset = base + eocd.cd_offset as u64;
        let len = eocd.cd_size as u64;
        check_bounds("central directory", offset, len, limit)?;

        let data = self.fetch(offset, len).await?;
        let entries = parser::parse_central_directory(&data)?;
        if entries.len() != eocd.total_entries as usize {
            warn!(
                declared = eocd.total_entries,
                parsed = entries.len(),
                "central directory entry count differs from the end record"
            );
        }

        Ok(entries)
    }

    /// Read an entry's local header and return the absolute start of its data.
    ///
    /// The local header must agree with the central directory on the
    /// compression method and compressed size; sizes deferred to a data
    /// descriptor are not supported.
    async fn read_local_header(
        &self,
        base: u64,
        entry: &CentralDirectoryEntry,
        limit: u64,
    ) -> Result<u64> {
        let offset = base + entry.lfh_offset();
        check_bounds(
            LocalFileHeader::RECORD,
            offset,
            LocalFileHeader::SIZE as u64,
            limit,
        )?;

        let data = self.fetch(offset, LocalFileHeader::SIZE as u64).await?;
        let header = parser::parse_local_file_header(&data)?;

        if header.compression_method != entry.compression_method() {
            return Err(Error::MethodMismatch {
                name: entry.file_name.clone(),
                central: entry.compression_method().as_u16(),
                local: header.compression_method.as_u16(),
            });
        }

        if header.compressed_size as u64 != entry.compressed_size() {
            return Err(Error::SizeMismatch {
                name: entry.file_name.clone(),
                what: "local header compressed",
                expected: entry.compressed_size(),
                actual: header.compressed_size as u64,
            });
        }

        let data_start = header.data_offset(offset);
        check_bounds("entry data", data_start, entry.compressed_size(), limit)?;
        Ok(data_start)
    }
}

fn check_bounds(what: &'static str, offset: u64, len: u64, limit: u64) -> Result<()> {
    if offset + len > limit {
        return Err(FormatError::EntryOutOfBounds {
            what,
            offset,
            len,
            limit,
        }
        .into());
    }
    Ok(())
}
