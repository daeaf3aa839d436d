//! Low-level ZIP structure parser.
//!
//! Every function here works on bytes that were already fetched; none of
//! them perform I/O. They fail fast on malformed input and never read past
//! the slice they are given.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) near the archive's end
//! 2. Read the Central Directory to get metadata for all files
//! 3. For extraction, read each file's Local File Header to find its data

use tracing::trace;

use crate::error::FormatError;

use super::structures::*;

/// Find the offset of the last EOCD signature in `buffer`.
///
/// The last occurrence wins: an archive comment is free-form and may contain
/// the magic bytes, but it always follows the real record.
pub fn locate_eocd(buffer: &[u8]) -> Result<usize, FormatError> {
    buffer
        .windows(EndOfCentralDirectory::SIGNATURE.len())
        .rposition(|w| w == EndOfCentralDirectory::SIGNATURE)
        .ok_or(FormatError::SignatureNotFound {
            record: EndOfCentralDirectory::RECORD,
        })
}

/// Decode an EOCD record from the start of `bytes`.
pub fn parse_eocd(bytes: &[u8]) -> Result<EndOfCentralDirectory, FormatError> {
    EndOfCentralDirectory::from_bytes(bytes)
}

/// Locate and decode the EOCD in a trailing window of an archive.
///
/// Returns the record and its offset within `buffer`.
pub fn find_eocd(buffer: &[u8]) -> Result<(EndOfCentralDirectory, usize), FormatError> {
    let offset = locate_eocd(buffer)?;
    let eocd = parse_eocd(&buffer[offset..])?;
    Ok((eocd, offset))
}

/// Parse a complete central directory into its entries, in file order.
///
/// Iteration starts at offset 0 and stops exactly at the end of `buffer`;
/// a record whose declared lengths run past the end is reported as truncated.
pub fn parse_central_directory(buffer: &[u8]) -> Result<Vec<CentralDirectoryEntry>, FormatError> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < buffer.len() {
        let rest = &buffer[offset..];
        let signature_len = CentralDirectoryHeader::SIGNATURE.len();

        // Check the signature before anything else so a corrupt entry is
        // reported as such, not as a short read.
        if rest.len() < signature_len {
            return Err(FormatError::TruncatedRecord {
                record: CentralDirectoryHeader::RECORD,
                needed: signature_len,
                available: rest.len(),
            });
        }
        if &rest[..signature_len] != CentralDirectoryHeader::SIGNATURE {
            return Err(FormatError::SignatureMismatch {
                record: CentralDirectoryHeader::RECORD,
                found: rest[..signature_len].to_vec(),
            });
        }

        let header = CentralDirectoryHeader::from_bytes(rest)?;
        let record_len = header.record_len();
        if rest.len() < record_len {
            return Err(FormatError::TruncatedRecord {
                record: CentralDirectoryHeader::RECORD,
                needed: record_len,
                available: rest.len(),
            });
        }

        let name_end = CentralDirectoryHeader::SIZE + header.file_name_length as usize;
        let extra_end = name_end + header.extra_field_length as usize;

        // Lossy decoding keeps entries with legacy (non UTF-8) names listable
        let file_name =
            String::from_utf8_lossy(&rest[CentralDirectoryHeader::SIZE..name_end]).into_owned();
        let extra_field = rest[name_end..extra_end].to_vec();
        let file_comment = String::from_utf8_lossy(&rest[extra_end..record_len]).into_owned();

        trace!(%offset, name = %file_name, "parsed central directory entry");
        entries.push(CentralDirectoryEntry::new(
            header,
            file_name,
            extra_field,
            file_comment,
        ));
        offset += record_len;
    }

    Ok(entries)
}

/// Decode the fixed 30-byte part of a local file header.
///
/// The name and extra field are not read; only their lengths are needed to
/// find where the payload starts.
pub fn parse_local_file_header(bytes: &[u8]) -> Result<LocalFileHeader, FormatError> {
    LocalFileHeader::from_bytes(bytes)
}
