use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};

use super::resolver::ResolvedPayload;
use super::structures::CompressionMethod;

/// Decode a fetched payload and check it against its declared CRC32.
///
/// Stored payloads must already be exactly `uncompressed_size` bytes long;
/// deflate payloads are raw (headerless) streams. Output is capped at the
/// declared size plus one byte, so an overlong stream fails the CRC check
/// instead of growing without bound.
pub fn verify_payload(payload: &ResolvedPayload, raw: Vec<u8>) -> Result<Vec<u8>> {
    let data = match payload.compression_method {
        CompressionMethod::Stored => {
            if raw.len() as u64 != payload.uncompressed_size {
                return Err(Error::SizeMismatch {
                    name: payload.file_name.clone(),
                    what: "stored payload",
                    expected: payload.uncompressed_size,
                    actual: raw.len() as u64,
                });
            }
            raw
        }
        CompressionMethod::Deflate => {
            // The declared size is untrusted; size the hint from the input
            let hint = payload.uncompressed_size.min(raw.len() as u64 * 4);
            let mut out = Vec::with_capacity(hint as usize);
            DeflateDecoder::new(raw.as_slice())
                .take(payload.uncompressed_size + 1)
                .read_to_end(&mut out)
                .map_err(Error::Decompress)?;
            out
        }
        CompressionMethod::Unknown(method) => {
            return Err(Error::UnsupportedCompression {
                name: payload.file_name.clone(),
                method,
            });
        }
    };

    let actual = crc32fast::hash(&data);
    if actual != payload.crc32 {
        return Err(Error::Integrity {
            name: payload.file_name.clone(),
            expected: payload.crc32,
            actual,
        });
    }

    debug!(
        name = %payload.file_name,
        bytes = data.len(),
        crc32 = %format!("{actual:08x}"),
        "payload verified"
    );
    Ok(data)
}
