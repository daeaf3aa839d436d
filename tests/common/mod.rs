//! Minimal ZIP writer for building nested test archives.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

pub struct Entry {
    name: String,
    method: u16,
    local_method: Option<u16>,
    data: Vec<u8>,
    crc32: u32,
    uncompressed_size: u32,
    local_compressed_size: u32,
    central_compressed_size: u32,
    local_extra: Vec<u8>,
    central_extra: Vec<u8>,
    comment: String,
}

impl Entry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self::raw(name, 0, data.to_vec(), data)
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::best());
        enc.write_all(data).unwrap();
        Self::raw(name, 8, enc.finish().unwrap(), data)
    }

    fn raw(name: &str, method: u16, stored: Vec<u8>, original: &[u8]) -> Self {
        let len = stored.len() as u32;
        Self {
            name: name.to_string(),
            method,
            local_method: None,
            data: stored,
            crc32: crc32fast::hash(original),
            uncompressed_size: original.len() as u32,
            local_compressed_size: len,
            central_compressed_size: len,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: String::new(),
        }
    }

    /// Override the method code in both headers
    pub fn method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    /// Override the method code in the local header only
    pub fn local_method(mut self, method: u16) -> Self {
        self.local_method = Some(method);
        self
    }

    pub fn crc32(mut self, crc32: u32) -> Self {
        self.crc32 = crc32;
        self
    }

    /// Override the declared uncompressed size in both headers
    pub fn uncompressed_size(mut self, size: u32) -> Self {
        self.uncompressed_size = size;
        self
    }

    /// Override the compressed size in the central directory only
    pub fn central_compressed_size(mut self, size: u32) -> Self {
        self.central_compressed_size = size;
        self
    }

    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        self.local_extra = extra.to_vec();
        self
    }

    pub fn central_extra(mut self, extra: &[u8]) -> Self {
        self.central_extra = extra.to_vec();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn u16le(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn u32le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Lay out entries, central directory and end record, with an archive comment.
pub fn zip(entries: &[Entry], comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for e in entries {
        let offset = out.len() as u32;

        out.extend_from_slice(b"PK\x03\x04");
        u16le(&mut out, 20);
        u16le(&mut out, 0);
        u16le(&mut out, e.local_method.unwrap_or(e.method));
        u16le(&mut out, 0x6000);
        u16le(&mut out, 0x5821);
        u32le(&mut out, e.crc32);
        u32le(&mut out, e.local_compressed_size);
        u32le(&mut out, e.uncompressed_size);
        u16le(&mut out, e.name.len() as u16);
        u16le(&mut out, e.local_extra.len() as u16);
        out.extend_from_slice(e.name.as_bytes());
        out.extend_from_slice(&e.local_extra);
        out.extend_from_slice(&e.data);

        central.extend_from_slice(b"PK\x01\x02");
        u16le(&mut central, 20);
        u16le(&mut central, 20);
        u16le(&mut central, 0);
        u16le(&mut central, e.method);
        u16le(&mut central, 0x6000);
        u16le(&mut central, 0x5821);
        u32le(&mut central, e.crc32);
        u32le(&mut central, e.central_compressed_size);
        u32le(&mut central, e.uncompressed_size);
        u16le(&mut central, e.name.len() as u16);
        u16le(&mut central, e.central_extra.len() as u16);
        u16le(&mut central, e.comment.len() as u16);
        u16le(&mut central, 0);
        u16le(&mut central, 0);
        u32le(&mut central, 0);
        u32le(&mut central, offset);
        central.extend_from_slice(e.name.as_bytes());
        central.extend_from_slice(&e.central_extra);
        central.extend_from_slice(e.comment.as_bytes());
    }

    let cd_offset = out.len() as u32;
    out.extend_from_slice(&central);

    out.extend_from_slice(b"PK\x05\x06");
    u16le(&mut out, 0);
    u16le(&mut out, 0);
    u16le(&mut out, entries.len() as u16);
    u16le(&mut out, entries.len() as u16);
    u32le(&mut out, central.len() as u32);
    u32le(&mut out, cd_offset);
    u16le(&mut out, comment.len() as u16);
    out.extend_from_slice(comment);

    out
}

/// Offset of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not present")
}

/// Deterministic, moderately compressible test data.
pub fn sample(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|i| {
            if (i / 512) % 2 == 0 {
                b"ANDROID!"[i % 8]
            } else {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            }
        })
        .collect()
}

/// Outer archive holding `picture_image.zip`, which holds `boot.img`.
pub fn nested(boot: Entry) -> Vec<u8> {
    let inner = zip(
        &[
            Entry::stored("readme.txt", b"not the file you want"),
            boot,
            Entry::deflated("system.img", &sample(3000)),
        ],
        b"",
    );
    zip(
        &[
            Entry::deflated("notes.txt", b"release notes"),
            Entry::stored("picture_image.zip", &inner),
            Entry::stored("radio.bin", &sample(100)),
        ],
        b"outer comment",
    )
}
