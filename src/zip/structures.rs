use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::FormatError;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, CompressionMethod::Unknown(_))
    }
}

/// Checks that `data` holds at least `needed` bytes and starts with `signature`.
fn check_record(
    data: &[u8],
    record: &'static str,
    signature: &[u8],
    needed: usize,
) -> Result<(), FormatError> {
    if data.len() < needed {
        return Err(FormatError::TruncatedRecord {
            record,
            needed,
            available: data.len(),
        });
    }
    if &data[0..4] != signature {
        return Err(FormatError::SignatureMismatch {
            record,
            found: data[0..4].to_vec(),
        });
    }
    Ok(())
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    /// Relative to the first byte of the archive this record closes.
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    pub const RECORD: &'static str = "end of central directory";

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        check_record(data, Self::RECORD, Self::SIGNATURE, Self::SIZE)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);
        Ok(Self {
            disk_number: read_u16(&mut cursor, Self::RECORD)?,
            disk_with_cd: read_u16(&mut cursor, Self::RECORD)?,
            disk_entries: read_u16(&mut cursor, Self::RECORD)?,
            total_entries: read_u16(&mut cursor, Self::RECORD)?,
            cd_size: read_u32(&mut cursor, Self::RECORD)?,
            cd_offset: read_u32(&mut cursor, Self::RECORD)?,
            comment_len: read_u16(&mut cursor, Self::RECORD)?,
        })
    }
}

/// Fixed 46-byte part of a Central Directory File Header (CDFH).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    /// Local header offset, relative to the start of the owning archive.
    pub lfh_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;
    pub const RECORD: &'static str = "central directory file header";

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        check_record(data, Self::RECORD, Self::SIGNATURE, Self::SIZE)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);
        let r = Self::RECORD;
        Ok(Self {
            version_made_by: read_u16(&mut cursor, r)?,
            version_needed: read_u16(&mut cursor, r)?,
            flags: read_u16(&mut cursor, r)?,
            compression_method: CompressionMethod::from_u16(read_u16(&mut cursor, r)?),
            last_mod_time: read_u16(&mut cursor, r)?,
            last_mod_date: read_u16(&mut cursor, r)?,
            crc32: read_u32(&mut cursor, r)?,
            compressed_size: read_u32(&mut cursor, r)?,
            uncompressed_size: read_u32(&mut cursor, r)?,
            file_name_length: read_u16(&mut cursor, r)?,
            extra_field_length: read_u16(&mut cursor, r)?,
            file_comment_length: read_u16(&mut cursor, r)?,
            disk_number_start: read_u16(&mut cursor, r)?,
            internal_attrs: read_u16(&mut cursor, r)?,
            external_attrs: read_u32(&mut cursor, r)?,
            lfh_offset: read_u32(&mut cursor, r)?,
        })
    }

    /// Length of the variable part (name, extra field and comment).
    pub fn trailer_len(&self) -> usize {
        self.file_name_length as usize
            + self.extra_field_length as usize
            + self.file_comment_length as usize
    }

    /// Length of the whole record, fixed header included.
    pub fn record_len(&self) -> usize {
        Self::SIZE + self.trailer_len()
    }
}

/// A complete central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub header: CentralDirectoryHeader,
    pub file_name: String,
    pub extra_field: Vec<u8>,
    pub file_comment: String,
}

impl CentralDirectoryEntry {
    pub fn new(
        header: CentralDirectoryHeader,
        file_name: String,
        extra_field: Vec<u8>,
        file_comment: String,
    ) -> Self {
        Self {
            header,
            file_name,
            extra_field,
            file_comment,
        }
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.header.compression_method
    }

    pub fn crc32(&self) -> u32 {
        self.header.crc32
    }

    pub fn compressed_size(&self) -> u64 {
        self.header.compressed_size as u64
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.header.uncompressed_size as u64
    }

    pub fn lfh_offset(&self) -> u64 {
        self.header.lfh_offset as u64
    }

    /// Directory entries end with '/'
    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let date = self.header.last_mod_date;
        let day = (date & 0x1F) as u8;
        let month = ((date >> 5) & 0x0F) as u8;
        let year = ((date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let time = self.header.last_mod_time;
        let second = ((time & 0x1F) * 2) as u8;
        let minute = ((time >> 5) & 0x3F) as u8;
        let hour = ((time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Local File Header (LFH) - 30 bytes, name and extra field follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;
    pub const RECORD: &'static str = "local file header";

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        check_record(data, Self::RECORD, Self::SIGNATURE, Self::SIZE)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);
        let r = Self::RECORD;
        Ok(Self {
            version_needed: read_u16(&mut cursor, r)?,
            flags: read_u16(&mut cursor, r)?,
            compression_method: CompressionMethod::from_u16(read_u16(&mut cursor, r)?),
            last_mod_time: read_u16(&mut cursor, r)?,
            last_mod_date: read_u16(&mut cursor, r)?,
            crc32: read_u32(&mut cursor, r)?,
            compressed_size: read_u32(&mut cursor, r)?,
            uncompressed_size: read_u32(&mut cursor, r)?,
            file_name_length: read_u16(&mut cursor, r)?,
            extra_field_length: read_u16(&mut cursor, r)?,
        })
    }

    /// Header length including the variable name and extra field.
    pub fn total_size(&self) -> u64 {
        Self::SIZE as u64 + self.file_name_length as u64 + self.extra_field_length as u64
    }

    /// Offset of the entry's payload, given where this header starts.
    pub fn data_offset(&self, header_offset: u64) -> u64 {
        header_offset + self.total_size()
    }
}

fn read_u16(cursor: &mut Cursor<&[u8]>, record: &'static str) -> Result<u16, FormatError> {
    let available = remaining(cursor);
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| FormatError::TruncatedRecord {
            record,
            needed: 2,
            available,
        })
}

fn read_u32(cursor: &mut Cursor<&[u8]>, record: &'static str) -> Result<u32, FormatError> {
    let available = remaining(cursor);
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| FormatError::TruncatedRecord {
            record,
            needed: 4,
            available,
        })
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor
        .get_ref()
        .len()
        .saturating_sub(cursor.position() as usize)
}
