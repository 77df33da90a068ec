//! NARC outer header

use std::io::{Read, Seek};

use binrw::{BinRead, BinWrite};
use tracing::debug;

use crate::error::{Diagnostics, Result};
use crate::magic::{NARC_CONSTANT, NARC_MAGIC};
use crate::stream::ByteStream;

/// Fixed size of the outer header
pub const NARC_HEADER_SIZE: u16 = 16;

/// Number of sections following the header
pub const NARC_SECTION_COUNT: u16 = 3;

/// NARC outer header (16 bytes)
///
/// Field values are as read in the stream's byte order. The size, header size,
/// and section count are informational on read; they are recomputed on save.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct NarcHeader {
    /// Archive tag, `"NARC"` in either byte order
    pub magic: u32,
    /// Byte-order mark and version, `0xFEFF0001` in either byte order
    pub constant: u32,
    /// Total archive size in bytes
    pub file_size: u32,
    /// Header size (16)
    pub header_size: u16,
    /// Section count (3)
    pub section_count: u16,
}

impl NarcHeader {
    /// Header for an archive of `file_size` bytes, as written by DS tools
    pub fn new(file_size: u32) -> Self {
        Self {
            magic: u32::from_le_bytes(NARC_MAGIC.to_bytes()),
            constant: u32::from_le_bytes(NARC_CONSTANT.to_bytes()),
            file_size,
            header_size: NARC_HEADER_SIZE,
            section_count: NARC_SECTION_COUNT,
        }
    }

    /// Read the header and soft-check its tag and constant
    pub fn read<R: Read + Seek>(
        stream: &mut ByteStream<R>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let offset = stream.position()?;
        let header: Self = stream.read_record()?;
        NARC_MAGIC.check(header.magic, offset, diagnostics);
        NARC_CONSTANT.check(header.constant, offset + 4, diagnostics);
        debug!(
            "NARC header: file_size={} header_size={} sections={}",
            header.file_size, header.header_size, header.section_count
        );
        Ok(header)
    }
}
