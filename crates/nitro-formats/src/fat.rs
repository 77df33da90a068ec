//! File allocation table codec
//!
//! The allocation table is an ordered list of `(start, end)` byte ranges into
//! a file-data region; the position of an entry is the file id. NARC archives
//! wrap it in a `BTAF` section with a size and count header, while ROM images
//! store it bare and give its offset and size elsewhere.

use std::io::{Cursor, Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Diagnostics, NitroError, Result};
use crate::magic::BTAF_MAGIC;
use crate::stream::ByteStream;

/// BTAF section header size (magic + size + count)
pub const FATB_HEADER_SIZE: u32 = 12;

/// Size of one allocation table entry
pub const FAT_ENTRY_SIZE: u32 = 8;

/// Byte range `[start, end)` into the file-data region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, BinRead, BinWrite, Serialize)]
pub struct Extent {
    /// Offset of the first byte
    pub start: u32,
    /// Offset one past the last byte
    pub end: u32,
}

impl Extent {
    /// Create an extent
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Length in bytes (zero for inverted ranges)
    pub const fn size(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether `end >= start`
    pub const fn is_valid(&self) -> bool {
        self.end >= self.start
    }
}

/// Expected BTAF section size for `count` entries
pub fn section_size(count: u32) -> u64 {
    u64::from(FATB_HEADER_SIZE) + u64::from(count) * u64::from(FAT_ENTRY_SIZE)
}

/// Read a `BTAF` section at the stream's current position
///
/// A tag matching neither byte order is recorded as a soft fault. A declared
/// size that disagrees with the entry count aborts the read.
pub fn read_section<R: Read + Seek>(
    stream: &mut ByteStream<R>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Extent>> {
    let magic_offset = stream.position()?;
    let magic = stream.read_u32()?;
    BTAF_MAGIC.check(magic, magic_offset, diagnostics);

    let size_offset = stream.position()?;
    let declared = stream.read_u32()?;
    let count = stream.read_u32()?;

    let expected = section_size(count);
    if u64::from(declared) != expected {
        return Err(NitroError::SizeIntegrity {
            offset: size_offset,
            declared,
            expected,
            count,
        });
    }

    debug!("BTAF at {magic_offset:#x}: {count} entries");
    read_entries(stream, count as usize)
}

/// Read a bare allocation table of `fat_size / 8` entries at `fat_offset`
pub fn read_raw<R: Read + Seek>(
    stream: &mut ByteStream<R>,
    fat_offset: u64,
    fat_size: u32,
) -> Result<Vec<Extent>> {
    stream.seek(fat_offset)?;
    let count = (fat_size / FAT_ENTRY_SIZE) as usize;
    debug!("FAT at {fat_offset:#x}: {count} entries");
    read_entries(stream, count)
}

fn read_entries<R: Read + Seek>(stream: &mut ByteStream<R>, count: usize) -> Result<Vec<Extent>> {
    // Counts come from untrusted headers; let the stream run dry instead of
    // reserving for them up front.
    let mut extents = Vec::with_capacity(count.min(4096));
    for index in 0..count {
        let extent: Extent = stream.read_record()?;
        trace!(index, start = extent.start, end = extent.end, "FAT entry");
        extents.push(extent);
    }
    Ok(extents)
}

/// Lay out blobs of the given lengths back to back starting at zero
pub fn extents_from_lengths<I>(lengths: I) -> Result<Vec<Extent>>
where
    I: IntoIterator<Item = usize>,
{
    let mut offset = 0u32;
    lengths
        .into_iter()
        .map(|len| {
            let start = offset;
            let len = u32::try_from(len).map_err(|_| NitroError::SizeOverflow {
                what: "file length",
            })?;
            offset = offset
                .checked_add(len)
                .ok_or(NitroError::SizeOverflow { what: "file image" })?;
            Ok(Extent::new(start, offset))
        })
        .collect()
}

/// Write a `BTAF` section for the given extents
pub fn write_section<W: Write + Seek>(
    stream: &mut ByteStream<W>,
    extents: &[Extent],
) -> Result<()> {
    let count = u32::try_from(extents.len()).map_err(|_| NitroError::SizeOverflow {
        what: "allocation table count",
    })?;
    let size = u32::try_from(section_size(count)).map_err(|_| NitroError::SizeOverflow {
        what: "allocation table",
    })?;

    stream.write_bytes(&BTAF_MAGIC.to_bytes())?;
    stream.write_u32(size)?;
    stream.write_u32(count)?;
    for extent in extents {
        stream.write_record(extent)?;
    }
    Ok(())
}

/// Encode extents as a bare little-endian allocation table
pub fn encode_raw(extents: &[Extent]) -> Result<Vec<u8>> {
    let mut stream = ByteStream::new(Cursor::new(Vec::with_capacity(
        extents.len() * FAT_ENTRY_SIZE as usize,
    )));
    for extent in extents {
        stream.write_record(extent)?;
    }
    Ok(stream.into_inner().into_inner())
}
