//! Flat filename table (`BTNF` section)
//!
//! NARC archives store their filename table as a run of 8-byte records, each
//! optionally followed by a length-prefixed name. Only the first record's start
//! offset is used when loading (it locates the file data); deeper nesting is
//! not reconstructed from this table.

use std::io::{Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Diagnostics, NitroError, Result};
use crate::magic::BTNF_MAGIC;
use crate::stream::{ByteStream, encode_name};

/// BTNF section header size (magic + size)
pub const FNTB_HEADER_SIZE: u32 = 8;

/// Longest name a 1-byte length prefix can describe
pub const MAX_FLAT_NAME_LEN: usize = u8::MAX as usize;

/// One record of the flat filename table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatNameEntry {
    /// Offset of this directory's subtable; for the first entry, also the
    /// distance from the end of the GMIF tag to the first file byte
    pub start_offset: u32,
    /// Id of the first file in this directory
    pub first_file_pos: u16,
    /// Parent directory id (directory count for the root)
    pub parent_dir: u16,
    /// Name, present when bytes remained in the section after the record
    pub name: Option<String>,
}

#[derive(BinRead, BinWrite)]
struct NameRecord {
    start_offset: u32,
    first_file_pos: u16,
    parent_dir: u16,
}

impl FlatNameEntry {
    /// Create an unnamed entry
    pub fn new(start_offset: u32, first_file_pos: u16, parent_dir: u16) -> Self {
        Self {
            start_offset,
            first_file_pos,
            parent_dir,
            name: None,
        }
    }

    /// Attach a name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Encoded size of this entry in bytes
    pub fn encoded_size(&self) -> u64 {
        8 + self
            .name
            .as_ref()
            .map_or(0, |name| 1 + name.chars().count() as u64)
    }
}

/// Total `BTNF` section size for the given entries
pub fn section_size(entries: &[FlatNameEntry]) -> Result<u32> {
    let size = u64::from(FNTB_HEADER_SIZE)
        + entries
            .iter()
            .map(FlatNameEntry::encoded_size)
            .sum::<u64>();
    u32::try_from(size).map_err(|_| NitroError::SizeOverflow {
        what: "filename table",
    })
}

/// Read a `BTNF` section at the stream's current position
///
/// Records are read until the running position reaches the declared section
/// size. A record that ends exactly on the boundary has no name.
pub fn read_section<R: Read + Seek>(
    stream: &mut ByteStream<R>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<FlatNameEntry>> {
    let magic_offset = stream.position()?;
    let magic = stream.read_u32()?;
    BTNF_MAGIC.check(magic, magic_offset, diagnostics);

    let section_size = u64::from(stream.read_u32()?);
    let mut entries = Vec::new();
    let mut pos = u64::from(FNTB_HEADER_SIZE);

    while pos < section_size {
        let record: NameRecord = stream.read_record()?;
        pos += 8;

        let name = if pos < section_size {
            let len = stream.read_u8()?;
            let name = stream.read_fixed_string(usize::from(len))?;
            pos += 1 + u64::from(len);
            Some(name)
        } else {
            None
        };

        trace!(
            start_offset = record.start_offset,
            first_file_pos = record.first_file_pos,
            parent_dir = record.parent_dir,
            ?name,
            "BTNF entry"
        );
        entries.push(FlatNameEntry {
            start_offset: record.start_offset,
            first_file_pos: record.first_file_pos,
            parent_dir: record.parent_dir,
            name,
        });
    }

    debug!("BTNF at {magic_offset:#x}: {} entries", entries.len());
    Ok(entries)
}

/// Write a `BTNF` section for the given entries
pub fn write_section<W: Write + Seek>(
    stream: &mut ByteStream<W>,
    entries: &[FlatNameEntry],
) -> Result<()> {
    let size = section_size(entries)?;
    stream.write_bytes(&BTNF_MAGIC.to_bytes())?;
    stream.write_u32(size)?;

    for entry in entries {
        stream.write_record(&NameRecord {
            start_offset: entry.start_offset,
            first_file_pos: entry.first_file_pos,
            parent_dir: entry.parent_dir,
        })?;
        if let Some(name) = &entry.name {
            let bytes = encode_name(name)?;
            let len = u8::try_from(bytes.len()).map_err(|_| NitroError::NameTooLong {
                name: name.clone(),
                max: MAX_FLAT_NAME_LEN,
            })?;
            stream.write_u8(len)?;
            stream.write_bytes(&bytes)?;
        }
    }
    Ok(())
}
