//! Directory tree decoding
//!
//! The filename table starts with one 8-byte record per directory, indexed by
//! 12-bit directory id. Each record points at a subtable of entries:
//!
//! | Tag byte      | Entry                                              |
//! |---------------|----------------------------------------------------|
//! | `0x00`        | end of subtable                                    |
//! | `0x01..=0x7F` | file, name of `tag` bytes                          |
//! | `0x80`        | reserved, rejected                                 |
//! | `0x81..=0xFF` | directory, name of `tag & 0x7F` bytes, then a u16  |
//!
//! Files take consecutive ids starting at the directory's first file id.
//! Directory entries carry an id whose low 12 bits select a record.

use std::io::{Cursor, Read, Seek};

use binrw::Endian;
use tracing::{debug, trace};

use crate::error::{NitroError, Result};
use crate::fat::{self, Extent};
use crate::nitrofs::directory::{
    DirIndex, Directory, DirectoryKind, FileId, NamedExtent, NitroFs,
};
use crate::nitrofs::record::{DIRECTORY_ID_MASK, DIRECTORY_RECORD_SIZE, DirectoryRecord};
use crate::stream::ByteStream;

/// Default nesting limit for [`DecodeOptions`]
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tuning for [`NitroFs::decode_with_options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest directory nesting accepted; `None` removes the limit
    ///
    /// A directory entry that points back at an ancestor makes the tree
    /// infinite, so disabling the limit is only safe for trusted input.
    pub max_depth: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl DecodeOptions {
    /// Set the nesting limit
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl NitroFs {
    /// Decode the tree from an image containing both tables
    pub fn parse_image(
        data: &[u8],
        fat_offset: u64,
        fat_size: u32,
        fnt_offset: u64,
    ) -> Result<Self> {
        let mut stream = ByteStream::new(Cursor::new(data));
        Self::decode(&mut stream, fat_offset, fat_size, fnt_offset)
    }

    /// Decode the allocation table and filename table with default options
    pub fn decode<R: Read + Seek>(
        stream: &mut ByteStream<R>,
        fat_offset: u64,
        fat_size: u32,
        fnt_offset: u64,
    ) -> Result<Self> {
        Self::decode_with_options(
            stream,
            fat_offset,
            fat_size,
            fnt_offset,
            DecodeOptions::default(),
        )
    }

    /// Decode the allocation table and filename table
    ///
    /// Every allocation table entry ends up in exactly one directory: the one
    /// whose subtable names it, or the root when no subtable does.
    pub fn decode_with_options<R: Read + Seek>(
        stream: &mut ByteStream<R>,
        fat_offset: u64,
        fat_size: u32,
        fnt_offset: u64,
        options: DecodeOptions,
    ) -> Result<Self> {
        let extents = fat::read_raw(stream, fat_offset, fat_size)?;

        stream.seek(fnt_offset)?;
        let record: DirectoryRecord = stream.read_record()?;
        let num_dirs = record.parent_or_count;
        debug!(
            "FNT at {fnt_offset:#x}: {num_dirs} directories, {} files",
            extents.len()
        );

        let mut decoder = TreeDecoder {
            stream,
            fnt_offset,
            num_dirs,
            options,
            table: extents.into_iter().map(NamedExtent::new).collect(),
            directories: vec![Directory::root(
                record.subtable_offset,
                record.first_file_id,
                num_dirs,
            )],
        };
        decoder.read_subtable(DirIndex::ROOT, 0)?;

        let TreeDecoder {
            table,
            mut directories,
            ..
        } = decoder;

        let unclaimed: Vec<FileId> = table
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.name.is_none())
            .map(|(id, _)| id)
            .collect();
        if !unclaimed.is_empty() {
            debug!("{} unnamed files placed in root", unclaimed.len());
        }
        directories[DirIndex::ROOT.0].files.extend(unclaimed);

        Ok(Self {
            allocation_table: table,
            directories,
        })
    }

    /// Read the bytes of file `id`, treating extents as offsets into `stream`
    pub fn read_file<R: Read + Seek>(
        &self,
        stream: &mut ByteStream<R>,
        id: FileId,
    ) -> Result<Vec<u8>> {
        let entry = self.file(id).ok_or(NitroError::FileIdOutOfRange {
            offset: 0,
            file_id: id,
            count: self.file_count(),
        })?;
        let Extent { start, end } = entry.extent;
        if !entry.extent.is_valid() {
            return Err(NitroError::InvalidExtent { index: id, start, end });
        }
        stream.seek(u64::from(start))?;
        stream.read_bytes(entry.extent.size() as usize)
    }
}

struct TreeDecoder<'s, R> {
    stream: &'s mut ByteStream<R>,
    fnt_offset: u64,
    num_dirs: u16,
    options: DecodeOptions,
    table: Vec<NamedExtent>,
    directories: Vec<Directory>,
}

impl<R: Read + Seek> TreeDecoder<'_, R> {
    fn read_subtable(&mut self, index: DirIndex, depth: usize) -> Result<()> {
        if let Some(limit) = self.options.max_depth
            && depth > limit
        {
            return Err(NitroError::DepthLimitExceeded { limit });
        }

        let dir = &self.directories[index.0];
        let mut file_id = usize::from(dir.first_file_id);
        self.stream
            .seek(self.fnt_offset + u64::from(dir.subtable_offset))?;

        loop {
            let offset = self.stream.position()?;
            let tag = self.stream.read_u8()?;
            match tag {
                0x00 => return Ok(()),
                0x01..=0x7F => {
                    let name = self.stream.read_fixed_string(usize::from(tag))?;
                    self.claim(index, file_id, name, offset)?;
                    file_id += 1;
                }
                0x80 => return Err(NitroError::InvalidSubtableTag { offset, tag }),
                0x81..=0xFF => {
                    let name = self.stream.read_fixed_string(usize::from(tag & 0x7F))?;
                    let id_offset = self.stream.position()?;
                    let id = self.stream.read_u16_with(Endian::Little)? & DIRECTORY_ID_MASK;
                    if id == 0 || id >= self.num_dirs {
                        return Err(NitroError::DirectoryIdOutOfRange {
                            offset: id_offset,
                            id,
                            num_dirs: self.num_dirs,
                        });
                    }

                    let resume = self.stream.position()?;
                    self.stream
                        .seek(self.fnt_offset + u64::from(id) * DIRECTORY_RECORD_SIZE)?;
                    let record: DirectoryRecord = self.stream.read_record()?;
                    trace!(id, %name, subtable = record.subtable_offset, "FNT directory");

                    let child = DirIndex(self.directories.len());
                    self.directories.push(Directory {
                        id,
                        subtable_offset: record.subtable_offset,
                        first_file_id: record.first_file_id,
                        kind: DirectoryKind::Sub {
                            parent_dir_id: record.parent_or_count & DIRECTORY_ID_MASK,
                            name,
                        },
                        parent: Some(index),
                        children: Vec::new(),
                        files: Vec::new(),
                    });
                    self.read_subtable(child, depth + 1)?;
                    self.directories[index.0].children.push(child);
                    self.stream.seek(resume)?;
                }
            }
        }
    }

    fn claim(
        &mut self,
        index: DirIndex,
        file_id: FileId,
        name: String,
        offset: u64,
    ) -> Result<()> {
        let count = self.table.len();
        let entry = self
            .table
            .get_mut(file_id)
            .ok_or(NitroError::FileIdOutOfRange {
                offset,
                file_id,
                count,
            })?;
        if entry.name.is_some() {
            return Err(NitroError::FileClaimedTwice { offset, file_id });
        }
        trace!(file_id, %name, "FNT file");
        entry.name = Some(name);
        self.directories[index.0].files.push(file_id);
        Ok(())
    }
}
