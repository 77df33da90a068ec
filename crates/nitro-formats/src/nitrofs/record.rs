//! Directory record shared by the decoder and the builder

use binrw::{BinRead, BinWrite};

/// Size of one directory record
pub const DIRECTORY_RECORD_SIZE: u64 = 8;

/// Mask selecting the directory id from a subtable entry
pub const DIRECTORY_ID_MASK: u16 = 0x0FFF;

/// High bits set on directory ids in subtables and parent fields
pub const DIRECTORY_ID_FLAG: u16 = 0xF000;

/// One 8-byte entry of the directory record table
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct DirectoryRecord {
    /// Subtable offset from the start of the filename table
    pub subtable_offset: u32,
    /// Id of the first file listed in the subtable
    pub first_file_id: u16,
    /// Directory count for the root, parent id otherwise
    pub parent_or_count: u16,
}
