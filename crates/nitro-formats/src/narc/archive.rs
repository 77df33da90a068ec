//! NARC archive load and save

use std::io::{Cursor, Read, Seek, Write};

use tracing::debug;

use crate::NitroFormat;
use crate::error::{Diagnostics, NitroError, Result};
use crate::fat::{self, Extent};
use crate::magic::GMIF_MAGIC;
use crate::narc::header::{NARC_HEADER_SIZE, NarcHeader};
use crate::narc::name_table::{self, FlatNameEntry, MAX_FLAT_NAME_LEN};
use crate::stream::{ByteStream, encode_name};

/// GMIF section header size (magic + size)
pub const FIMG_HEADER_SIZE: u32 = 8;

/// Bytes skipped after the GMIF tag when the filename table is empty
pub const DEFAULT_DATA_SKIP: u32 = 4;

/// A loaded NARC archive
///
/// Files are stored in allocation table order. The allocation table is kept
/// as loaded; saving ignores it and packs the files back to back, so an
/// edited archive always saves consistently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarcArchive {
    /// Allocation table as read from the `BTAF` section
    pub allocation_table: Vec<Extent>,
    /// Flat filename table records
    pub filename_entries: Vec<FlatNameEntry>,
    /// File contents in allocation table order
    pub files: Vec<Vec<u8>>,
}

impl NarcArchive {
    /// Create an archive from its parts, with a packed allocation table
    pub fn new(filename_entries: Vec<FlatNameEntry>, files: Vec<Vec<u8>>) -> Result<Self> {
        let allocation_table = fat::extents_from_lengths(files.iter().map(Vec::len))?;
        Ok(Self {
            allocation_table,
            filename_entries,
            files,
        })
    }

    /// Parse an archive, logging and discarding soft faults
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_diagnostics(data).map(|(archive, _)| archive)
    }

    /// Parse an archive and return the soft faults seen along the way
    pub fn parse_with_diagnostics(data: &[u8]) -> Result<(Self, Diagnostics)> {
        let mut diagnostics = Diagnostics::new();
        let mut stream = ByteStream::new(Cursor::new(data));
        let archive = Self::read_from(&mut stream, &mut diagnostics)?;
        Ok((archive, diagnostics))
    }

    /// Read an archive starting at the stream's current position
    ///
    /// Each file is read at `data_start + start` for its extent, so gaps
    /// between extents (alignment padding) are skipped rather than read
    /// into the neighbouring file.
    pub fn read_from<R: Read + Seek>(
        stream: &mut ByteStream<R>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        NarcHeader::read(stream, diagnostics)?;

        let allocation_table = fat::read_section(stream, diagnostics)?;
        let filename_entries = name_table::read_section(stream, diagnostics)?;

        let magic_offset = stream.position()?;
        let magic = stream.read_u32()?;
        GMIF_MAGIC.check(magic, magic_offset, diagnostics);

        // Only the first entry's offset is honoured; nested layouts are not
        // supported by the flat table.
        let skip = filename_entries
            .first()
            .map_or(DEFAULT_DATA_SKIP, |entry| entry.start_offset);
        stream.skip(u64::from(skip))?;
        let data_start = stream.position()?;
        debug!("GMIF at {magic_offset:#x}: data starts at {data_start:#x}");

        let mut files = Vec::with_capacity(allocation_table.len());
        for (index, extent) in allocation_table.iter().enumerate() {
            if !extent.is_valid() {
                return Err(NitroError::InvalidExtent {
                    index,
                    start: extent.start,
                    end: extent.end,
                });
            }
            stream.seek(data_start + u64::from(extent.start))?;
            files.push(stream.read_bytes(extent.size() as usize)?);
        }

        Ok(Self {
            allocation_table,
            filename_entries,
            files,
        })
    }

    /// Serialize the archive
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut stream = ByteStream::new(Cursor::new(Vec::new()));
        self.write_to(&mut stream)?;
        Ok(stream.into_inner().into_inner())
    }

    /// Write the archive at the stream's current position
    ///
    /// Fails without writing anything if a size or name cannot be encoded.
    pub fn write_to<W: Write + Seek>(&self, stream: &mut ByteStream<W>) -> Result<()> {
        self.validate()?;
        let extents = self.packed_allocation_table()?;
        let file_size = self.file_size()?;
        let fimg_size = self.fimg_size()?;
        let padding = self.data_skip()? - DEFAULT_DATA_SKIP;

        stream.write_record(&NarcHeader::new(file_size))?;
        fat::write_section(stream, &extents)?;
        name_table::write_section(stream, &self.filename_entries)?;

        stream.write_bytes(&GMIF_MAGIC.to_bytes())?;
        stream.write_u32(fimg_size)?;
        stream.write_bytes(&vec![0u8; padding as usize])?;
        for file in &self.files {
            stream.write_bytes(file)?;
        }
        Ok(())
    }

    /// Check that the archive can be saved and read back unchanged
    pub fn validate(&self) -> Result<()> {
        let last = self.filename_entries.len().saturating_sub(1);
        for (index, entry) in self.filename_entries.iter().enumerate() {
            match &entry.name {
                Some(name) => {
                    if encode_name(name)?.len() > MAX_FLAT_NAME_LEN {
                        return Err(NitroError::NameTooLong {
                            name: name.clone(),
                            max: MAX_FLAT_NAME_LEN,
                        });
                    }
                }
                None if index != last => return Err(NitroError::MissingEntryName { index }),
                None => {}
            }
        }
        self.file_size()?;
        Ok(())
    }

    /// Number of files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// All file contents in allocation table order
    pub fn files(&self) -> &[Vec<u8>] {
        &self.files
    }

    /// Contents of file `index`
    pub fn file(&self, index: usize) -> Option<&[u8]> {
        self.files.get(index).map(Vec::as_slice)
    }

    /// Append a file, returning its index
    ///
    /// The allocation table is repacked to match the new contents.
    pub fn push_file(&mut self, data: Vec<u8>) -> Result<usize> {
        self.files.push(data);
        self.allocation_table = self.packed_allocation_table()?;
        Ok(self.files.len() - 1)
    }

    /// Replace the contents of file `index`, returning the old contents
    ///
    /// The allocation table is repacked to match the new contents.
    pub fn replace_file(&mut self, index: usize, data: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let Some(slot) = self.files.get_mut(index) else {
            return Ok(None);
        };
        let old = std::mem::replace(slot, data);
        self.allocation_table = self.packed_allocation_table()?;
        Ok(Some(old))
    }

    /// Allocation table as read, or as packed by the last edit
    pub fn allocation_table(&self) -> &[Extent] {
        &self.allocation_table
    }

    /// Allocation table as it will be saved: files packed back to back
    pub fn packed_allocation_table(&self) -> Result<Vec<Extent>> {
        fat::extents_from_lengths(self.files.iter().map(Vec::len))
    }

    /// Bytes between the end of the GMIF tag and the first file byte
    pub fn data_skip(&self) -> Result<u32> {
        match self.filename_entries.first() {
            None => Ok(DEFAULT_DATA_SKIP),
            Some(entry) if entry.start_offset >= DEFAULT_DATA_SKIP => Ok(entry.start_offset),
            Some(entry) => Err(NitroError::InvalidDataSkip {
                start_offset: entry.start_offset,
            }),
        }
    }

    /// Outer header size
    pub fn header_size(&self) -> u16 {
        NARC_HEADER_SIZE
    }

    /// `BTAF` section size
    pub fn fatb_size(&self) -> Result<u32> {
        let count = u32::try_from(self.files.len()).map_err(|_| NitroError::SizeOverflow {
            what: "allocation table count",
        })?;
        u32::try_from(fat::section_size(count)).map_err(|_| NitroError::SizeOverflow {
            what: "allocation table",
        })
    }

    /// `BTNF` section size
    pub fn fntb_size(&self) -> Result<u32> {
        name_table::section_size(&self.filename_entries)
    }

    /// `GMIF` section size, including the padding before the first file
    pub fn fimg_size(&self) -> Result<u32> {
        let padding = u64::from(self.data_skip()? - DEFAULT_DATA_SKIP);
        let data: u64 = self.files.iter().map(|f| f.len() as u64).sum();
        u32::try_from(u64::from(FIMG_HEADER_SIZE) + padding + data)
            .map_err(|_| NitroError::SizeOverflow { what: "file image" })
    }

    /// Total archive size
    pub fn file_size(&self) -> Result<u32> {
        let total = u64::from(self.header_size())
            + u64::from(self.fatb_size()?)
            + u64::from(self.fntb_size()?)
            + u64::from(self.fimg_size()?);
        u32::try_from(total).map_err(|_| NitroError::SizeOverflow { what: "archive" })
    }
}

impl NitroFormat for NarcArchive {
    fn parse(data: &[u8]) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        Self::parse(data).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.build()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SoftFault;
    use pretty_assertions::assert_eq;

    /// Two files of 10 and 5 bytes behind a single root entry at offset 8
    fn two_file_archive_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"NARC");
        data.extend_from_slice(&[0xFE, 0xFF, 0x00, 0x01]);
        data.extend_from_slice(&0u32.to_le_bytes()); // stale size, ignored
        data.extend_from_slice(&16u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());

        data.extend_from_slice(b"BTAF");
        data.extend_from_slice(&28u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        for (start, end) in [(0u32, 10u32), (10, 15)] {
            data.extend_from_slice(&start.to_le_bytes());
            data.extend_from_slice(&end.to_le_bytes());
        }

        data.extend_from_slice(b"BTNF");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0xFFFFu16.to_le_bytes());

        data.extend_from_slice(b"GMIF");
        data.extend_from_slice(&27u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend((0u8..15).collect::<Vec<_>>());
        data
    }

    #[test]
    fn test_load_two_files() {
        let (archive, diagnostics) =
            NarcArchive::parse_with_diagnostics(&two_file_archive_bytes()).unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(archive.file_count(), 2);
        assert_eq!(archive.files[0], (0u8..10).collect::<Vec<_>>());
        assert_eq!(archive.files[1], (10u8..15).collect::<Vec<_>>());
        assert_eq!(
            archive.filename_entries,
            vec![FlatNameEntry::new(8, 0, 0xFFFF)]
        );
    }

    /// Files "abc" and "wxyz" with the second aligned to 4 bytes
    fn aligned_archive_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"NARC");
        data.extend_from_slice(&[0xFE, 0xFF, 0x00, 0x01]);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&16u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());

        data.extend_from_slice(b"BTAF");
        data.extend_from_slice(&28u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        for (start, end) in [(0u32, 3u32), (4, 8)] {
            data.extend_from_slice(&start.to_le_bytes());
            data.extend_from_slice(&end.to_le_bytes());
        }

        data.extend_from_slice(b"BTNF");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());

        data.extend_from_slice(b"GMIF");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(b"abc\xFFwxyz");
        data
    }

    #[test]
    fn test_gapped_table_kept_and_padding_skipped() {
        let archive = NarcArchive::parse(&aligned_archive_bytes()).unwrap();

        assert_eq!(archive.files, vec![b"abc".to_vec(), b"wxyz".to_vec()]);
        assert_eq!(
            archive.allocation_table(),
            &[Extent::new(0, 3), Extent::new(4, 8)]
        );
        assert_eq!(
            archive.packed_allocation_table().unwrap(),
            vec![Extent::new(0, 3), Extent::new(3, 7)]
        );

        // Saving packs the files; the reloaded table follows
        let reparsed = NarcArchive::parse(&archive.build().unwrap()).unwrap();
        assert_eq!(reparsed.files, archive.files);
        assert_eq!(
            reparsed.allocation_table(),
            &[Extent::new(0, 3), Extent::new(3, 7)]
        );
    }

    #[test]
    fn test_save_recomputes_tables() {
        let archive = NarcArchive::parse(&two_file_archive_bytes()).unwrap();
        let data = archive.build().unwrap();

        assert_eq!(&data[0..4], b"NARC");
        assert_eq!(
            u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize,
            data.len()
        );
        // BTAF count and recomputed extents
        assert_eq!(&data[16..20], b"BTAF");
        assert_eq!(u32::from_le_bytes(data[24..28].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(data[28..32].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(data[32..36].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(data[36..40].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(data[40..44].try_into().unwrap()), 15);

        assert_eq!(archive.file_size().unwrap() as usize, data.len());
        assert_eq!(NarcArchive::parse(&data).unwrap(), archive);
    }

    #[test]
    fn test_section_sizes() {
        let archive = NarcArchive::new(
            vec![FlatNameEntry::new(4, 0, 1)],
            vec![vec![1; 3], vec![2; 7]],
        )
        .unwrap();
        assert_eq!(archive.header_size(), 16);
        assert_eq!(archive.fatb_size().unwrap(), 28);
        assert_eq!(archive.fntb_size().unwrap(), 16);
        assert_eq!(archive.fimg_size().unwrap(), 18);
        assert_eq!(archive.file_size().unwrap(), 78);
        assert_eq!(archive.build().unwrap().len(), 78);
    }

    #[test]
    fn test_bad_tags_are_soft() {
        let mut data = two_file_archive_bytes();
        data[0..4].copy_from_slice(b"XXXX");
        data[60..64].copy_from_slice(b"YYYY");

        let (archive, diagnostics) = NarcArchive::parse_with_diagnostics(&data).unwrap();
        assert_eq!(archive.file_count(), 2);
        let sections: Vec<_> = diagnostics
            .faults()
            .iter()
            .map(|SoftFault::MagicMismatch { section, .. }| *section)
            .collect();
        assert_eq!(sections, vec!["NARC", "GMIF"]);
    }

    #[test]
    fn test_size_fault_aborts_load() {
        let mut data = two_file_archive_bytes();
        data[20..24].copy_from_slice(&30u32.to_le_bytes());

        let err = NarcArchive::parse(&data).unwrap_err();
        assert!(matches!(
            err,
            NitroError::SizeIntegrity {
                offset: 20,
                declared: 30,
                expected: 28,
                count: 2
            }
        ));
    }

    #[test]
    fn test_truncated_file_data() {
        let mut data = two_file_archive_bytes();
        data.truncate(data.len() - 1);
        assert!(matches!(
            NarcArchive::parse(&data),
            Err(NitroError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_inverted_extent_rejected() {
        let mut data = two_file_archive_bytes();
        // Second entry: start 10, end 9
        data[40..44].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(
            NarcArchive::parse(&data),
            Err(NitroError::InvalidExtent { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_name_table_uses_default_skip() {
        let archive = NarcArchive::new(Vec::new(), vec![b"abc".to_vec()]).unwrap();
        let data = archive.build().unwrap();
        assert_eq!(NarcArchive::parse(&data).unwrap(), archive);
    }

    #[test]
    fn test_unrepresentable_skip_fails_closed() {
        let archive =
            NarcArchive::new(vec![FlatNameEntry::new(2, 0, 1)], vec![vec![0; 4]]).unwrap();
        assert!(matches!(
            archive.build(),
            Err(NitroError::InvalidDataSkip { start_offset: 2 })
        ));
    }

    #[test]
    fn test_long_name_fails_before_writing() {
        let archive = NarcArchive::new(
            vec![FlatNameEntry::new(4, 0, 1).with_name("x".repeat(300))],
            vec![],
        )
        .unwrap();
        let mut stream = ByteStream::new(Cursor::new(Vec::new()));
        assert!(matches!(
            archive.write_to(&mut stream),
            Err(NitroError::NameTooLong { .. })
        ));
        assert!(stream.into_inner().into_inner().is_empty());
    }

    #[test]
    fn test_unnamed_middle_entry_fails_closed() {
        let archive = NarcArchive::new(
            vec![
                FlatNameEntry::new(4, 0, 2),
                FlatNameEntry::new(4, 0, 0).with_name("sub"),
            ],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            archive.build(),
            Err(NitroError::MissingEntryName { index: 0 })
        ));
    }

    #[test]
    fn test_replace_and_push() {
        let mut archive = NarcArchive::parse(&two_file_archive_bytes()).unwrap();
        let old = archive.replace_file(0, vec![9; 3]).unwrap().unwrap();
        assert_eq!(old.len(), 10);
        assert_eq!(archive.push_file(vec![7; 2]).unwrap(), 2);
        assert!(archive.replace_file(5, vec![]).unwrap().is_none());

        assert_eq!(
            archive.allocation_table(),
            &[Extent::new(0, 3), Extent::new(3, 8), Extent::new(8, 10)]
        );
        let reparsed = NarcArchive::parse(&archive.build().unwrap()).unwrap();
        assert_eq!(reparsed.file(0), Some(&[9u8, 9, 9][..]));
        assert_eq!(reparsed, archive);
    }
}
