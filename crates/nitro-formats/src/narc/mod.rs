//! NARC archive format (flat variant)
//!
//! A NARC packs a list of files behind a 16-byte header and three sections:
//!
//! - `BTAF`: allocation table of `(start, end)` ranges, one per file
//! - `BTNF`: filename table, read here as a flat list of records
//! - `GMIF`: file data, starting after a prefix located by the first filename
//!   record
//!
//! All four tags are accepted in either byte order; a tag that matches neither
//! is reported as a soft fault and decoding continues. The only hard stop on
//! structure is an allocation table whose declared size disagrees with its
//! entry count.
//!
//! Saving recomputes every size field and the allocation table from the
//! current file contents.
//!
//! # Usage
//!
//! ```rust,no_run
//! use nitro_formats::narc::{NarcArchive, NarcBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = NarcBuilder::new()
//!     .add_file(b"hello".to_vec())
//!     .add_file(b"world".to_vec())
//!     .build()?;
//!
//! let data = archive.build()?;
//! let parsed = NarcArchive::parse(&data)?;
//! assert_eq!(parsed.files.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod builder;
pub mod header;
pub mod name_table;

pub use archive::NarcArchive;
pub use builder::NarcBuilder;
pub use header::NarcHeader;
pub use name_table::FlatNameEntry;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NitroFormat;
    use proptest::prelude::*;

    fn flat_entry() -> impl Strategy<Value = FlatNameEntry> {
        (4u32..64, any::<u16>(), any::<u16>(), "[A-Za-z0-9_.]{0,40}")
            .prop_map(|(start_offset, first_file_pos, parent_dir, name)| FlatNameEntry {
                start_offset,
                first_file_pos,
                parent_dir,
                name: Some(name),
            })
    }

    proptest! {
        /// Saving then loading reproduces files and filename records
        #[test]
        fn narc_round_trip(
            mut entries in prop::collection::vec(flat_entry(), 0..6),
            unnamed_last in any::<bool>(),
            files in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 0..12)
        ) {
            // Only the final record may omit its name
            if unnamed_last && let Some(last) = entries.last_mut() {
                last.name = None;
            }
            let archive = NarcArchive::new(entries, files)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let data = archive.build().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let parsed = NarcArchive::parse(&data).map_err(|e| TestCaseError::fail(e.to_string()))?;

            prop_assert_eq!(&parsed.files, &archive.files);
            prop_assert_eq!(&parsed.filename_entries, &archive.filename_entries);
        }
    }

    #[test]
    fn test_builder_output_is_canonical() {
        let archive = NarcBuilder::new()
            .add_file(vec![0xAB; 17])
            .add_file(Vec::new())
            .build()
            .unwrap();
        let data = archive.build().unwrap();
        assert!(<NarcArchive as NitroFormat>::verify_round_trip(&data).is_ok());
    }
}
