//! NitroFS directory tree
//!
//! NitroFS is the filesystem embedded in DS ROM images. It is split across two
//! headerless tables located by the caller (usually from the ROM header):
//!
//! - the allocation table (FAT): `(start, end)` pairs, one per file id
//! - the filename table (FNT): directory records followed by subtables naming
//!   files and subdirectories
//!
//! Decoding attaches names from the FNT to FAT entries and builds the tree.
//! Files no subtable claims are attached to the root unnamed.
//!
//! # Usage
//!
//! ```rust,no_run
//! use nitro_formats::nitrofs::NitroFs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rom = std::fs::read("game.nds")?;
//! let fs = NitroFs::parse_image(&rom, 0x1000, 0x80, 0x2000)?;
//! for (path, id) in fs.walk() {
//!     println!("{id:5} {path}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod decoder;
pub mod directory;
pub mod record;

pub use builder::{FntBuilder, FntLayout};
pub use decoder::{DEFAULT_MAX_DEPTH, DecodeOptions};
pub use directory::{DirIndex, Directory, DirectoryKind, FileId, NamedExtent, NitroFs};
pub use record::DirectoryRecord;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fat;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn image(layout: &FntLayout, extra_files: usize) -> (Vec<u8>, u32, u64) {
        let count = layout.files.len() + extra_files;
        let extents = fat::extents_from_lengths((0..count).map(|i| i % 7)).unwrap();
        let mut data = fat::encode_raw(&extents).unwrap();
        let fat_size = data.len() as u32;
        let fnt_offset = data.len() as u64;
        data.extend_from_slice(&layout.data);
        (data, fat_size, fnt_offset)
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{1,6}", 1..4).prop_map(|parts| parts.join("/"))
    }

    proptest! {
        /// Every file id lands in exactly one directory and built paths resolve
        #[test]
        fn tree_covers_allocation_table(
            paths in prop::collection::vec(path_strategy(), 0..24),
            extra in 0usize..4
        ) {
            let builder = paths.iter().fold(FntBuilder::new(), |b, p| b.add_file(p));
            let layout = builder.build().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let (data, fat_size, fnt_offset) = image(&layout, extra);
            let fs = NitroFs::parse_image(&data, 0, fat_size, fnt_offset)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let mut seen: Vec<FileId> = fs
                .directories()
                .iter()
                .flat_map(|d| d.files.iter().copied())
                .collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..fs.file_count()).collect::<Vec<_>>());
            prop_assert_eq!(usize::from(layout.num_dirs), fs.directories().len());

            for (id, path) in layout.files.iter().enumerate() {
                prop_assert_eq!(fs.lookup(path), Some(id));
                let file_path = fs.file_path(id);
                prop_assert_eq!(file_path.as_deref(), Some(path.as_str()));
            }
        }
    }

    #[test]
    fn test_walk_and_render() {
        let layout = FntBuilder::new()
            .add_file("readme")
            .add_file("data/a.bin")
            .add_file("data/sub/b.bin")
            .build()
            .unwrap();
        let (data, fat_size, fnt_offset) = image(&layout, 1);
        let fs = NitroFs::parse_image(&data, 0, fat_size, fnt_offset).unwrap();

        assert_eq!(
            fs.walk(),
            vec![
                ("readme".to_string(), 0),
                ("3".to_string(), 3),
                ("data/a.bin".to_string(), 1),
                ("data/sub/b.bin".to_string(), 2),
            ]
        );
        assert_eq!(
            fs.render_tree(),
            "root\n data\n  sub\n   b.bin\n  a.bin\nreadme\n1\n"
        );
        let sub = fs.find_directory("data/sub").unwrap();
        assert_eq!(fs.directory_path(sub).as_deref(), Some("data/sub"));
        assert_eq!(fs.lookup("data/missing"), None);
        assert_eq!(fs.file_path(3), None);
    }
}
