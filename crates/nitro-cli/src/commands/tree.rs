//! `nitro tree`: print the NitroFS tree of a ROM image

use std::path::Path;

use anyhow::{Context, Result};
use nitro_formats::nitrofs::{DecodeOptions, NitroFs};
use nitro_formats::{ByteStream, Extent};
use serde::Serialize;

use crate::output::{OutputFormat, print_json};

/// Table locations inside the image
#[derive(Debug, Clone, Copy)]
pub struct TableLocation {
    /// Offset of the allocation table
    pub fat_offset: u64,
    /// Size of the allocation table in bytes
    pub fat_size: u32,
    /// Offset of the filename table
    pub fnt_offset: u64,
}

#[derive(Serialize)]
struct TreeEntry {
    path: String,
    id: usize,
    #[serde(flatten)]
    extent: Extent,
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_number(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid number {text:?}: {e}"))
}

/// Decode and print the tree
pub fn handle(
    input: &Path,
    location: TableLocation,
    options: DecodeOptions,
    format: OutputFormat,
) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut stream = ByteStream::new(std::io::Cursor::new(data.as_slice()));
    let fs = NitroFs::decode_with_options(
        &mut stream,
        location.fat_offset,
        location.fat_size,
        location.fnt_offset,
        options,
    )
    .with_context(|| format!("decoding NitroFS in {}", input.display()))?;

    if format.is_json() {
        let entries: Vec<TreeEntry> = fs
            .walk()
            .into_iter()
            .filter_map(|(path, id)| {
                fs.file(id).map(|file| TreeEntry {
                    path,
                    id,
                    extent: file.extent,
                })
            })
            .collect();
        return print_json(&entries, format);
    }

    print!("{}", fs.render_tree());
    Ok(())
}
