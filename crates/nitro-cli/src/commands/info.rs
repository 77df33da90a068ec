//! `nitro info`: summarize a NARC archive

use std::path::Path;

use anyhow::{Context, Result};
use nitro_formats::narc::{FlatNameEntry, NarcArchive};
use nitro_formats::Extent;
use serde::Serialize;

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct ArchiveInfo<'a> {
    file_size: u32,
    fatb_size: u32,
    fntb_size: u32,
    fimg_size: u32,
    files: Vec<FileInfo>,
    filename_entries: &'a [FlatNameEntry],
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct FileInfo {
    index: usize,
    #[serde(flatten)]
    extent: Extent,
    size: u32,
}

/// Print section sizes, the allocation table, and any soft faults
pub fn handle(input: &Path, format: OutputFormat) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let (archive, diagnostics) = NarcArchive::parse_with_diagnostics(&data)
        .with_context(|| format!("parsing {}", input.display()))?;

    let info = ArchiveInfo {
        file_size: archive.file_size()?,
        fatb_size: archive.fatb_size()?,
        fntb_size: archive.fntb_size()?,
        fimg_size: archive.fimg_size()?,
        files: archive
            .allocation_table()
            .iter()
            .copied()
            .enumerate()
            .map(|(index, extent)| FileInfo {
                index,
                extent,
                size: extent.size(),
            })
            .collect(),
        filename_entries: &archive.filename_entries,
        warnings: diagnostics.faults().iter().map(ToString::to_string).collect(),
    };

    if format.is_json() {
        return print_json(&info, format);
    }

    println!("{}", input.display());
    println!("  archive size: {} bytes", info.file_size);
    println!(
        "  sections:     BTAF {} / BTNF {} / GMIF {}",
        info.fatb_size, info.fntb_size, info.fimg_size
    );
    println!("  files:        {}", info.files.len());
    for file in &info.files {
        println!(
            "    {:4}  {:#010x}..{:#010x}  {} bytes",
            file.index, file.extent.start, file.extent.end, file.size
        );
    }
    println!("  name records: {}", info.filename_entries.len());
    for entry in info.filename_entries {
        println!(
            "    offset {:#x} first {} parent {:#06x} {}",
            entry.start_offset,
            entry.first_file_pos,
            entry.parent_dir,
            entry.name.as_deref().unwrap_or("-")
        );
    }
    for warning in &info.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}
