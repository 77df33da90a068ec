//! `nitro extract`: unpack a NARC archive into a directory

use std::path::Path;

use anyhow::{Context, Result};
use nitro_formats::narc::NarcArchive;
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct Extracted {
    index: usize,
    path: String,
    size: usize,
}

/// File name used for entry `index` of an archive
pub fn entry_file_name(index: usize) -> String {
    format!("{index:04}.bin")
}

/// Write every file of `input` into `output` as `NNNN.bin`
pub fn handle(input: &Path, output: &Path, format: OutputFormat) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let archive =
        NarcArchive::parse(&data).with_context(|| format!("parsing {}", input.display()))?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("creating {}", output.display()))?;

    let mut extracted = Vec::with_capacity(archive.file_count());
    for (index, contents) in archive.files().iter().enumerate() {
        let path = output.join(entry_file_name(index));
        std::fs::write(&path, contents)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!("wrote {} ({} bytes)", path.display(), contents.len());
        extracted.push(Extracted {
            index,
            path: path.display().to_string(),
            size: contents.len(),
        });
    }
    info!("extracted {} files to {}", extracted.len(), output.display());

    if format.is_json() {
        return print_json(&extracted, format);
    }
    for file in &extracted {
        println!("{}  {} bytes", file.path, file.size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_file_name_sorts() {
        assert_eq!(entry_file_name(7), "0007.bin");
        assert!(entry_file_name(9) < entry_file_name(10));
    }
}
