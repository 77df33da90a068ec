//! `nitro pack`: build a NARC archive from a directory

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nitro_formats::narc::NarcBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct Packed {
    output: String,
    files: usize,
    size: usize,
}

/// Regular files directly inside `dir`, sorted by name
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Pack the files of `input` in name order into a new archive at `output`
pub fn handle(input: &Path, output: &Path, format: OutputFormat) -> Result<()> {
    let paths = collect_files(input)?;

    let mut builder = NarcBuilder::new();
    for path in &paths {
        let contents =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        debug!("adding {} ({} bytes)", path.display(), contents.len());
        builder = builder.add_file(contents);
    }

    let data = builder.build()?.build()?;
    std::fs::write(output, &data).with_context(|| format!("writing {}", output.display()))?;
    info!("packed {} files into {}", paths.len(), output.display());

    let packed = Packed {
        output: output.display().to_string(),
        files: paths.len(),
        size: data.len(),
    };
    if format.is_json() {
        return print_json(&packed, format);
    }
    println!("{}: {} files, {} bytes", packed.output, packed.files, packed.size);
    Ok(())
}
