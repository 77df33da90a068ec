//! Builder for constructing NARC archives

use crate::error::Result;
use crate::narc::archive::{DEFAULT_DATA_SKIP, NarcArchive};
use crate::narc::name_table::FlatNameEntry;

/// Builder for constructing `NarcArchive` instances
///
/// Without explicit filename entries the archive gets the single unnamed root
/// record DS tools write for anonymous archives: start offset 4, first file
/// 0, one directory.
#[derive(Debug, Default)]
pub struct NarcBuilder {
    files: Vec<Vec<u8>>,
    entries: Vec<FlatNameEntry>,
}

impl NarcBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file
    #[must_use]
    pub fn add_file(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.files.push(data.into());
        self
    }

    /// Append a filename table record
    #[must_use]
    pub fn name_entry(mut self, entry: FlatNameEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Build the archive, checking that it can be saved
    pub fn build(self) -> Result<NarcArchive> {
        let entries = if self.entries.is_empty() {
            vec![FlatNameEntry::new(DEFAULT_DATA_SKIP, 0, 1)]
        } else {
            self.entries
        };

        let archive = NarcArchive::new(entries, self.files)?;
        archive.validate()?;
        Ok(archive)
    }
}
