//! Error types for NARC and NitroFS parsing and building
//!
//! Hard faults abort the current load or save and are returned as
//! [`NitroError`]. Soft faults (tags that match neither byte order) never stop
//! decoding; they are recorded into a [`Diagnostics`] sink and logged.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Errors that can occur when parsing or building NARC archives and NitroFS
/// filename tables
#[derive(Debug, Error)]
pub enum NitroError {
    /// Declared allocation table size disagrees with its entry count
    #[error(
        "allocation table size mismatch at offset {offset:#x}: declared {declared}, expected {expected} for {count} entries"
    )]
    SizeIntegrity {
        /// Offset of the section size field
        offset: u64,
        /// Size stored in the section header
        declared: u32,
        /// `12 + count * 8`
        expected: u64,
        /// Entry count stored in the section header
        count: u32,
    },

    /// Subtable tag byte with no file or directory meaning (`0x80`)
    #[error("invalid subtable entry tag {tag:#04x} at offset {offset:#x}")]
    InvalidSubtableTag {
        /// Offset of the tag byte
        offset: u64,
        /// Tag value read
        tag: u8,
    },

    /// Subdirectory entry references a directory record that does not exist
    #[error("directory id {id:#05x} at offset {offset:#x} is outside 1..{num_dirs}")]
    DirectoryIdOutOfRange {
        /// Offset just past the directory id field
        offset: u64,
        /// Masked 12-bit directory id
        id: u16,
        /// Directory count declared by the root record
        num_dirs: u16,
    },

    /// Subtable file entry references a file outside the allocation table
    #[error(
        "file id {file_id} at offset {offset:#x} is outside allocation table of {count} entries"
    )]
    FileIdOutOfRange {
        /// Offset of the file entry tag byte
        offset: u64,
        /// File id the entry would claim
        file_id: usize,
        /// Allocation table length
        count: usize,
    },

    /// Allocation table entry ends before it starts
    #[error("allocation table entry {index} has end {end:#x} before start {start:#x}")]
    InvalidExtent {
        /// Entry index
        index: usize,
        /// Start offset
        start: u32,
        /// End offset
        end: u32,
    },

    /// Two subtable entries name the same allocation table entry
    #[error("file id {file_id} at offset {offset:#x} is already claimed by another directory")]
    FileClaimedTwice {
        /// Offset of the second claiming entry
        offset: u64,
        /// File id claimed twice
        file_id: usize,
    },

    /// Directory nesting exceeded the configured decode depth
    #[error("directory nesting exceeds depth limit of {limit}")]
    DepthLimitExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Stream ended before a fixed-width field was complete
    #[error("unexpected end of input at offset {offset:#x}: needed {needed} more bytes")]
    UnexpectedEof {
        /// Offset where the read started
        offset: u64,
        /// Width of the field being read
        needed: usize,
    },

    /// Name cannot be represented by its length prefix
    #[error("name {name:?} is longer than {max} bytes")]
    NameTooLong {
        /// Offending name
        name: String,
        /// Maximum encodable length
        max: usize,
    },

    /// A computed size does not fit in its 32-bit field
    #[error("{what} does not fit in a 32-bit size field")]
    SizeOverflow {
        /// Which size overflowed
        what: &'static str,
    },

    /// File data would begin inside the GMIF size field
    #[error(
        "first filename entry start offset {start_offset} places file data inside the GMIF header"
    )]
    InvalidDataSkip {
        /// Start offset of the first filename entry
        start_offset: u32,
    },

    /// An unnamed filename record followed by another record cannot be
    /// told apart from a named one when read back
    #[error("filename record {index} has no name but is not the last record")]
    MissingEntryName {
        /// Record index
        index: usize,
    },

    /// Name contains a character that does not fit in one byte
    #[error("name {name:?} contains characters outside the single-byte range")]
    UnencodableName {
        /// Offending name
        name: String,
    },

    /// Too many directories for 12-bit directory ids
    #[error("{count} directories exceed the 4096 addressable by 12-bit ids")]
    TooManyDirectories {
        /// Directory count requested
        count: usize,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` parsing/writing error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for NARC and NitroFS operations
pub type Result<T> = std::result::Result<T, NitroError>;

/// Non-fatal problems found while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFault {
    /// A 4-byte tag matched neither accepted byte order
    MagicMismatch {
        /// Which tag was checked
        section: &'static str,
        /// Offset of the tag
        offset: u64,
        /// Tag value in the canonical orientation
        expected: u32,
        /// Value actually read
        found: u32,
    },
}

impl fmt::Display for SoftFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MagicMismatch {
                section,
                offset,
                expected,
                found,
            } => write!(
                f,
                "{section} tag mismatch at offset {offset:#x}: expected {expected:#010x}, found {found:#010x}"
            ),
        }
    }
}

/// Collects soft faults raised during a decode pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    faults: Vec<SoftFault>,
}

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a soft fault and log it
    pub fn record(&mut self, fault: SoftFault) {
        warn!("{fault}");
        self.faults.push(fault);
    }

    /// Recorded faults in decode order
    pub fn faults(&self) -> &[SoftFault] {
        &self.faults
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Number of recorded faults
    pub fn len(&self) -> usize {
        self.faults.len()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NitroError::SizeIntegrity {
            offset: 0x14,
            declared: 30,
            expected: 28,
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("declared 30"));
        assert!(msg.contains("expected 28"));

        let err = NitroError::InvalidSubtableTag {
            offset: 0x40,
            tag: 0x80,
        };
        assert!(err.to_string().contains("0x80"));

        let err = NitroError::NameTooLong {
            name: "x".repeat(4),
            max: 3,
        };
        assert!(err.to_string().contains("3 bytes"));
    }

    #[test]
    fn test_diagnostics_records_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.record(SoftFault::MagicMismatch {
            section: "NARC",
            offset: 0,
            expected: 0x4E41_5243,
            found: 0,
        });
        diagnostics.record(SoftFault::MagicMismatch {
            section: "BTAF",
            offset: 16,
            expected: 0x4254_4146,
            found: 1,
        });

        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics.faults()[1],
            SoftFault::MagicMismatch {
                section: "BTAF",
                ..
            }
        ));
    }
}
