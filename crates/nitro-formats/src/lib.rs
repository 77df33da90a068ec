//! Archive and filesystem formats for Nintendo DS ROM content
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::doc_markdown)] // Many DS-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::missing_errors_doc)] // Error enums document the failure cases
//! This crate reads and writes the two container layouts found in DS games:
//!
//! - **NARC**: standalone archive files with `BTAF`/`BTNF`/`GMIF` sections,
//!   read as a flat list of files
//! - **NitroFS**: the filesystem embedded in a ROM image, decoded from its raw
//!   allocation and filename tables into a directory tree
//!
//! # Error model
//!
//! Structural problems that make further decoding meaningless (size field
//! mismatches, out-of-range ids, truncated input) are returned as
//! [`NitroError`]. Section tags that match neither byte order are soft faults:
//! they are collected in a [`Diagnostics`] sink and decoding continues.

#![warn(missing_docs)]

/// Error types and the soft-fault sink
pub mod error;
/// Allocation table codec shared by both formats
pub mod fat;
/// Section tags and byte-order tolerant tag checks
pub mod magic;
/// NARC archives
///
/// See the [`narc`] module for the section layout and a usage example.
pub mod narc;
/// NitroFS directory tree decoding
///
/// See the [`nitrofs`] module for the table layout and a usage example.
pub mod nitrofs;
/// Positioned byte stream with selectable byte order
pub mod stream;

pub use error::{Diagnostics, NitroError, Result, SoftFault};
pub use fat::Extent;
pub use narc::{NarcArchive, NarcBuilder};
pub use nitrofs::{DecodeOptions, FntBuilder, NitroFs};
pub use stream::ByteStream;

/// Common trait for formats that round-trip through bytes
pub trait NitroFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> std::result::Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
