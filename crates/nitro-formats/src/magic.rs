//! Section tags accepted in either byte order
//!
//! DS tools disagree on whether 4-byte tags are stored as text (`"NARC"`) or
//! as a little-endian integer of the same text (`"CRAN"`). A [`Tag`] holds both
//! readings so validation is a membership check rather than two code paths.

use crate::error::{Diagnostics, SoftFault};

/// A 4-byte tag and its byte-swapped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Short name used in diagnostics
    pub name: &'static str,
    /// Tag value with the text read big-endian
    pub canonical: u32,
}

impl Tag {
    /// Tag from its canonical text
    pub const fn from_text(name: &'static str, text: [u8; 4]) -> Self {
        Self {
            name,
            canonical: u32::from_be_bytes(text),
        }
    }

    /// Tag from an integer constant
    pub const fn from_value(name: &'static str, canonical: u32) -> Self {
        Self { name, canonical }
    }

    /// Byte-swapped reading of the tag
    pub const fn swapped(&self) -> u32 {
        self.canonical.swap_bytes()
    }

    /// Both accepted readings
    pub const fn accepted(&self) -> [u32; 2] {
        [self.canonical, self.swapped()]
    }

    /// Whether `value` matches either reading
    pub fn matches(&self, value: u32) -> bool {
        self.accepted().contains(&value)
    }

    /// Check `value`, recording a soft fault if it matches neither reading
    pub fn check(&self, value: u32, offset: u64, diagnostics: &mut Diagnostics) -> bool {
        let ok = self.matches(value);
        if !ok {
            diagnostics.record(SoftFault::MagicMismatch {
                section: self.name,
                offset,
                expected: self.canonical,
                found: value,
            });
        }
        ok
    }

    /// Bytes written when saving (the text as it reads on disk)
    pub const fn to_bytes(&self) -> [u8; 4] {
        self.canonical.to_be_bytes()
    }
}

/// Archive header tag
pub const NARC_MAGIC: Tag = Tag::from_text("NARC", *b"NARC");

/// Byte-order mark and version constant following the archive magic
pub const NARC_CONSTANT: Tag = Tag::from_value("NARC constant", 0xFEFF_0001);

/// File allocation table section tag
pub const BTAF_MAGIC: Tag = Tag::from_text("BTAF", *b"BTAF");

/// Filename table section tag
pub const BTNF_MAGIC: Tag = Tag::from_text("BTNF", *b"BTNF");

/// File image section tag
pub const GMIF_MAGIC: Tag = Tag::from_text("GMIF", *b"GMIF");
