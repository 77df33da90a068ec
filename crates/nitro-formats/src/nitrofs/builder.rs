//! Builder for filename tables
//!
//! Lays out a set of `/`-separated paths as a directory record table followed
//! by one subtable per directory. Directories are numbered breadth-first from
//! the root and each directory's files get consecutive ids, so
//! [`FntLayout::files`] gives the order the allocation table must follow.

use std::collections::BTreeMap;
use std::io::Cursor;

use binrw::Endian;

use crate::error::{NitroError, Result};
use crate::nitrofs::record::{
    DIRECTORY_ID_FLAG, DIRECTORY_ID_MASK, DIRECTORY_RECORD_SIZE, DirectoryRecord,
};
use crate::stream::{ByteStream, encode_name};

/// Longest file or directory name a subtable entry can describe
pub const MAX_TREE_NAME_LEN: usize = 0x7F;

/// Most directories 12-bit ids can address
pub const MAX_DIRECTORIES: usize = 0x1000;

/// Encoded filename table plus the file order it expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FntLayout {
    /// Encoded filename table
    pub data: Vec<u8>,
    /// File paths indexed by file id
    pub files: Vec<String>,
    /// Directory count, root included
    pub num_dirs: u16,
}

#[derive(Debug, Default)]
struct DirNode {
    files: Vec<String>,
    dirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    fn insert(&mut self, components: &[&str]) {
        match components {
            [] => {}
            [file] => {
                if !self.files.iter().any(|f| f == file) {
                    self.files.push((*file).to_string());
                }
            }
            [dir, rest @ ..] => self.dirs.entry((*dir).to_string()).or_default().insert(rest),
        }
    }
}

/// Flattened directory ready for encoding
struct Planned<'a> {
    node: &'a DirNode,
    path: String,
    parent: Option<usize>,
}

/// Builder for NitroFS filename tables
#[derive(Debug, Default)]
pub struct FntBuilder {
    root: DirNode,
}

impl FntBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file by path; intermediate directories are created as needed
    ///
    /// Files keep the order they were added in within their directory.
    /// Adding the same path twice has no effect.
    #[must_use]
    pub fn add_file(mut self, path: &str) -> Self {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        self.root.insert(&components);
        self
    }

    /// Encode the table
    pub fn build(&self) -> Result<FntLayout> {
        // Breadth-first so parents always precede children
        let mut plan = vec![Planned {
            node: &self.root,
            path: String::new(),
            parent: None,
        }];
        let mut cursor = 0;
        while cursor < plan.len() {
            let (node, prefix) = (plan[cursor].node, plan[cursor].path.clone());
            for (name, child) in &node.dirs {
                plan.push(Planned {
                    node: child,
                    path: format!("{prefix}{name}/"),
                    parent: Some(cursor),
                });
            }
            cursor += 1;
        }

        if plan.len() > MAX_DIRECTORIES {
            return Err(NitroError::TooManyDirectories { count: plan.len() });
        }
        let num_dirs = directory_id(plan.len())?;

        // Child ids follow from breadth-first order
        let mut child_ids = vec![Vec::new(); plan.len()];
        for (index, planned) in plan.iter().enumerate().skip(1) {
            if let Some(parent) = planned.parent {
                child_ids[parent].push(index);
            }
        }

        let mut subtables = Vec::with_capacity(plan.len());
        let mut files = Vec::new();
        for (planned, children) in plan.iter().zip(&child_ids) {
            let first_file_id =
                u16::try_from(files.len()).map_err(|_| NitroError::SizeOverflow {
                    what: "file id",
                })?;

            let mut subtable = Subtable {
                first_file_id,
                files: Vec::with_capacity(planned.node.files.len()),
                dirs: Vec::with_capacity(children.len()),
            };
            for name in &planned.node.files {
                subtable.files.push(tree_name(name)?);
                files.push(format!("{}{name}", planned.path));
            }
            for (name, &child) in planned.node.dirs.keys().zip(children) {
                let (len, bytes) = tree_name(name)?;
                subtable
                    .dirs
                    .push((0x80 | len, bytes, DIRECTORY_ID_FLAG | directory_id(child)?));
            }
            subtables.push(subtable);
        }

        let table_size = plan.len() as u64 * DIRECTORY_RECORD_SIZE;
        let mut stream = ByteStream::new(Cursor::new(Vec::new()));
        let mut offset = table_size;
        for (planned, subtable) in plan.iter().zip(&subtables) {
            let parent_or_count = match planned.parent {
                Some(parent) => DIRECTORY_ID_FLAG | directory_id(parent)?,
                None => num_dirs,
            };
            stream.write_record(&DirectoryRecord {
                subtable_offset: u32::try_from(offset).map_err(|_| NitroError::SizeOverflow {
                    what: "filename table",
                })?,
                first_file_id: subtable.first_file_id,
                parent_or_count,
            })?;
            offset += subtable.encoded_size();
        }

        for subtable in &subtables {
            for (len, bytes) in &subtable.files {
                stream.write_u8(*len)?;
                stream.write_bytes(bytes)?;
            }
            for (tag, bytes, id) in &subtable.dirs {
                stream.write_u8(*tag)?;
                stream.write_bytes(bytes)?;
                stream.write_u16_with(*id, Endian::Little)?;
            }
            stream.write_u8(0)?;
        }

        Ok(FntLayout {
            data: stream.into_inner().into_inner(),
            files,
            num_dirs,
        })
    }
}

/// Encoded entries of one directory
struct Subtable {
    first_file_id: u16,
    /// `(length, name)` per file
    files: Vec<(u8, Vec<u8>)>,
    /// `(tag, name, flagged id)` per subdirectory
    dirs: Vec<(u8, Vec<u8>, u16)>,
}

impl Subtable {
    fn encoded_size(&self) -> u64 {
        let files: usize = self.files.iter().map(|(_, name)| 1 + name.len()).sum();
        let dirs: usize = self.dirs.iter().map(|(_, name, _)| 3 + name.len()).sum();
        (files + dirs + 1) as u64
    }
}

fn directory_id(index: usize) -> Result<u16> {
    u16::try_from(index)
        .ok()
        .filter(|&id| id <= DIRECTORY_ID_MASK + 1)
        .ok_or(NitroError::TooManyDirectories { count: index })
}

fn tree_name(name: &str) -> Result<(u8, Vec<u8>)> {
    let bytes = encode_name(name)?;
    let len = u8::try_from(bytes.len())
        .ok()
        .filter(|&len| len != 0 && usize::from(len) <= MAX_TREE_NAME_LEN)
        .ok_or_else(|| NitroError::NameTooLong {
            name: name.to_string(),
            max: MAX_TREE_NAME_LEN,
        })?;
    Ok((len, bytes))
}
