//! Directory tree model
//!
//! Directories live in an arena indexed by [`DirIndex`]; parent/child links
//! are index pairs. Files are allocation table positions ([`FileId`]) into a
//! single list of [`NamedExtent`]s, so a directory's file list is a view onto
//! the table rather than a copy of it.

use crate::fat::Extent;

/// Position of a file in the allocation table
pub type FileId = usize;

/// Position of a directory in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirIndex(pub usize);

impl DirIndex {
    /// The root directory
    pub const ROOT: Self = Self(0);
}

/// Allocation table entry with the name attached during decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedExtent {
    /// Byte range of the file
    pub extent: Extent,
    /// Name from the owning subtable, if any entry claimed this file
    pub name: Option<String>,
}

impl NamedExtent {
    /// Unnamed entry
    pub fn new(extent: Extent) -> Self {
        Self { extent, name: None }
    }
}

/// Root-or-subdirectory specific fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryKind {
    /// The root directory
    Root {
        /// Directory count from the root record
        num_dirs: u16,
    },
    /// A named subdirectory
    Sub {
        /// Parent directory id (12 bits)
        parent_dir_id: u16,
        /// Directory name
        name: String,
    },
}

/// One directory of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    /// 12-bit directory id (0 for the root)
    pub id: u16,
    /// Offset of this directory's subtable from the start of the table
    pub subtable_offset: u32,
    /// Id of the first file listed in the subtable
    pub first_file_id: u16,
    /// Root or subdirectory fields
    pub kind: DirectoryKind,
    /// Containing directory
    pub parent: Option<DirIndex>,
    /// Subdirectories in subtable order
    pub children: Vec<DirIndex>,
    /// Files in subtable order, then unclaimed files for the root
    pub files: Vec<FileId>,
}

impl Directory {
    pub(crate) fn root(subtable_offset: u32, first_file_id: u16, num_dirs: u16) -> Self {
        Self {
            id: 0,
            subtable_offset,
            first_file_id,
            kind: DirectoryKind::Root { num_dirs },
            parent: None,
            children: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Directory name (`None` for the root)
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            DirectoryKind::Root { .. } => None,
            DirectoryKind::Sub { name, .. } => Some(name),
        }
    }

    /// Whether this is the root
    pub fn is_root(&self) -> bool {
        matches!(self.kind, DirectoryKind::Root { .. })
    }
}

/// A decoded NitroFS tree with its allocation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NitroFs {
    /// Allocation table with decoded names
    pub allocation_table: Vec<NamedExtent>,
    pub(crate) directories: Vec<Directory>,
}

impl NitroFs {
    /// Root directory
    pub fn root(&self) -> &Directory {
        &self.directories[DirIndex::ROOT.0]
    }

    /// Directory at `index`
    pub fn directory(&self, index: DirIndex) -> Option<&Directory> {
        self.directories.get(index.0)
    }

    /// All directories, root first, then in discovery order
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    /// Allocation table entry for `id`
    pub fn file(&self, id: FileId) -> Option<&NamedExtent> {
        self.allocation_table.get(id)
    }

    /// Number of files in the allocation table
    pub fn file_count(&self) -> usize {
        self.allocation_table.len()
    }

    /// Resolve a `/`-separated path relative to the root to a file id
    pub fn lookup(&self, path: &str) -> Option<FileId> {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let file_name = components.pop()?;

        let mut dir = self.root();
        for component in components {
            dir = dir
                .children
                .iter()
                .filter_map(|&child| self.directory(child))
                .find(|child| child.name() == Some(component))?;
        }

        dir.files
            .iter()
            .copied()
            .find(|&id| self.file(id).and_then(|f| f.name.as_deref()) == Some(file_name))
    }

    /// Resolve a `/`-separated path to a directory
    pub fn find_directory(&self, path: &str) -> Option<DirIndex> {
        let mut index = DirIndex::ROOT;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            index = self
                .directory(index)?
                .children
                .iter()
                .copied()
                .find(|&child| self.directory(child).and_then(Directory::name) == Some(component))?;
        }
        Some(index)
    }

    /// Directory that lists file `id`
    pub fn owner(&self, id: FileId) -> Option<DirIndex> {
        self.directories
            .iter()
            .position(|dir| dir.files.contains(&id))
            .map(DirIndex)
    }

    /// Full path of a directory (empty for the root)
    pub fn directory_path(&self, index: DirIndex) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = self.directory(index)?;
        while let Some(name) = current.name() {
            parts.push(name);
            current = self.directory(current.parent?)?;
        }
        parts.reverse();
        Some(parts.join("/"))
    }

    /// Full path of a named file
    pub fn file_path(&self, id: FileId) -> Option<String> {
        let name = self.file(id)?.name.as_deref()?;
        let dir = self.directory_path(self.owner(id)?)?;
        Some(if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        })
    }

    /// Depth-first listing of every file with its path
    ///
    /// Unnamed files are listed under the root by their file id.
    pub fn walk(&self) -> Vec<(String, FileId)> {
        let mut out = Vec::with_capacity(self.allocation_table.len());
        let mut stack = vec![(DirIndex::ROOT, String::new())];

        while let Some((index, prefix)) = stack.pop() {
            let Some(dir) = self.directory(index) else {
                continue;
            };
            for &id in &dir.files {
                let name = self
                    .file(id)
                    .and_then(|f| f.name.clone())
                    .unwrap_or_else(|| id.to_string());
                out.push((format!("{prefix}{name}"), id));
            }
            for &child in dir.children.iter().rev() {
                if let Some(name) = self.directory(child).and_then(Directory::name) {
                    stack.push((child, format!("{prefix}{name}/")));
                }
            }
        }
        out
    }

    /// Indented listing of the tree for debugging
    ///
    /// Each level is indented by one space. Root files without a name are shown
    /// by their position in the root's file list.
    pub fn render_tree(&self) -> String {
        let mut out = String::from("root\n");
        let root = self.root();
        for &child in &root.children {
            self.render_directory(child, 1, &mut out);
        }
        for (position, &id) in root.files.iter().enumerate() {
            match self.file(id).and_then(|f| f.name.as_deref()) {
                Some(name) => push_line(&mut out, 0, name),
                None => push_line(&mut out, 0, &position.to_string()),
            }
        }
        out
    }

    fn render_directory(&self, index: DirIndex, depth: usize, out: &mut String) {
        let Some(dir) = self.directory(index) else {
            return;
        };
        push_line(out, depth, dir.name().unwrap_or_default());
        for &child in &dir.children {
            self.render_directory(child, depth + 1, out);
        }
        for &id in &dir.files {
            let name = self.file(id).and_then(|f| f.name.as_deref()).unwrap_or_default();
            push_line(out, depth + 1, name);
        }
    }
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    out.extend(std::iter::repeat_n(' ', depth));
    out.push_str(text);
    out.push('\n');
}
