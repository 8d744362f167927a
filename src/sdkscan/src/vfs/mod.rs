//! Virtual filesystem
//!
//! Every source of bytes the walker touches (the input tree on disk, the
//! partitions inside a cartridge, the sections of a content archive, the
//! output directory) is exposed through the same two traits. Paths are
//! absolute and `/`-separated, rooted at the filesystem they belong to.

mod client;
mod local;
mod memory;
mod subdir;

pub use client::FileSystemClient;
pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;
pub use subdir::SubdirFileSystem;

use crate::{Error, Result};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Access requested when opening a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// A single entry returned by directory listing or enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name without any path
    pub name: String,
    /// Full path of the entry within its filesystem
    pub path: String,
    pub kind: EntryType,
    pub size: u64,
}

/// Options for [`FileSystemExt::enumerate`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    pub recursive: bool,
}

impl SearchOptions {
    pub const NONE: Self = Self {
        case_insensitive: false,
        recursive: false,
    };

    pub const RECURSIVE: Self = Self {
        case_insensitive: false,
        recursive: true,
    };

    pub const RECURSIVE_IGNORE_CASE: Self = Self {
        case_insensitive: true,
        recursive: true,
    };
}

/// An open file
pub trait File {
    fn size(&mut self) -> Result<u64>;

    /// Read up to `buf.len()` bytes at `offset`, returning how many were read.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Write `data` at `offset`, growing the file if needed.
    fn write_at(&mut self, offset: u64, data: &[u8], flush: bool) -> Result<()>;
}

/// A tree of files and directories
pub trait FileSystem {
    /// Immediate children of a directory
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    fn entry_type(&self, path: &str) -> Result<EntryType>;

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>>;

    /// Create an empty file of `size` bytes. Fails if the path exists.
    fn create_file(&self, path: &str, size: u64) -> Result<()>;

    fn delete_file(&self, path: &str) -> Result<()>;

    /// Rename a file. Fails if `to` already exists.
    fn rename_file(&self, from: &str, to: &str) -> Result<()>;
}

/// Helpers available on every [`FileSystem`]
pub trait FileSystemExt: FileSystem {
    /// List entries below `path` whose name matches a glob `pattern`.
    ///
    /// Directories that cannot be listed during recursion are skipped.
    fn enumerate(&self, path: &str, pattern: &str, options: SearchOptions) -> Result<Vec<DirEntry>> {
        let mut found = Vec::new();
        let pattern = if options.case_insensitive {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };
        enumerate_into(self, path, &pattern, options, &mut found)?;
        Ok(found)
    }

    /// Whether `path` exists and is a regular file.
    fn is_file(&self, path: &str) -> bool {
        matches!(self.entry_type(path), Ok(EntryType::File))
    }

    /// Read an entire file into memory.
    fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.open_file(path, OpenMode::Read)?;
        let size = file.size()? as usize;
        let mut data = vec![0u8; size];
        read_exact_at(file.as_mut(), 0, &mut data)?;
        Ok(data)
    }
}

impl<T: FileSystem + ?Sized> FileSystemExt for T {}

fn enumerate_into<F: FileSystem + ?Sized>(
    fs: &F,
    path: &str,
    pattern: &str,
    options: SearchOptions,
    found: &mut Vec<DirEntry>,
) -> Result<()> {
    for entry in fs.read_dir(path)? {
        if matches_pattern(pattern, &entry.name, options.case_insensitive) {
            found.push(entry.clone());
        }

        if options.recursive && entry.kind == EntryType::Directory {
            if let Err(e) = enumerate_into(fs, &entry.path, pattern, options, found) {
                tracing::debug!("Skipping unreadable directory {}: {}", entry.path, e);
            }
        }
    }
    Ok(())
}

/// Match a file name against a glob pattern (`pattern` already lowercased
/// when `ignore_case` is set).
fn matches_pattern(pattern: &str, name: &str, ignore_case: bool) -> bool {
    if ignore_case {
        glob_match::glob_match(pattern, &name.to_lowercase())
    } else {
        glob_match::glob_match(pattern, name)
    }
}

/// Fill `buf` from `offset`, failing if the file ends early.
pub fn read_exact_at(file: &mut dyn File, offset: u64, buf: &mut [u8]) -> Result<()> {
    let mut done = 0;
    while done < buf.len() {
        let read = file.read_at(offset + done as u64, &mut buf[done..])?;
        if read == 0 {
            return Err(Error::ShortRead {
                expected: buf.len(),
                actual: done,
            });
        }
        done += read;
    }
    Ok(())
}

/// Normalize a path to `/a/b` form.
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    format!("/{}", parts.join("/"))
}

/// Join a directory path and an entry name.
pub fn combine(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent directory of a path; the root is its own parent.
///
/// A mount prefix such as `search:` is preserved.
pub fn parent_directory(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) if trimmed[..pos].ends_with(':') || pos == 0 => trimmed[..=pos].to_string(),
        Some(pos) => trimmed[..pos].to_string(),
        None => trimmed.to_string(),
    }
}

/// Final component of a path.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}
