//! In-memory filesystem
//!
//! Cloning a `MemoryFileSystem` yields another handle to the same tree.
//! Container backends use it for small decoded partitions.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::{file_name, normalize, parent_directory, DirEntry, EntryType, File, FileSystem, OpenMode};
use crate::{Error, Result};

type Data = Rc<RefCell<Vec<u8>>>;

#[derive(Default)]
struct Tree {
    files: BTreeMap<String, Data>,
    dirs: BTreeSet<String>,
}

impl Tree {
    fn add_parents(&mut self, path: &str) {
        let mut dir = parent_directory(path);
        loop {
            let done = dir == "/";
            self.dirs.insert(dir.clone());
            if done {
                break;
            }
            dir = parent_directory(&dir);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    tree: Rc<RefCell<Tree>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.tree.borrow_mut().dirs.insert("/".to_string());
        fs
    }

    /// Add or replace a file, creating its parent directories.
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        let path = normalize(path);
        let mut tree = self.tree.borrow_mut();
        tree.add_parents(&path);
        tree.files.insert(path, Rc::new(RefCell::new(data)));
    }

    /// Create an empty directory and its parents.
    pub fn create_dir(&self, path: &str) {
        let path = normalize(path);
        let mut tree = self.tree.borrow_mut();
        tree.add_parents(&path);
        tree.dirs.insert(path);
    }

    /// Current contents of a file.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let tree = self.tree.borrow();
        tree.files.get(&normalize(path)).map(|d| d.borrow().clone())
    }

    /// All file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.tree.borrow().files.keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = normalize(path);
        let tree = self.tree.borrow();
        if !tree.dirs.contains(&dir) {
            return Err(Error::NotFound(dir));
        }

        let mut entries: Vec<DirEntry> = tree
            .dirs
            .iter()
            .filter(|d| d.as_str() != "/" && parent_directory(d) == dir)
            .map(|d| DirEntry {
                name: file_name(d).to_string(),
                path: d.clone(),
                kind: EntryType::Directory,
                size: 0,
            })
            .chain(
                tree.files
                    .iter()
                    .filter(|(p, _)| parent_directory(p) == dir)
                    .map(|(p, data)| DirEntry {
                        name: file_name(p).to_string(),
                        path: p.clone(),
                        kind: EntryType::File,
                        size: data.borrow().len() as u64,
                    }),
            )
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn entry_type(&self, path: &str) -> Result<EntryType> {
        let path = normalize(path);
        let tree = self.tree.borrow();
        if tree.files.contains_key(&path) {
            Ok(EntryType::File)
        } else if tree.dirs.contains(&path) {
            Ok(EntryType::Directory)
        } else {
            Err(Error::NotFound(path))
        }
    }

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>> {
        let path = normalize(path);
        let tree = self.tree.borrow();
        let data = tree
            .files
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound(path))?;
        Ok(Box::new(MemoryFile { data, mode }))
    }

    fn create_file(&self, path: &str, size: u64) -> Result<()> {
        let path = normalize(path);
        if self.entry_type(&path).is_ok() {
            return Err(Error::AlreadyExists(path));
        }
        self.insert(&path, vec![0u8; size as usize]);
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.tree.borrow_mut().files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(path)),
        }
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        if self.entry_type(&to).is_ok() {
            return Err(Error::AlreadyExists(to));
        }

        let mut tree = self.tree.borrow_mut();
        let data = tree.files.remove(&from).ok_or(Error::NotFound(from))?;
        tree.add_parents(&to);
        tree.files.insert(to, data);
        Ok(())
    }
}

struct MemoryFile {
    data: Data,
    mode: OpenMode,
}

impl File for MemoryFile {
    fn size(&mut self) -> Result<u64> {
        Ok(self.data.borrow().len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let data = self.data.borrow();
        let start = (offset as usize).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8], _flush: bool) -> Result<()> {
        if self.mode != OpenMode::Write {
            return Err(Error::ReadOnly);
        }

        let mut data = self.data.borrow_mut();
        let start = offset as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }
}
