//! View of a subdirectory as its own filesystem

use super::{normalize, DirEntry, EntryType, File, FileSystem, OpenMode};
use crate::Result;

/// Exposes `root` of a parent filesystem as `/`.
pub struct SubdirFileSystem<'a> {
    parent: &'a dyn FileSystem,
    root: String,
}

impl<'a> SubdirFileSystem<'a> {
    pub fn new(parent: &'a dyn FileSystem, root: &str) -> Result<Self> {
        let root = normalize(root);
        // Fail early if the directory does not exist
        parent.read_dir(&root)?;
        Ok(Self { parent, root })
    }

    fn full_path(&self, path: &str) -> String {
        let path = normalize(path);
        if self.root == "/" {
            path
        } else if path == "/" {
            self.root.clone()
        } else {
            format!("{}{}", self.root, path)
        }
    }

    fn local_path(&self, full: &str) -> String {
        if self.root == "/" {
            return full.to_string();
        }
        match full.strip_prefix(&self.root) {
            Some("") => "/".to_string(),
            Some(rest) => rest.to_string(),
            None => full.to_string(),
        }
    }
}

impl FileSystem for SubdirFileSystem<'_> {
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let entries = self.parent.read_dir(&self.full_path(path))?;
        Ok(entries
            .into_iter()
            .map(|entry| DirEntry {
                path: self.local_path(&entry.path),
                ..entry
            })
            .collect())
    }

    fn entry_type(&self, path: &str) -> Result<EntryType> {
        self.parent.entry_type(&self.full_path(path))
    }

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>> {
        self.parent.open_file(&self.full_path(path), mode)
    }

    fn create_file(&self, path: &str, size: u64) -> Result<()> {
        self.parent.create_file(&self.full_path(path), size)
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        self.parent.delete_file(&self.full_path(path))
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        self.parent
            .rename_file(&self.full_path(from), &self.full_path(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{FileSystemExt, MemoryFileSystem, SearchOptions};

    #[test]
    fn test_subdir_paths_are_relative() {
        let fs = MemoryFileSystem::new();
        fs.insert("/lib/nx/sdk", b"sdk".to_vec());
        fs.insert("/lib/nx/rtld", b"rtld".to_vec());
        fs.insert("/other/rtld", b"x".to_vec());

        let sub = SubdirFileSystem::new(&fs, "/lib/nx").unwrap();
        let found = sub.enumerate("/", "rtld", SearchOptions::RECURSIVE).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/rtld");
        assert_eq!(sub.read_all("/sdk").unwrap(), b"sdk");
        assert_eq!(sub.entry_type("/").unwrap(), EntryType::Directory);
    }

    #[test]
    fn test_subdir_missing_root() {
        let fs = MemoryFileSystem::new();
        assert!(SubdirFileSystem::new(&fs, "/missing").is_err());
    }
}
