//! Mount table addressing filesystems as `name:/path`

use std::collections::HashMap;

use super::{DirEntry, EntryType, File, FileSystem, FileSystemExt, OpenMode, SearchOptions};
use crate::{Error, Result};

/// Named filesystems, addressed with `mount:/path/inside`.
#[derive(Default)]
pub struct FileSystemClient {
    mounts: HashMap<String, Box<dyn FileSystem>>,
}

impl FileSystemClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, name: &str, fs: Box<dyn FileSystem>) -> Result<()> {
        if self.mounts.contains_key(name) {
            return Err(Error::MountExists(name.to_string()));
        }
        self.mounts.insert(name.to_string(), fs);
        Ok(())
    }

    pub fn unmount(&mut self, name: &str) -> Result<Box<dyn FileSystem>> {
        self.mounts
            .remove(name)
            .ok_or_else(|| Error::MountNotFound(name.to_string()))
    }

    /// Filesystem mounted under `name`
    pub fn get(&self, name: &str) -> Result<&dyn FileSystem> {
        self.mounts
            .get(name)
            .map(|fs| fs.as_ref())
            .ok_or_else(|| Error::MountNotFound(name.to_string()))
    }

    /// Split `mount:/path` into the mount name and the inner path.
    pub fn split_path(path: &str) -> Result<(&str, &str)> {
        match path.split_once(':') {
            Some((mount, inner)) if !mount.is_empty() && inner.starts_with('/') => {
                Ok((mount, inner))
            }
            _ => Err(Error::InvalidPath(path.to_string())),
        }
    }

    fn resolve<'p>(&self, path: &'p str) -> Result<(&dyn FileSystem, &'p str)> {
        let (mount, inner) = Self::split_path(path)?;
        Ok((self.get(mount)?, inner))
    }

    /// Enumerate matching entries; returned paths carry the mount prefix.
    pub fn enumerate(
        &self,
        path: &str,
        pattern: &str,
        options: SearchOptions,
    ) -> Result<Vec<DirEntry>> {
        let (mount, inner) = Self::split_path(path)?;
        let entries = self.get(mount)?.enumerate(inner, pattern, options)?;
        Ok(entries
            .into_iter()
            .map(|entry| DirEntry {
                path: format!("{}:{}", mount, entry.path),
                ..entry
            })
            .collect())
    }

    pub fn entry_type(&self, path: &str) -> Result<EntryType> {
        let (fs, inner) = self.resolve(path)?;
        fs.entry_type(inner)
    }

    pub fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>> {
        let (fs, inner) = self.resolve(path)?;
        fs.open_file(inner, mode)
    }

    pub fn create_file(&self, path: &str, size: u64) -> Result<()> {
        let (fs, inner) = self.resolve(path)?;
        fs.create_file(inner, size)
    }

    pub fn delete_file(&self, path: &str) -> Result<()> {
        let (fs, inner) = self.resolve(path)?;
        fs.delete_file(inner)
    }

    pub fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let (from_mount, from_inner) = Self::split_path(from)?;
        let (to_mount, to_inner) = Self::split_path(to)?;
        if from_mount != to_mount {
            return Err(Error::InvalidPath(format!(
                "cannot rename across mounts: {} -> {}",
                from, to
            )));
        }
        self.get(from_mount)?.rename_file(from_inner, to_inner)
    }
}
