//! Filesystem backed by a directory on disk

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{combine, normalize, DirEntry, EntryType, File, FileSystem, OpenMode};
use crate::{Error, Result};

/// A directory on disk exposed as a [`FileSystem`] rooted at that directory
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Open a directory. Fails if it does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// Open a directory, creating it first if needed.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Self::open(root)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let normalized = normalize(path);
        let mut full = self.root.clone();
        for part in normalized.split('/').filter(|p| !p.is_empty()) {
            if part == ".." {
                return Err(Error::InvalidPath(path.to_string()));
            }
            full.push(part);
        }
        Ok(full)
    }

    fn not_found_or(path: &str, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_string())
        } else {
            Error::Io(e)
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() {
            return Err(Error::NotFound(path.to_string()));
        }

        let parent = normalize(path);
        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io) => Error::Io(io),
                None => Error::InvalidPath(path.to_string()),
            })?;

            let name = entry.file_name().to_string_lossy().to_string();
            let meta = entry.metadata().map_err(|e| match e.into_io_error() {
                Some(io) => Error::Io(io),
                None => Error::InvalidPath(name.clone()),
            })?;

            entries.push(DirEntry {
                path: combine(&parent, &name),
                name,
                kind: if meta.is_dir() {
                    EntryType::Directory
                } else {
                    EntryType::File
                },
                size: meta.len(),
            });
        }

        Ok(entries)
    }

    fn entry_type(&self, path: &str) -> Result<EntryType> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| Self::not_found_or(path, e))?;
        Ok(if meta.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        })
    }

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn File>> {
        let full = self.resolve(path)?;
        let file = match mode {
            OpenMode::Read => fs::File::open(&full),
            OpenMode::Write => fs::OpenOptions::new().read(true).write(true).open(&full),
        }
        .map_err(|e| Self::not_found_or(path, e))?;

        Ok(Box::new(LocalFile { file, mode }))
    }

    fn create_file(&self, path: &str, size: u64) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::AlreadyExists(path.to_string())
                } else {
                    Error::Io(e)
                }
            })?;
        file.set_len(size)?;
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::remove_file(&full).map_err(|e| Self::not_found_or(path, e))
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if !source.is_file() {
            return Err(Error::NotFound(from.to_string()));
        }
        if target.exists() {
            return Err(Error::AlreadyExists(to.to_string()));
        }
        fs::rename(&source, &target)?;
        Ok(())
    }
}

struct LocalFile {
    file: fs::File,
    mode: OpenMode,
}

impl File for LocalFile {
    fn size(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut done = 0;
        while done < buf.len() {
            let read = self.file.read(&mut buf[done..])?;
            if read == 0 {
                break;
            }
            done += read;
        }
        Ok(done)
    }

    fn write_at(&mut self, offset: u64, data: &[u8], flush: bool) -> Result<()> {
        if self.mode != OpenMode::Write {
            return Err(Error::ReadOnly);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        if flush {
            self.file.flush()?;
        }
        Ok(())
    }
}
