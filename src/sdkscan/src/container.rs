//! Container decoding boundary
//!
//! Cartridge images, packages and content archives are decoded outside this
//! crate. The walker only needs the handful of operations below.

use crate::keys::{KeySet, TitleKey};
use crate::vfs::{File, FileSystem};
use crate::{Error, Result};

/// Archives that hold content archives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Cartridge image (`.xci`); content lives in its secure partition
    Cartridge,
    /// Package (`.nsp`); content sits in its root
    Package,
}

/// Sections of a content archive the walker looks into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Executable filesystem (main, rtld, sdk, subsdk*)
    Code,
    /// Romfs data filesystem
    Data,
}

/// Decoders for the container formats
pub trait ContainerBackend {
    /// Open a cartridge or package and return the filesystem that holds its
    /// content archives, or `None` when there is none (a cartridge without
    /// a secure partition).
    fn open_archive(
        &self,
        kind: ArchiveKind,
        file: Box<dyn File>,
        keys: &KeySet,
    ) -> Result<Option<Box<dyn FileSystem>>>;

    /// Open a content archive, decrypting its header with `keys`.
    fn open_content(&self, file: Box<dyn File>, keys: &KeySet) -> Result<Box<dyn ContentArchive>>;

    /// Extract the title key from a ticket.
    fn read_ticket(&self, data: &[u8], keys: &KeySet) -> Result<TitleKey>;
}

/// An opened content archive
pub trait ContentArchive {
    fn has_section(&self, kind: SectionKind) -> bool;

    /// Whether the section only holds a patch against a base archive.
    fn is_patch_section(&self, kind: SectionKind) -> bool;

    fn open_section(&self, kind: SectionKind) -> Result<Box<dyn FileSystem>>;
}

/// Backend for builds without a container decoder.
///
/// Every container fails to open, so only loose module files and bundled
/// module directories are processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedBackend;

impl ContainerBackend for UnsupportedBackend {
    fn open_archive(
        &self,
        _kind: ArchiveKind,
        _file: Box<dyn File>,
        _keys: &KeySet,
    ) -> Result<Option<Box<dyn FileSystem>>> {
        Err(Error::Unsupported("archive decoding"))
    }

    fn open_content(&self, _file: Box<dyn File>, _keys: &KeySet) -> Result<Box<dyn ContentArchive>> {
        Err(Error::Unsupported("content archive decoding"))
    }

    fn read_ticket(&self, _data: &[u8], _keys: &KeySet) -> Result<TitleKey> {
        Err(Error::Unsupported("ticket decoding"))
    }
}
