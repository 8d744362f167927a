//! SDK module finder
//!
//! Scans a tree of game packages for embedded NSO modules (the dynamic
//! loader and the SDK libraries), keeps one copy of each distinct build,
//! and names the extracted files after the SDK version they belong to.
//!
//! # Pipeline
//!
//! 1. The [`Walker`] visits cartridge images, packages, content archives and
//!    loose module files below the input root.
//! 2. Every batch of modules found together (one code section, one bundled
//!    directory, one loose file) is handed to [`Catalog::build_set`], which
//!    deduplicates modules by build id and records the batch as a set.
//! 3. Once the whole tree is walked, [`Catalog::reconcile_versions`] gives
//!    modules without an embedded version marker the lowest version of any
//!    set they were seen in.
//! 4. [`Catalog::finalize`] renames the extracted files from their build id
//!    to `name-version-buildtype-shortid.nso`.
//!
//! Container decoding is not part of this crate; it is reached through the
//! [`ContainerBackend`] trait.

pub mod build_id;
pub mod catalog;
pub mod container;
pub mod keys;
pub mod marker;
pub mod nso;
pub mod version;
pub mod vfs;
pub mod walker;

#[cfg(test)]
mod testutil;

pub use build_id::BuildId;
pub use catalog::{Catalog, Module, ModuleId, ModuleSet, ModuleSource, SetId};
pub use container::{ArchiveKind, ContainerBackend, ContentArchive, SectionKind, UnsupportedBackend};
pub use keys::{KeySet, RightsId, TitleKey};
pub use version::{Version, VersionInfo};
pub use walker::{RunSummary, Walker};

/// Marker preceding the SDK build string in a module's read-only segment
pub const BUILD_MARKER: &str = "SDK MW";

/// Errors from module discovery
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No filesystem mounted as '{0}'")]
    MountNotFound(String),

    #[error("A filesystem is already mounted as '{0}'")]
    MountExists(String),

    #[error("File was not opened for writing")]
    ReadOnly,

    #[error("Invalid NSO magic: expected 'NSO0', got {0:02x?}")]
    InvalidNsoMagic([u8; 4]),

    #[error("Invalid NSO segment: {0}")]
    InvalidSegment(String),

    #[error("LZ4 decompression error: {0}")]
    Decompression(#[from] lz4_flex::block::DecompressError),

    #[error("Decompression size mismatch: expected {expected}, got {actual}")]
    DecompressionSize { expected: usize, actual: usize },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Unknown build string format {0}")]
    MalformedBuildString(String),

    #[error("Unknown version string format {0}")]
    MalformedVersionString(String),

    #[error("Key file line {line}: {reason}")]
    KeyFile { line: usize, reason: String },

    #[error("Invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Unsupported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
