//! Input tree traversal
//!
//! The walker owns the run: it mounts the input and output filesystems,
//! visits every cartridge image, package, content archive and loose module
//! below the input root, then reconciles versions and renames the outputs.

use std::collections::HashSet;

use crate::catalog::{Catalog, ModuleSource};
use crate::container::{ArchiveKind, ContainerBackend, ContentArchive, SectionKind};
use crate::keys::KeySet;
use crate::vfs::{
    combine, file_name, parent_directory, EntryType, FileSystem, FileSystemClient, FileSystemExt,
    OpenMode, SearchOptions, SubdirFileSystem,
};
use crate::Result;

/// Mount name of the input tree
pub const SEARCH_MOUNT: &str = "search";
/// Mount name of the output directory
pub const OUT_MOUNT: &str = "out";

/// Reserved size of the buffer modules are copied through
pub const SCRATCH_CAPACITY: usize = 20 * 1024 * 1024;

/// Input file patterns, in processing order
const SEARCH_PATTERNS: [&str; 4] = ["*.xci", "*.nsp", "*.nca", "*.nso"];

/// Modules whose presence marks a directory as a bundled module set
const BUNDLE_MARKERS: [&str; 2] = ["nnSdk.nso", "nnrtld.nso"];

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Input files visited
    pub entries: usize,
    /// Input files that failed and were skipped
    pub failures: usize,
    /// Distinct modules extracted
    pub modules: usize,
    /// Sets recorded
    pub sets: usize,
    /// Modules that took their version from a set
    pub reconciled: usize,
    /// Output files given their final name
    pub renamed: usize,
}

/// Runs discovery over one input tree
pub struct Walker<'b> {
    client: FileSystemClient,
    state: WalkState<'b>,
}

struct WalkState<'b> {
    backend: &'b dyn ContainerBackend,
    keys: KeySet,
    dev_keys: Option<KeySet>,
    catalog: Catalog,
    /// Directories already processed as bundled sets
    bundled_dirs: HashSet<String>,
    /// Directories whose tickets were imported
    ticket_dirs: HashSet<String>,
}

impl<'b> Walker<'b> {
    /// Mount `search` and `out` and prepare a run.
    ///
    /// `dev_keys`, when present, is tried once for any content archive the
    /// primary keys fail to open.
    pub fn new(
        backend: &'b dyn ContainerBackend,
        keys: KeySet,
        dev_keys: Option<KeySet>,
        search: Box<dyn FileSystem>,
        out: Box<dyn FileSystem>,
    ) -> Result<Self> {
        let mut client = FileSystemClient::new();
        client.mount(SEARCH_MOUNT, search)?;
        client.mount(OUT_MOUNT, out)?;

        Ok(Self {
            client,
            state: WalkState {
                backend,
                keys,
                dev_keys,
                catalog: Catalog::with_scratch_capacity(SCRATCH_CAPACITY),
                bundled_dirs: HashSet::new(),
                ticket_dirs: HashSet::new(),
            },
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.state.catalog
    }

    /// Walk the input tree, reconcile versions and finalize the outputs.
    ///
    /// Errors for individual inputs are logged and counted. Only a failure
    /// to list the input root aborts the run. Both mounts are released
    /// afterwards.
    pub fn run(&mut self) -> Result<RunSummary> {
        let root = format!("{}:/", SEARCH_MOUNT);
        let mut entries = Vec::new();
        for pattern in SEARCH_PATTERNS {
            let found = self
                .client
                .enumerate(&root, pattern, SearchOptions::RECURSIVE_IGNORE_CASE)?;
            entries.extend(found.into_iter().filter(|e| e.kind == EntryType::File));
        }

        let search = self.client.get(SEARCH_MOUNT)?;
        let out = self.client.get(OUT_MOUNT)?;
        let mut summary = RunSummary::default();

        for entry in &entries {
            tracing::info!("{}", entry.path);
            summary.entries += 1;

            let (_, path) = FileSystemClient::split_path(&entry.path)?;
            if let Err(e) = self.state.process_entry(search, out, path, &entry.name) {
                tracing::warn!("Error processing {}: {}", entry.path, e);
                summary.failures += 1;
            }
        }

        let catalog = &mut self.state.catalog;
        summary.reconciled = catalog.reconcile_versions();
        summary.renamed = catalog.finalize(out);
        summary.modules = catalog.module_count();
        summary.sets = catalog.set_count();

        self.client.unmount(OUT_MOUNT)?;
        self.client.unmount(SEARCH_MOUNT)?;
        Ok(summary)
    }
}

impl WalkState<'_> {
    fn process_entry(
        &mut self,
        search: &dyn FileSystem,
        out: &dyn FileSystem,
        path: &str,
        name: &str,
    ) -> Result<()> {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xci" => self.process_archive(ArchiveKind::Cartridge, search, out, path),
            "nsp" => self.process_archive(ArchiveKind::Package, search, out, path),
            "nca" => self.process_loose_content(search, out, path),
            "nso" => self.process_loose_module(search, out, path),
            _ => Ok(()),
        }
    }

    fn process_archive(
        &mut self,
        kind: ArchiveKind,
        search: &dyn FileSystem,
        out: &dyn FileSystem,
        path: &str,
    ) -> Result<()> {
        let file = search.open_file(path, OpenMode::Read)?;
        let Some(contents) = self.backend.open_archive(kind, file, &self.keys)? else {
            tracing::info!("{} has no secure partition", path);
            return Ok(());
        };
        self.process_content_fs(contents.as_ref(), out)
    }

    /// Import tickets, then process every content archive in the root of `fs`.
    fn process_content_fs(&mut self, fs: &dyn FileSystem, out: &dyn FileSystem) -> Result<()> {
        if let Err(e) = self.import_tickets(fs, "/") {
            tracing::warn!("Error importing tickets: {}", e);
        }

        for entry in fs.enumerate("/", "*.nca", SearchOptions::NONE)? {
            if entry.kind != EntryType::File {
                continue;
            }
            if let Err(e) = self.process_content_file(fs, &entry.path, out) {
                tracing::warn!("Error processing {}: {}", entry.path, e);
            }
        }
        Ok(())
    }

    /// A content archive lying in the input tree.
    fn process_loose_content(
        &mut self,
        search: &dyn FileSystem,
        out: &dyn FileSystem,
        path: &str,
    ) -> Result<()> {
        let dir = parent_directory(path);
        if self.ticket_dirs.insert(dir.clone()) {
            if let Err(e) = self.import_tickets(search, &dir) {
                tracing::warn!("Error importing tickets from {}: {}", dir, e);
            }
        }
        self.process_content_file(search, path, out)
    }

    fn process_content_file(
        &mut self,
        fs: &dyn FileSystem,
        path: &str,
        out: &dyn FileSystem,
    ) -> Result<()> {
        let content = self.open_content(fs, path)?;
        self.process_content(content.as_ref(), out);
        Ok(())
    }

    /// Open a content archive with the primary keys, falling back once to
    /// the development keys.
    fn open_content(&self, fs: &dyn FileSystem, path: &str) -> Result<Box<dyn ContentArchive>> {
        let file = fs.open_file(path, OpenMode::Read)?;
        match self.backend.open_content(file, &self.keys) {
            Ok(content) => Ok(content),
            Err(e) => {
                let Some(dev_keys) = &self.dev_keys else {
                    return Err(e);
                };
                tracing::debug!("Retrying {} with development keys after: {}", path, e);
                let file = fs.open_file(path, OpenMode::Read)?;
                self.backend.open_content(file, dev_keys)
            }
        }
    }

    /// Process the code section and any module bundles in the data section.
    ///
    /// A section that fails is logged and does not stop the other one.
    fn process_content(&mut self, content: &dyn ContentArchive, out: &dyn FileSystem) {
        if content.has_section(SectionKind::Code) {
            match content.open_section(SectionKind::Code) {
                Ok(code) => self.process_code_fs(code.as_ref(), out),
                Err(e) => tracing::warn!("Error opening {:?} section: {}", SectionKind::Code, e),
            }
        }

        if content.has_section(SectionKind::Data) && !content.is_patch_section(SectionKind::Data) {
            match content.open_section(SectionKind::Data) {
                Ok(data) => self.process_data_fs(data.as_ref(), out),
                Err(e) => tracing::warn!("Error opening {:?} section: {}", SectionKind::Data, e),
            }
        }
    }

    /// Every directory holding an entry named `sdk` is a bundled code filesystem.
    fn process_data_fs(&mut self, data: &dyn FileSystem, out: &dyn FileSystem) {
        let entries = match data.enumerate("/", "sdk", SearchOptions::RECURSIVE) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Error searching data section: {}", e);
                return;
            }
        };

        for entry in entries {
            let dir = parent_directory(&entry.path);
            tracing::debug!("Modules bundled in data section at {}", dir);
            match SubdirFileSystem::new(data, &dir) {
                Ok(code) => self.process_code_fs(&code, out),
                Err(e) => tracing::warn!("Error opening {}: {}", dir, e),
            }
        }
    }

    /// Collect the loader and SDK modules of a code filesystem as one set.
    fn process_code_fs(&mut self, fs: &dyn FileSystem, out: &dyn FileSystem) {
        let mut batch = Vec::new();
        for pattern in ["rtld", "*sdk*"] {
            let entries = match fs.enumerate("/", pattern, SearchOptions::RECURSIVE) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Error searching for {}: {}", pattern, e);
                    continue;
                }
            };
            for entry in entries.into_iter().filter(|e| e.kind == EntryType::File) {
                match ModuleSource::open(fs, &entry.path) {
                    Ok(source) => batch.push(source),
                    Err(e) => tracing::warn!("Error opening {}: {}", entry.path, e),
                }
            }
        }
        self.catalog.build_set(batch, out);
    }

    fn process_loose_module(
        &mut self,
        search: &dyn FileSystem,
        out: &dyn FileSystem,
        path: &str,
    ) -> Result<()> {
        let dir = parent_directory(path);
        if self.bundled_dirs.contains(&dir) {
            tracing::debug!("{} already processed with {}", path, dir);
            return Ok(());
        }

        let bundled = BUNDLE_MARKERS
            .iter()
            .all(|name| search.is_file(&combine(&dir, name)));
        if bundled {
            self.bundled_dirs.insert(dir.clone());
            let mut batch = Vec::new();
            for entry in search.enumerate(&dir, "*.nso", SearchOptions::NONE)? {
                if entry.kind != EntryType::File {
                    continue;
                }
                match ModuleSource::open(search, &entry.path) {
                    Ok(source) => batch.push(source),
                    Err(e) => tracing::warn!("Error opening {}: {}", entry.path, e),
                }
            }
            self.catalog.build_set(batch, out);
            return Ok(());
        }

        let mut source = ModuleSource::open(search, path)?;
        let id = self.catalog.get_or_create(&mut source, out)?;
        if self.catalog.adopt_file_name(id, file_name(path)) {
            tracing::debug!("Version of {} taken from its file name", path);
        }
        self.catalog.create_set(vec![id]);
        Ok(())
    }

    /// Import the title keys of every ticket directly in `dir`.
    fn import_tickets(&mut self, fs: &dyn FileSystem, dir: &str) -> Result<usize> {
        let mut imported = 0;
        for entry in fs.enumerate(dir, "*.tik", SearchOptions::NONE)? {
            if entry.kind != EntryType::File {
                continue;
            }
            let title_key = match fs
                .read_all(&entry.path)
                .and_then(|data| self.backend.read_ticket(&data, &self.keys))
            {
                Ok(title_key) => title_key,
                Err(e) => {
                    tracing::warn!("Error importing ticket {}: {}", entry.path, e);
                    continue;
                }
            };

            tracing::debug!("Title key for {}", hex::encode(title_key.rights_id));
            self.keys.add_title_key(title_key);
            if let Some(dev_keys) = &mut self.dev_keys {
                dev_keys.add_title_key(title_key);
            }
            imported += 1;
        }
        Ok(imported)
    }
}
