//! Module catalog
//!
//! Holds one [`Module`] per distinct build id and every [`ModuleSet`]
//! observed during a run. Sets live in an arena; modules refer to them by
//! [`SetId`] and sets refer back by [`ModuleId`].

mod finalize;
mod reconcile;
mod sets;

use std::collections::HashMap;

use crate::build_id::BuildId;
use crate::nso::{self, NsoHeader, SegmentKind};
use crate::version::{self, VersionInfo};
use crate::vfs::{read_exact_at, File, FileSystem, OpenMode};
use crate::Result;

/// Index of a module in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

/// Index of a set in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(usize);

/// A distinct module build
#[derive(Debug, Clone)]
pub struct Module {
    pub build_id: BuildId,
    /// Name from the module path record, empty if absent
    pub name: String,
    /// Raw string following the SDK marker, if the module carries one
    pub build_string: Option<String>,
    info: Option<VersionInfo>,
    sets: Vec<SetId>,
}

impl Module {
    pub fn new(build_id: BuildId, name: String, build_string: Option<String>) -> Self {
        Self {
            build_id,
            name,
            build_string,
            info: None,
            sets: Vec::new(),
        }
    }

    pub fn info(&self) -> Option<&VersionInfo> {
        self.info.as_ref()
    }

    pub fn version(&self) -> Option<version::Version> {
        self.info.as_ref().map(|i| i.version)
    }

    pub fn version_string(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.version_string.as_str())
    }

    pub fn build_type(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.build_type.as_str())
    }

    /// Sets this module was observed in, in discovery order
    pub fn sets(&self) -> &[SetId] {
        &self.sets
    }

    pub fn short_build_id(&self) -> String {
        self.build_id.short()
    }

    /// Assign version data unless the module already has some.
    ///
    /// Returns whether the value was taken.
    pub fn set_info(&mut self, info: VersionInfo) -> bool {
        if self.info.is_some() {
            return false;
        }
        self.info = Some(info);
        true
    }
}

/// Modules discovered together
#[derive(Debug, Clone)]
pub struct ModuleSet {
    pub members: Vec<ModuleId>,
    /// Highest member version, if any member has one
    pub version: Option<version::Version>,
    /// First member holding `version`
    pub representative: Option<ModuleId>,
}

/// A candidate module file and the path it was found at
pub struct ModuleSource {
    pub path: String,
    pub file: Box<dyn File>,
}

impl ModuleSource {
    pub fn new(path: impl Into<String>, file: Box<dyn File>) -> Self {
        Self {
            path: path.into(),
            file,
        }
    }

    /// Open `path` on `fs` for reading.
    pub fn open(fs: &dyn FileSystem, path: &str) -> Result<Self> {
        Ok(Self::new(path, fs.open_file(path, OpenMode::Read)?))
    }
}

/// Discovery state for one run
#[derive(Default)]
pub struct Catalog {
    modules: Vec<Module>,
    by_build_id: HashMap<BuildId, ModuleId>,
    sets: Vec<ModuleSet>,
    scratch: Vec<u8>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose read buffer is reserved up front.
    pub fn with_scratch_capacity(capacity: usize) -> Self {
        Self {
            scratch: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn set(&self, id: SetId) -> &ModuleSet {
        &self.sets[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    pub fn sets(&self) -> impl Iterator<Item = (SetId, &ModuleSet)> {
        self.sets.iter().enumerate().map(|(i, s)| (SetId(i), s))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn find(&self, build_id: &BuildId) -> Option<ModuleId> {
        self.by_build_id.get(build_id).copied()
    }

    /// Resolve a module file to its catalog entry, extracting it on first sight.
    ///
    /// The first time a build id is seen its metadata is read from the
    /// read-only segment and the whole file is written to `out` under the
    /// build id. Later sightings return the existing entry without any I/O
    /// beyond the header read.
    pub fn get_or_create(&mut self, source: &mut ModuleSource, out: &dyn FileSystem) -> Result<ModuleId> {
        let file = source.file.as_mut();
        let header = NsoHeader::read(file)?;

        if let Some(id) = self.find(&header.build_id) {
            return Ok(id);
        }

        let rodata = header.read_segment(file, SegmentKind::Ro)?;
        let mut module = Module::new(
            header.build_id,
            nso::module_name(&rodata),
            nso::build_string(&rodata),
        );
        if let Some(build) = &module.build_string {
            module.set_info(version::parse_build_string(build)?);
        }

        self.store(file, &header.build_id, out)?;

        tracing::debug!(
            "New module {} ({}) from {}",
            module.name,
            header.build_id,
            source.path
        );

        let id = ModuleId(self.modules.len());
        self.by_build_id.insert(header.build_id, id);
        self.modules.push(module);
        Ok(id)
    }

    /// Copy a module file to `out` under its temporary name.
    fn store(&mut self, file: &mut dyn File, build_id: &BuildId, out: &dyn FileSystem) -> Result<()> {
        let size = file.size()? as usize;
        self.scratch.clear();
        self.scratch.resize(size, 0);
        read_exact_at(file, 0, &mut self.scratch)?;

        let path = format!("/{}", build_id.temp_file_name());
        // Stale output from an earlier run
        let _ = out.delete_file(&path);
        out.create_file(&path, size as u64)?;

        let mut target = out.open_file(&path, OpenMode::Write)?;
        target.write_at(0, &self.scratch, true)?;
        Ok(())
    }

    /// Take version data from a file name like `nnSdk-5_1_0-Release-a1b2c3d4.nso`.
    ///
    /// Only applies when the name and short id in the file name match the
    /// module and the module has no version yet.
    pub fn adopt_file_name(&mut self, id: ModuleId, file_name: &str) -> bool {
        let Some(parsed) = version::parse_file_name(file_name) else {
            return false;
        };

        let module = &mut self.modules[id.0];
        if parsed.name != module.name || parsed.short_id != module.short_build_id() {
            return false;
        }

        match VersionInfo::new(&parsed.version_string, &parsed.build_type) {
            Ok(info) => module.set_info(info),
            Err(e) => {
                tracing::debug!("Ignoring version in file name {}: {}", file_name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::nso;
    use crate::vfs::MemoryFileSystem;
    use crate::{Error, Version};

    pub(super) fn source(fs: &MemoryFileSystem, path: &str, data: Vec<u8>) -> ModuleSource {
        fs.insert(path, data);
        ModuleSource::open(fs, path).unwrap()
    }

    #[test]
    fn test_get_or_create_extracts_metadata() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let data = nso(1, "nnSdk", Some("SDK MW+Nintendo+NintendoSDK_nnSdk-5_1_0-Release"));
        let mut src = source(&input, "/sdk", data.clone());
        let id = catalog.get_or_create(&mut src, &out).unwrap();

        let module = catalog.module(id);
        assert_eq!(module.name, "nnSdk");
        assert_eq!(module.version(), Some(Version::new(5, 1, 0)));
        assert_eq!(module.version_string(), Some("5_1_0"));
        assert_eq!(module.build_type(), Some("Release"));
        assert_eq!(out.get(&format!("/{}", module.build_id)).unwrap(), data);
    }

    #[test]
    fn test_identity_uniqueness() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let data = nso(2, "nnSdk", Some("SDK MW+A+B-4_4_0-Release"));
        let mut first = source(&input, "/a/sdk", data.clone());
        let id = catalog.get_or_create(&mut first, &out).unwrap();

        // Delete the extracted copy; a second sighting must not write it again
        let temp = format!("/{}", catalog.module(id).build_id);
        out.delete_file(&temp).unwrap();

        let mut second = source(&input, "/b/sdk", data);
        assert_eq!(catalog.get_or_create(&mut second, &out).unwrap(), id);
        assert_eq!(catalog.module_count(), 1);
        assert!(out.get(&temp).is_none());
    }

    #[test]
    fn test_module_without_marker() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let mut src = source(&input, "/rtld", nso(3, "nnrtld", None));
        let id = catalog.get_or_create(&mut src, &out).unwrap();

        let module = catalog.module(id);
        assert_eq!(module.build_string, None);
        assert_eq!(module.info(), None);
    }

    #[test]
    fn test_malformed_build_string_is_not_recorded() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let mut src = source(&input, "/sdk", nso(4, "nnSdk", Some("SDK MW+no-version")));
        assert!(matches!(
            catalog.get_or_create(&mut src, &out),
            Err(Error::MalformedBuildString(_))
        ));
        assert_eq!(catalog.module_count(), 0);
        assert!(out.file_paths().is_empty());
    }

    #[test]
    fn test_stale_output_is_replaced() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let data = nso(5, "nnSdk", Some("SDK MW+A+B-1_0_0-Release"));
        let mut src = source(&input, "/sdk", data.clone());
        let build_id = NsoHeader::read(src.file.as_mut()).unwrap().build_id;
        out.insert(&format!("/{}", build_id), b"stale".to_vec());

        catalog.get_or_create(&mut src, &out).unwrap();
        assert_eq!(out.get(&format!("/{}", build_id)).unwrap(), data);
    }

    #[test]
    fn test_version_is_never_overwritten() {
        let mut module = Module::new(BuildId([0; 32]), "nnSdk".into(), None);
        assert!(module.set_info(VersionInfo::new("1_0_0", "Release").unwrap()));
        assert!(!module.set_info(VersionInfo::new("9_0_0", "Debug").unwrap()));
        assert_eq!(module.version(), Some(Version::new(1, 0, 0)));
        assert_eq!(module.build_type(), Some("Release"));
    }

    #[test]
    fn test_adopt_file_name() {
        let input = MemoryFileSystem::new();
        let out = MemoryFileSystem::new();
        let mut catalog = Catalog::new();

        let mut src = source(&input, "/x.nso", nso(0xa1, "nnSdk", None));
        let id = catalog.get_or_create(&mut src, &out).unwrap();
        let short = catalog.module(id).short_build_id();
        assert_eq!(short, "a1a1a1a1");

        assert!(!catalog.adopt_file_name(id, "nnSdk-5_1_0_Release-deadbeef.nso"));
        assert!(!catalog.adopt_file_name(id, "nnrtld-5_1_0_Release-a1a1a1a1.nso"));
        assert!(!catalog.adopt_file_name(id, "nnSdk-5_x_0-Release-a1a1a1a1.nso"));
        assert_eq!(catalog.module(id).info(), None);

        assert!(catalog.adopt_file_name(id, "nnSdk-5_1_0_Release-a1a1a1a1.nso"));
        assert_eq!(catalog.module(id).version_string(), Some("5_1_0"));
        assert_eq!(catalog.module(id).build_type(), Some("Release"));

        // Already versioned
        assert!(!catalog.adopt_file_name(id, "nnSdk-6_0_0-Debug-a1a1a1a1.nso"));
        assert_eq!(catalog.module(id).version(), Some(Version::new(5, 1, 0)));
    }
}
