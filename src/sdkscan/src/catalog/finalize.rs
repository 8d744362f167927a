//! Final output names

use super::{Catalog, Module};
use crate::vfs::FileSystem;

/// Extension given to finalized module files
pub const MODULE_EXTENSION: &str = "nso";

impl Module {
    /// Descriptive name without extension:
    /// `name-version-buildtype-shortid`, or `name-shortid` when unversioned.
    pub fn final_name(&self) -> String {
        match self.info() {
            Some(info) => format!(
                "{}-{}-{}-{}",
                self.name,
                info.version_string,
                info.build_type,
                self.short_build_id()
            ),
            None => format!("{}-{}", self.name, self.short_build_id()),
        }
    }
}

impl Catalog {
    /// Rename every extracted module from its build id to its final name.
    ///
    /// Rename failures are logged and skipped. Returns how many files were
    /// renamed.
    pub fn finalize(&self, out: &dyn FileSystem) -> usize {
        let mut renamed = 0;

        for module in &self.modules {
            let old_name = format!("/{}", module.build_id.temp_file_name());
            let new_name = format!("/{}.{}", module.final_name(), MODULE_EXTENSION);

            match out.rename_file(&old_name, &new_name) {
                Ok(()) => {
                    tracing::info!("{}", new_name.trim_start_matches('/'));
                    renamed += 1;
                }
                Err(e) => tracing::warn!("Error {} renaming {} to {}", e, old_name, new_name),
            }
        }

        renamed
    }
}
