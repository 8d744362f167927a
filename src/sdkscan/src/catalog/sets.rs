//! Grouping modules discovered together

use super::{Catalog, ModuleId, ModuleSet, ModuleSource, SetId};
use crate::vfs::FileSystem;

impl Catalog {
    /// Resolve a batch of module files and record them as one set.
    ///
    /// Files that fail to resolve are logged and left out. Returns `None`
    /// when nothing in the batch resolved.
    pub fn build_set(&mut self, batch: Vec<ModuleSource>, out: &dyn FileSystem) -> Option<SetId> {
        if batch.is_empty() {
            return None;
        }

        let mut members = Vec::with_capacity(batch.len());
        for mut source in batch {
            match self.get_or_create(&mut source, out) {
                Ok(id) => members.push(id),
                Err(e) => tracing::warn!("Error processing {}: {}", source.path, e),
            }
        }

        self.create_set(members)
    }

    /// Record already-resolved modules as one set.
    pub fn create_set(&mut self, members: Vec<ModuleId>) -> Option<SetId> {
        let mut unique: Vec<ModuleId> = Vec::with_capacity(members.len());
        for id in members {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return None;
        }

        let version = unique.iter().filter_map(|&id| self.module(id).version()).max();
        let representative = version.and_then(|max| {
            unique
                .iter()
                .copied()
                .find(|&id| self.module(id).version() == Some(max))
        });

        let set_id = SetId(self.sets.len());
        for &id in &unique {
            self.modules[id.0].sets.push(set_id);
        }
        self.sets.push(ModuleSet {
            members: unique,
            version,
            representative,
        });

        if let Some(version) = version {
            tracing::debug!("Set {} at SDK {}", set_id.0, version);
        }
        Some(set_id)
    }
}
