//! Versions for modules that do not carry a build string

use super::Catalog;

impl Catalog {
    /// Give every unversioned module without a build string the version of
    /// the lowest-versioned set it was seen in.
    ///
    /// The version data is copied from that set's representative. Must run
    /// after every set has been recorded. Returns how many modules were
    /// resolved.
    pub fn reconcile_versions(&mut self) -> usize {
        let mut resolved = 0;

        for index in 0..self.modules.len() {
            let module = &self.modules[index];
            if module.build_string.is_some() || module.info.is_some() {
                continue;
            }

            let floor = module
                .sets
                .iter()
                .filter_map(|&set| self.sets[set.0].version)
                .min();
            let Some(floor) = floor else {
                continue;
            };

            let representative = module
                .sets
                .iter()
                .map(|&set| &self.sets[set.0])
                .find(|set| set.version == Some(floor))
                .and_then(|set| set.representative);
            let Some(info) = representative.and_then(|rep| self.modules[rep.0].info.clone()) else {
                continue;
            };

            let module = &mut self.modules[index];
            tracing::debug!(
                "{} {} takes SDK {} from its sets",
                module.name,
                module.build_id.short(),
                info.version
            );
            if module.set_info(info) {
                resolved += 1;
            }
        }

        resolved
    }
}
