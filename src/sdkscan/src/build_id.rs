//! Module build identifiers

use std::fmt;

/// Length of the short form used in output file names
pub const SHORT_LEN: usize = 8;

/// 32-byte identifier stamped into every module by the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildId(pub [u8; 32]);

impl BuildId {
    /// First eight hex characters of the canonical form.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..SHORT_LEN / 2])
    }

    /// Name of the temporary output file holding this module.
    pub fn temp_file_name(&self) -> String {
        self.to_string()
    }
}

impl From<[u8; 32]> for BuildId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
