//! Key sets handed to the container backend
//!
//! Key files are plain text, one `name = hexvalue` pair per line. Title key
//! files use the same layout with the rights id as the name. Lines starting
//! with `;` or `#` are comments.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::{Error, Result};

/// Rights id of a title-key protected content archive
pub type RightsId = [u8; 16];

/// Title key extracted from a ticket or title key file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleKey {
    pub rights_id: RightsId,
    pub key: [u8; 16],
}

/// Named keys plus imported title keys
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: BTreeMap<String, Vec<u8>>,
    title_keys: HashMap<RightsId, [u8; 16]>,
    dev: bool,
}

impl KeySet {
    /// Empty retail key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty development key set
    pub fn dev() -> Self {
        Self {
            dev: true,
            ..Self::default()
        }
    }

    pub fn is_dev(&self) -> bool {
        self.dev
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.keys.get(name).map(Vec::as_slice)
    }

    pub fn title_key(&self, rights_id: &RightsId) -> Option<&[u8; 16]> {
        self.title_keys.get(rights_id)
    }

    pub fn title_key_count(&self) -> usize {
        self.title_keys.len()
    }

    pub fn add_title_key(&mut self, title_key: TitleKey) {
        self.title_keys.insert(title_key.rights_id, title_key.key);
    }

    /// Load named keys from a key file.
    pub fn load_keys(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        self.parse_keys(&text)
    }

    /// Load title keys from a title key file.
    pub fn load_title_keys(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        self.parse_title_keys(&text)
    }

    /// Parse `name = hex` lines into the named keys.
    pub fn parse_keys(&mut self, text: &str) -> Result<usize> {
        let entries = parse_pairs(text)?;
        let count = entries.len();
        for (_, name, value) in entries {
            self.keys.insert(name.to_lowercase(), value);
        }
        Ok(count)
    }

    /// Parse `rightsid = titlekey` lines into the title keys.
    pub fn parse_title_keys(&mut self, text: &str) -> Result<usize> {
        let entries = parse_pairs(text)?;
        let count = entries.len();
        for (line, name, key) in entries {
            let rights_id = decode_fixed::<16>(line, name)?;
            let key: [u8; 16] = key.as_slice().try_into().map_err(|_| Error::KeyFile {
                line,
                reason: format!("title key must be 16 bytes, got {}", key.len()),
            })?;
            self.add_title_key(TitleKey { rights_id, key });
        }
        Ok(count)
    }
}

fn parse_pairs(text: &str) -> Result<Vec<(usize, &str, Vec<u8>)>> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        let (name, value) = trimmed.split_once(['=', ',']).ok_or_else(|| Error::KeyFile {
            line,
            reason: "expected 'name = value'".to_string(),
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::KeyFile {
                line,
                reason: "empty key name".to_string(),
            });
        }

        let value = hex::decode(value.trim()).map_err(|e| Error::KeyFile {
            line,
            reason: e.to_string(),
        })?;
        entries.push((line, name, value));
    }
    Ok(entries)
}

fn decode_fixed<const N: usize>(line: usize, text: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(text).map_err(|e| Error::KeyFile {
        line,
        reason: e.to_string(),
    })?;
    bytes.as_slice().try_into().map_err(|_| Error::KeyFile {
        line,
        reason: format!("expected {} bytes, got {}", N, bytes.len()),
    })
}
