//! SDK version strings
//!
//! Build strings look like `SDK MW+Nintendo+NintendoSDK_nnSdk-5_1_0-Release`:
//! three `-`-separated fields, the second being the version with its
//! components joined by `_`.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// SDK version triple, ordered by major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parse an underscore-separated version such as `5_1_0`.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::MalformedVersionString(s.to_string());

        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 3 {
            return Err(malformed());
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version metadata attached to a module.
///
/// The three values always travel together: a module either has all of
/// them or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Version as written in the build string (`5_1_0`)
    pub version_string: String,
    pub version: Version,
    /// Build flavour (`Release`, `Debug`, `Develop`)
    pub build_type: String,
}

impl VersionInfo {
    pub fn new(version_string: &str, build_type: &str) -> Result<Self> {
        Ok(Self {
            version: version_string.parse()?,
            version_string: version_string.to_string(),
            build_type: build_type.to_string(),
        })
    }
}

/// Parse a build string found after the SDK marker.
pub fn parse_build_string(build_string: &str) -> Result<VersionInfo> {
    let fields: Vec<&str> = build_string.split('-').collect();
    if fields.len() != 3 {
        return Err(Error::MalformedBuildString(build_string.to_string()));
    }

    VersionInfo::new(fields[1], fields[2])
}

/// Version data encoded in a previously finalized module file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameInfo {
    pub name: String,
    pub version_string: String,
    pub build_type: String,
    pub short_id: String,
}

/// Parse a module file name of the form `name-version-buildtype-shortid.nso`.
///
/// The older `name-major_minor_patch_buildtype-shortid.nso` spelling is
/// accepted as well. Returns `None` for anything else.
pub fn parse_file_name(file_name: &str) -> Option<FileNameInfo> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if !extension.eq_ignore_ascii_case("nso") {
        return None;
    }

    let fields: Vec<&str> = stem.split('-').collect();
    let (name, version_string, build_type, short_id) = match fields.as_slice() {
        [name, version, build_type, short_id] => {
            (*name, version.to_string(), build_type.to_string(), *short_id)
        }
        [name, combined, short_id] => {
            let (version, build_type) = combined.rsplit_once('_')?;
            (*name, version.to_string(), build_type.to_string(), *short_id)
        }
        _ => return None,
    };

    Some(FileNameInfo {
        name: name.to_string(),
        version_string,
        build_type,
        short_id: short_id.to_string(),
    })
}
