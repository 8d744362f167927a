//! Find command handler

use anyhow::{bail, Context, Result};
use sdkscan::vfs::LocalFileSystem;
use sdkscan::{KeySet, UnsupportedBackend, Walker};
use std::path::{Path, PathBuf};

use crate::config::{resolve_key_file, Config, DEV_KEYS, PROD_KEYS, TITLE_KEYS};

/// Key files used for one run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeyFiles {
    pub keyset: Option<PathBuf>,
    pub title_keys: Option<PathBuf>,
    pub dev_keyset: Option<PathBuf>,
}

impl KeyFiles {
    /// Command line paths first, then configured ones, then `~/.switch`.
    pub fn resolve(
        keyset: Option<PathBuf>,
        title_keys: Option<PathBuf>,
        dev_keyset: Option<PathBuf>,
        config: &Config,
    ) -> Self {
        Self {
            keyset: resolve_key_file(keyset, config.keyset.as_deref(), PROD_KEYS),
            title_keys: resolve_key_file(title_keys, config.title_keys.as_deref(), TITLE_KEYS),
            dev_keyset: resolve_key_file(dev_keyset, config.dev_keyset.as_deref(), DEV_KEYS),
        }
    }

    /// Load the primary key set and the development fallback.
    ///
    /// With `dev` set the development keys become the primary set and no
    /// fallback is used.
    pub fn load(&self, dev: bool) -> Result<(KeySet, Option<KeySet>)> {
        let mut retail = KeySet::new();
        match &self.keyset {
            Some(path) => load_keys(&mut retail, path)?,
            None => tracing::warn!("No key file found; encrypted containers will fail to open"),
        }

        let mut development = match &self.dev_keyset {
            Some(path) => {
                let mut keys = KeySet::dev();
                load_keys(&mut keys, path)?;
                Some(keys)
            }
            None => None,
        };

        if let Some(path) = &self.title_keys {
            let count = retail
                .load_title_keys(path)
                .with_context(|| format!("Failed to load title keys from {}", path.display()))?;
            if let Some(keys) = &mut development {
                keys.load_title_keys(path)?;
            }
            tracing::debug!("Loaded {} title keys from {}", count, path.display());
        }

        if dev {
            return Ok((development.unwrap_or_else(KeySet::dev), None));
        }
        Ok((retail, development))
    }
}

fn load_keys(keys: &mut KeySet, path: &Path) -> Result<()> {
    let count = keys
        .load_keys(path)
        .with_context(|| format!("Failed to load keys from {}", path.display()))?;
    tracing::debug!("Loaded {} keys from {}", count, path.display());
    Ok(())
}

/// Handle the find command
pub fn handle(input: &Path, outdir: &Path, key_files: &KeyFiles, dev: bool) -> Result<()> {
    if !input.is_dir() {
        bail!("Input directory {} does not exist", input.display());
    }

    let (keys, dev_keys) = key_files.load(dev)?;

    let search = LocalFileSystem::open(input)
        .with_context(|| format!("Failed to open input directory {}", input.display()))?;
    let out = LocalFileSystem::create(outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir.display()))?;

    let backend = UnsupportedBackend;
    let mut walker = Walker::new(&backend, keys, dev_keys, Box::new(search), Box::new(out))?;
    let summary = walker
        .run()
        .with_context(|| format!("Failed to search {}", input.display()))?;

    tracing::info!(
        "Visited {} files ({} failed): {} modules in {} sets, {} versions inferred, {} renamed",
        summary.entries,
        summary.failures,
        summary.modules,
        summary.sets,
        summary.reconciled,
        summary.renamed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_prefers_arguments() {
        let config = Config {
            keyset: Some(PathBuf::from("/config/prod.keys")),
            title_keys: Some(PathBuf::from("/config/title.keys")),
            dev_keyset: None,
        };
        let files = KeyFiles::resolve(Some(PathBuf::from("/cli/prod.keys")), None, None, &config);
        assert_eq!(files.keyset, Some(PathBuf::from("/cli/prod.keys")));
        assert_eq!(files.title_keys, Some(PathBuf::from("/config/title.keys")));
    }

    #[test]
    fn test_load_key_sets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let prod = temp_dir.path().join("prod.keys");
        let dev = temp_dir.path().join("dev.keys");
        let titles = temp_dir.path().join("title.keys");
        fs::write(&prod, "header_key = 0011\n").unwrap();
        fs::write(&dev, "header_key = 2233\n").unwrap();
        fs::write(
            &titles,
            "01000000000010000000000000000000 = 000102030405060708090a0b0c0d0e0f\n",
        )
        .unwrap();

        let files = KeyFiles {
            keyset: Some(prod),
            title_keys: Some(titles),
            dev_keyset: Some(dev),
        };

        let (primary, fallback) = files.load(false).unwrap();
        assert!(!primary.is_dev());
        assert_eq!(primary.get("header_key"), Some(&[0x00, 0x11][..]));
        assert_eq!(primary.title_key_count(), 1);
        let fallback = fallback.unwrap();
        assert!(fallback.is_dev());
        assert_eq!(fallback.title_key_count(), 1);

        let (primary, fallback) = files.load(true).unwrap();
        assert!(primary.is_dev());
        assert_eq!(primary.get("header_key"), Some(&[0x22, 0x33][..]));
        assert!(fallback.is_none());
    }

    #[test]
    fn test_bad_key_file_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let prod = temp_dir.path().join("prod.keys");
        fs::write(&prod, "not a key line\n").unwrap();

        let files = KeyFiles {
            keyset: Some(prod),
            ..KeyFiles::default()
        };
        assert!(files.load(false).is_err());
    }

    #[test]
    fn test_find_skips_unreadable_inputs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("input");
        let outdir = temp_dir.path().join("out");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::write(input.join("nested").join("broken.nso"), b"not a module").unwrap();
        fs::write(input.join("game.nsp"), b"package").unwrap();

        handle(&input, &outdir, &KeyFiles::default(), false).unwrap();
        assert!(outdir.is_dir());
        assert_eq!(fs::read_dir(&outdir).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let outdir = temp_dir.path().join("out");
        assert!(handle(&temp_dir.path().join("missing"), &outdir, &KeyFiles::default(), false).is_err());
        assert!(!outdir.exists());
    }
}
