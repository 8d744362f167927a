//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting default key files.

use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

/// Handle the configure command
///
/// # Arguments
/// * `keyset` - Default key file
/// * `title_keys` - Default title key file
/// * `dev_keyset` - Default development key file
/// * `show` - If true, show current configuration
pub fn handle(
    keyset: Option<PathBuf>,
    title_keys: Option<PathBuf>,
    dev_keyset: Option<PathBuf>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if apply(&mut config, keyset, title_keys, dev_keyset) {
        config.save()?;
        show_config(&config);
    } else {
        show_usage();
    }

    Ok(())
}

/// Merge the given paths into `config`, returning whether anything changed.
fn apply(
    config: &mut Config,
    keyset: Option<PathBuf>,
    title_keys: Option<PathBuf>,
    dev_keyset: Option<PathBuf>,
) -> bool {
    let changed = keyset.is_some() || title_keys.is_some() || dev_keyset.is_some();
    if let Some(path) = keyset {
        config.keyset = Some(path);
    }
    if let Some(path) = title_keys {
        config.title_keys = Some(path);
    }
    if let Some(path) = dev_keyset {
        config.dev_keyset = Some(path);
    }
    changed
}

/// Display current configuration
fn show_config(config: &Config) {
    let entries = [
        ("Key file", &config.keyset),
        ("Title key file", &config.title_keys),
        ("Development key file", &config.dev_keyset),
    ];
    for (label, path) in entries {
        match path {
            Some(path) => println!("{}: {}", label, path.display()),
            None => println!("{}: not configured", label),
        }
    }

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: sdkscan configure --keyset PATH [--title-keys PATH] [--dev-keyset PATH]");
    println!("   or: sdkscan configure --show");
    println!();
    println!("Unconfigured key files are looked up in ~/.switch.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_unset_paths() {
        let mut config = Config {
            keyset: Some(PathBuf::from("/old/prod.keys")),
            title_keys: Some(PathBuf::from("/old/title.keys")),
            dev_keyset: None,
        };

        assert!(apply(
            &mut config,
            None,
            None,
            Some(PathBuf::from("/new/dev.keys"))
        ));
        assert_eq!(config.keyset, Some(PathBuf::from("/old/prod.keys")));
        assert_eq!(config.dev_keyset, Some(PathBuf::from("/new/dev.keys")));

        assert!(!apply(&mut config, None, None, None));
    }

    #[test]
    fn test_show_usage_does_not_panic() {
        show_usage();
        show_config(&Config::default());
    }
}
