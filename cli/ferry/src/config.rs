//! `ferry.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ferry_transfer::TransferOptions;

pub const CONFIG_FILE: &str = "ferry.toml";

/// The top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FerryConfig {
    /// Where references missing from a repository are looked up.
    pub lookup: LookupConfig,
    /// Defaults for `ferry transfer`.
    pub transfer: TransferOptions,
}

/// Lookup configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// Directory repositories, relative to the configuration file.
    pub repositories: Vec<PathBuf>,
}

impl FerryConfig {
    /// Search upward from `start_dir` for a `ferry.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Lookup repositories with relative paths resolved against `base`.
    pub fn lookup_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.lookup
            .repositories
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
            .collect()
    }
}

/// Load the configuration for a command: an explicit file, or the nearest
/// `ferry.toml` above `cwd`, or defaults. Returns the directory relative
/// paths in the file are resolved against.
pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<(FerryConfig, PathBuf)> {
    if let Some(path) = explicit {
        let config = FerryConfig::load(path)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        return Ok((config, base));
    }
    Ok(FerryConfig::find_and_load(cwd)?.unwrap_or_else(|| (FerryConfig::default(), cwd.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: FerryConfig = toml::from_str(
            r#"
[lookup]
repositories = ["../shared-repo", "/abs/repo"]

[transfer]
recursive = true
resources-by-value = false
omit-access-types = ["none"]
"#,
        )
        .unwrap();
        assert!(config.transfer.recursive);
        assert!(config.transfer.is_access_type_omitted("none"));
        let paths = config.lookup_paths(Path::new("/work/project"));
        assert_eq!(
            paths,
            vec![PathBuf::from("/work/project/../shared-repo"), PathBuf::from("/abs/repo")]
        );
    }

    #[test]
    fn empty_config_is_default() {
        let config: FerryConfig = toml::from_str("").unwrap();
        assert!(config.lookup.repositories.is_empty());
        assert_eq!(config.transfer, TransferOptions::default());
    }

    #[test]
    fn reject_unknown_sections() {
        assert!(toml::from_str::<FerryConfig>("[transport]\nrecursive = true\n").is_err());
        assert!(toml::from_str::<FerryConfig>("[transfer]\nrecursiv = true\n").is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[transfer]\noverwrite = true\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, found) = FerryConfig::find_and_load(&nested).unwrap().unwrap();
        assert!(config.transfer.overwrite);
        assert_eq!(found, dir.path());
    }

    #[test]
    fn explicit_file_resolves_against_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[lookup]\nrepositories = [\"shared\"]\n").unwrap();

        let (config, base) = load(Some(&path), Path::new("/elsewhere")).unwrap();
        assert_eq!(base, dir.path());
        assert_eq!(config.lookup_paths(&base), vec![dir.path().join("shared")]);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("reading"));
    }
}
