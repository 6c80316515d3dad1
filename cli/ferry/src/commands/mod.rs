//! CLI command implementations.

pub mod check;
pub mod transfer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use ferry_core::{CompoundResolver, NameVersion, Repository};
use ferry_repo::{ExternalArtifacts, FileRepository};

/// Open the directory repository at `path`. Unless `create` is set the
/// directory must already exist.
pub fn open_repository(
    path: &Path,
    artifacts: &ExternalArtifacts,
    create: bool,
) -> Result<Arc<FileRepository>> {
    if !create && !path.is_dir() {
        bail!("repository {} does not exist", path.display());
    }
    FileRepository::open(path, artifacts.clone())
        .with_context(|| format!("opening repository {}", path.display()))
}

/// Lookup repositories, in order, as one resolver. The opened repositories
/// are returned too so they can be closed explicitly.
pub fn lookup_resolver(
    paths: &[PathBuf],
    artifacts: &ExternalArtifacts,
) -> Result<(CompoundResolver, Vec<Arc<FileRepository>>)> {
    let mut resolver = CompoundResolver::new();
    let mut repos = Vec::with_capacity(paths.len());
    for path in paths {
        let repo = open_repository(path, artifacts, false)
            .with_context(|| format!("lookup repository {}", path.display()))?;
        resolver = resolver.with_repository(repo.clone());
        repos.push(repo);
    }
    Ok((resolver, repos))
}

/// Parse `name:version` arguments.
pub fn parse_versions(args: &[String]) -> Result<Vec<NameVersion>> {
    args.iter()
        .map(|a| a.parse::<NameVersion>().map_err(anyhow::Error::from))
        .collect()
}

/// The explicit roots, or every version in `repo` if none are given.
pub fn select_roots(repo: &dyn Repository, args: &[String]) -> Result<Vec<NameVersion>> {
    if args.is_empty() {
        return repo
            .list_component_versions()
            .with_context(|| format!("listing {}", repo.description()));
    }
    parse_versions(args)
}

/// Close repositories, reporting the first failure.
pub fn close_all(repos: &[Arc<FileRepository>]) -> Result<()> {
    for repo in repos {
        repo.close()
            .with_context(|| format!("closing {}", repo.description()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_repository_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let err = open_repository(&path, &ExternalArtifacts::new(), false)
            .err()
            .expect("missing repository opened");
        assert!(err.to_string().contains("does not exist"));
        assert!(!path.exists());

        open_repository(&path, &ExternalArtifacts::new(), true).unwrap();
        assert!(path.join("components").is_dir());
    }

    #[test]
    fn parse_version_arguments() {
        let versions = parse_versions(&["acme.org/app:v1".to_string()]).unwrap();
        assert_eq!(versions, vec![NameVersion::new("acme.org/app", "v1")]);
        assert!(parse_versions(&["no-version".to_string()]).is_err());
    }
}
