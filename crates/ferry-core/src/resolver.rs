//! Component version lookup across repositories.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::name_version::NameVersion;
use crate::repository::{ComponentVersionAccess, Repository, VersionGuard};

/// Looks up component versions by identity.
pub trait Resolver {
    /// Open `nv`, or return `None` if no reachable repository holds it.
    fn lookup(&self, nv: &NameVersion) -> Result<Option<VersionGuard>>;
}

/// Resolves against a single repository.
pub struct RepositoryResolver {
    repo: Arc<dyn Repository>,
}

impl RepositoryResolver {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        RepositoryResolver { repo }
    }
}

impl Resolver for RepositoryResolver {
    fn lookup(&self, nv: &NameVersion) -> Result<Option<VersionGuard>> {
        lookup_in(self.repo.as_ref(), nv)
    }
}

/// Tries a list of resolvers in order; the first hit wins.
#[derive(Default)]
pub struct CompoundResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl CompoundResolver {
    pub fn new() -> Self {
        CompoundResolver::default()
    }

    /// Builder: append a resolver.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Builder: append a resolver for a repository.
    pub fn with_repository(self, repo: Arc<dyn Repository>) -> Self {
        self.with(RepositoryResolver::new(repo))
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Resolver for CompoundResolver {
    fn lookup(&self, nv: &NameVersion) -> Result<Option<VersionGuard>> {
        for resolver in &self.resolvers {
            if let Some(cv) = resolver.lookup(nv)? {
                return Ok(Some(cv));
            }
        }
        Ok(None)
    }
}

/// Open `nv` in `repo`, mapping not-found to `None`.
pub fn lookup_in(repo: &dyn Repository, nv: &NameVersion) -> Result<Option<VersionGuard>> {
    match repo.lookup_component_version(nv.name(), nv.version()) {
        Ok(cv) => Ok(Some(VersionGuard::new(cv))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolve a reference of `parent`: the parent's own repository first, then
/// the optional fallback resolver.
pub fn resolve_reference(
    parent: &dyn ComponentVersionAccess,
    nv: &NameVersion,
    fallback: Option<&dyn Resolver>,
) -> Result<Option<VersionGuard>> {
    let repo = parent.repository();
    if let Some(cv) = lookup_in(repo.as_ref(), nv)? {
        return Ok(Some(cv));
    }
    match fallback {
        Some(resolver) => {
            debug!(version = %nv, repository = %repo.description(), "not in current repository, trying lookup resolver");
            resolver.lookup(nv)
        }
        None => Ok(None),
    }
}
