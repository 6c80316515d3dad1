//! Completeness checking of component version graphs.
//!
//! Walks the references of a root component version depth first and reports
//! every referenced version that cannot be resolved, together with the path
//! on which it was needed. Revisiting a version on its own path is reported
//! as a recursion error for the root being checked. Each root is checked with
//! a fresh history and cache, so one root's failure never affects another.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use ferry_core::{
    lookup_in, resolve_reference, ComponentVersionAccess, CoreError, History, Identity,
    NameVersion, Repository, Resolver, Result, VersionGuard, KIND_COMPONENT_VERSION,
};

/// Unresolvable versions mapped to the path that needed them.
pub type Missing = BTreeMap<NameVersion, History>;

/// Status token for a root that could not be checked.
pub const STATUS_ERROR: &str = "Error";
/// Status token for a root with unresolvable references.
pub const STATUS_INCOMPLETE: &str = "Incomplete";
/// Status token for a root with non-local resources.
pub const STATUS_RESOURCES: &str = "Resources";
/// Status token for a root with non-local sources.
pub const STATUS_SOURCES: &str = "Sources";
/// Status of a root without findings.
pub const STATUS_OK: &str = "OK";

/// Optional checks beyond reference completeness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Report resources of the root whose content is not stored locally.
    pub local_resources: bool,
    /// Report sources of the root whose content is not stored locally.
    pub local_sources: bool,
}

impl CheckOptions {
    pub fn new() -> Self {
        CheckOptions::default()
    }

    pub fn local_resources(mut self, enabled: bool) -> Self {
        self.local_resources = enabled;
        self
    }

    pub fn local_sources(mut self, enabled: bool) -> Self {
        self.local_sources = enabled;
        self
    }
}

/// Findings for one root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub missing: Missing,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Identity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Identity>,
}

impl CheckResult {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.resources.is_empty() && self.sources.is_empty()
    }
}

/// Diagnostic for one root, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckEntry {
    pub status: String,
    pub component_version: NameVersion,
    #[serde(flatten)]
    pub result: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckEntry {
    fn new(component_version: NameVersion, result: CheckResult, error: Option<String>) -> Self {
        CheckEntry {
            status: status(&result, error.is_some()),
            component_version,
            result,
            error,
        }
    }

    /// Whether the root passed every enabled check.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Comma-joined status tokens in precedence order, `OK` if none apply.
pub fn status(result: &CheckResult, failed: bool) -> String {
    let mut tokens = Vec::new();
    if failed {
        tokens.push(STATUS_ERROR);
    }
    if !result.missing.is_empty() {
        tokens.push(STATUS_INCOMPLETE);
    }
    if !result.resources.is_empty() {
        tokens.push(STATUS_RESOURCES);
    }
    if !result.sources.is_empty() {
        tokens.push(STATUS_SOURCES);
    }
    if tokens.is_empty() {
        STATUS_OK.to_string()
    } else {
        tokens.join(",")
    }
}

type Cache = HashMap<NameVersion, Missing>;

/// Checks component versions for completeness.
#[derive(Default)]
pub struct Checker<'a> {
    options: CheckOptions,
    fallback: Option<&'a dyn Resolver>,
}

impl<'a> Checker<'a> {
    pub fn new(options: CheckOptions) -> Self {
        Checker {
            options,
            fallback: None,
        }
    }

    /// Resolve references missing from the parent's repository here.
    pub fn with_fallback(mut self, resolver: &'a dyn Resolver) -> Self {
        self.fallback = Some(resolver);
        self
    }

    /// Check one root.
    ///
    /// Fails on the first recursion or backend error below the root.
    pub fn check(&self, root: &dyn ComponentVersionAccess) -> Result<CheckResult> {
        let mut result = CheckResult::default();
        self.walk_root(root, &mut result)?;
        Ok(result)
    }

    /// Check one root, turning failures into an `Error` status.
    ///
    /// Findings collected before a failure are kept.
    pub fn check_entry(&self, root: &dyn ComponentVersionAccess) -> CheckEntry {
        let mut result = CheckResult::default();
        let error = self.walk_root(root, &mut result).err();
        let entry = CheckEntry::new(root.name_version(), result, error.map(|e| e.to_string()));
        info!(version = %entry.component_version, status = %entry.status, "checked component version");
        entry
    }

    /// Check the given roots of `repo` independently.
    pub fn check_versions(&self, repo: &dyn Repository, roots: &[NameVersion]) -> Vec<CheckEntry> {
        roots
            .iter()
            .map(|nv| match self.lookup_root(repo, nv) {
                Ok(cv) => {
                    let entry = self.check_entry(&*cv);
                    if let Err(e) = cv.close() {
                        debug!(version = %nv, error = %e, "closing checked version failed");
                    }
                    entry
                }
                Err(e) => CheckEntry::new(nv.clone(), CheckResult::default(), Some(e.to_string())),
            })
            .collect()
    }

    fn lookup_root(&self, repo: &dyn Repository, nv: &NameVersion) -> Result<VersionGuard> {
        if let Some(cv) = lookup_in(repo, nv)? {
            return Ok(cv);
        }
        if let Some(resolver) = self.fallback {
            if let Some(cv) = resolver.lookup(nv)? {
                return Ok(cv);
            }
        }
        Err(CoreError::not_found(KIND_COMPONENT_VERSION, nv.to_string()))
    }

    fn walk_root(&self, root: &dyn ComponentVersionAccess, result: &mut CheckResult) -> Result<()> {
        let history = History::new().add(KIND_COMPONENT_VERSION, &root.name_version())?;
        let mut cache = Cache::new();
        self.handle(&mut cache, root, &history, &mut result.missing)?;
        self.check_local(root, result)
    }

    fn handle(
        &self,
        cache: &mut Cache,
        cv: &dyn ComponentVersionAccess,
        history: &History,
        missing: &mut Missing,
    ) -> Result<()> {
        for reference in &cv.descriptor().references {
            let found = self.missing_for(cache, cv, &reference.target(), history)?;
            missing.extend(found);
        }
        Ok(())
    }

    fn missing_for(
        &self,
        cache: &mut Cache,
        parent: &dyn ComponentVersionAccess,
        id: &NameVersion,
        history: &History,
    ) -> Result<Missing> {
        if let Some(known) = cache.get(id) {
            return Ok(known.clone());
        }

        let history = history.add(KIND_COMPONENT_VERSION, id)?;
        let missing = match resolve_reference(parent, id, self.fallback)? {
            None => {
                debug!(version = %id, history = %history, "reference not found");
                Missing::from([(id.clone(), history)])
            }
            Some(cv) => {
                let mut missing = Missing::new();
                self.handle(cache, &*cv, &history, &mut missing)?;
                cv.close()?;
                missing
            }
        };
        cache.insert(id.clone(), missing.clone());
        Ok(missing)
    }

    fn check_local(&self, root: &dyn ComponentVersionAccess, result: &mut CheckResult) -> Result<()> {
        let descriptor = root.descriptor();
        if self.options.local_resources {
            for resource in &descriptor.resources {
                if !resource.access.is_none() && !root.access_method(&resource.access)?.is_local() {
                    result.resources.push(resource.identity());
                }
            }
        }
        if self.options.local_sources {
            for source in &descriptor.sources {
                if !source.access.is_none() && !root.access_method(&source.access)?.is_local() {
                    result.sources.push(source.identity());
                }
            }
        }
        Ok(())
    }
}
