//! Repository capabilities consumed by the checker and the transfer engine.
//!
//! Concrete backends (in-memory archives, directory repositories, registry
//! clients) implement these traits; the graph walkers only ever see trait
//! objects.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::warn;

use crate::access::AccessSpec;
use crate::blob::BlobAccess;
use crate::descriptor::{ComponentDescriptor, ComponentMeta, Identity, Reference, Resource, Source};
use crate::error::Result;
use crate::name_version::NameVersion;

/// Read access to the content behind one [`AccessSpec`].
pub trait AccessMethod {
    /// Fetch the blob.
    fn get(&self) -> Result<BlobAccess>;

    /// Media type of the content.
    fn mime_type(&self) -> &str;

    /// Access type name of the spec this method serves.
    fn kind(&self) -> &str;

    /// Whether the content lives inside the owning repository.
    fn is_local(&self) -> bool;
}

/// A store of component versions.
pub trait Repository: Send + Sync {
    /// Human-readable description used in error messages and logs.
    fn description(&self) -> String;

    /// Open a stored component version.
    ///
    /// Fails with a not-found error if the version does not exist.
    fn lookup_component_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Box<dyn ComponentVersionAccess>>;

    /// Whether a component version is stored.
    fn exists_component_version(&self, name: &str, version: &str) -> Result<bool>;

    /// All stored component versions, sorted by name then version.
    fn list_component_versions(&self) -> Result<Vec<NameVersion>>;

    /// Open a new, empty, writable component version.
    ///
    /// Nothing is visible to lookups until [`Repository::add_component_version`].
    fn new_component_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Box<dyn ComponentVersionAccess>>;

    /// Commit the descriptor of a version opened on this repository.
    fn add_component_version(&self, cv: &dyn ComponentVersionAccess) -> Result<()>;

    /// Release this repository handle.
    fn close(&self) -> Result<()>;
}

/// An open component version.
///
/// Handles must be closed exactly once; [`VersionGuard`] takes care of that
/// on every exit path.
pub trait ComponentVersionAccess {
    /// Current descriptor, including uncommitted modifications.
    fn descriptor(&self) -> &ComponentDescriptor;

    /// Identity of this version.
    fn name_version(&self) -> NameVersion {
        self.descriptor().name_version()
    }

    /// The repository this version was opened from.
    fn repository(&self) -> Arc<dyn Repository>;

    /// Obtain an access method for a spec used by this version.
    fn access_method(&self, spec: &AccessSpec) -> Result<Box<dyn AccessMethod>>;

    /// Store a blob with this version and return a local access for it.
    fn add_blob(
        &mut self,
        blob: &BlobAccess,
        hint: Option<&str>,
        global: Option<AccessSpec>,
    ) -> Result<AccessSpec>;

    /// Replace provider, labels and creation time.
    fn set_meta(&mut self, meta: ComponentMeta) -> Result<()>;

    /// Add a resource, replacing one with the same identity.
    fn set_resource(&mut self, resource: Resource) -> Result<()>;

    /// Add a source, replacing one with the same identity.
    fn set_source(&mut self, source: Source) -> Result<()>;

    /// Add a reference, replacing one with the same identity.
    fn set_reference(&mut self, reference: Reference) -> Result<()>;

    fn resource_by_identity(&self, id: &Identity) -> Option<&Resource> {
        self.descriptor().resource_by_identity(id)
    }

    fn source_by_identity(&self, id: &Identity) -> Option<&Source> {
        self.descriptor().source_by_identity(id)
    }

    /// Release this handle. A second close fails.
    fn close(&mut self) -> Result<()>;
}

/// Owns an open component version and closes it exactly once.
///
/// Call [`VersionGuard::close`] on the success path to observe close errors;
/// any other exit path closes the handle on drop and logs a failure.
pub struct VersionGuard {
    inner: Box<dyn ComponentVersionAccess>,
    closed: bool,
}

impl VersionGuard {
    pub fn new(inner: Box<dyn ComponentVersionAccess>) -> Self {
        VersionGuard {
            inner,
            closed: false,
        }
    }

    /// Close the handle, propagating any error.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.inner.close()
    }
}

impl Deref for VersionGuard {
    type Target = dyn ComponentVersionAccess;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DerefMut for VersionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.inner
    }
}

impl Drop for VersionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.inner.close() {
            warn!(version = %self.inner.name_version(), error = %e, "closing component version failed");
        }
    }
}
