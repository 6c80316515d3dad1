//! Generic repository over a pluggable storage backend.
//!
//! [`StorageRepository`] implements the repository capabilities once; the
//! backends ([`crate::memory::MemoryStorage`],
//! [`crate::local::DirectoryStorage`]) only persist descriptors and blobs.
//! The repository and each open component version hold their own [`View`] of
//! the storage, so the backend is released when the last of them closes.

use std::sync::{Arc, Weak};

use ferry_core::{
    check_hint, AccessMethod, AccessSpec, BlobAccess, ComponentDescriptor, ComponentMeta,
    ComponentVersionAccess, CoreError, Digest, NameVersion, Reference, Repository, Resource,
    Result, Source, KIND_COMPONENT_VERSION, KIND_RESOURCE, KIND_SOURCE,
};
use tracing::debug;

use crate::external::{ExternalArtifacts, ExternalMethod};
use crate::shared::View;
use crate::version::sort_name_versions;

/// Persistence backend for descriptors and content-addressed blobs.
pub trait Storage: Send + 'static {
    /// Human-readable description of the backend.
    fn description(&self) -> String;

    /// Read a stored descriptor.
    fn read_descriptor(&self, nv: &NameVersion) -> Result<Option<ComponentDescriptor>>;

    /// Store or replace a descriptor.
    fn write_descriptor(&mut self, descriptor: &ComponentDescriptor) -> Result<()>;

    /// All stored component versions, in any order.
    fn list(&self) -> Result<Vec<NameVersion>>;

    /// Read a blob by digest.
    fn read_blob(&self, digest: &Digest) -> Result<Option<Vec<u8>>>;

    /// Store a blob under its digest. Storing the same digest twice is a no-op.
    fn write_blob(&mut self, digest: &Digest, data: &[u8]) -> Result<()>;

    /// Release backend resources. Called once, when the last view closes.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A repository of component versions kept in a [`Storage`] backend.
pub struct StorageRepository<S: Storage> {
    this: Weak<StorageRepository<S>>,
    view: View<S>,
    description: String,
    artifacts: ExternalArtifacts,
}

impl<S: Storage> std::fmt::Debug for StorageRepository<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRepository")
            .field("description", &self.description)
            .field("open_views", &self.view.open_views())
            .finish_non_exhaustive()
    }
}

impl<S: Storage> StorageRepository<S> {
    /// Wrap a storage backend.
    pub fn with_storage(storage: S, artifacts: ExternalArtifacts) -> Arc<Self> {
        let description = storage.description();
        Arc::new_cyclic(|this| StorageRepository {
            this: this.clone(),
            view: View::open(storage),
            description,
            artifacts,
        })
    }

    /// The external artifact registry used for `ociArtifact` accesses.
    pub fn artifacts(&self) -> &ExternalArtifacts {
        &self.artifacts
    }

    /// Number of open views: the repository itself plus open versions.
    pub fn open_views(&self) -> usize {
        self.view.open_views()
    }

    /// Run `f` against the backend.
    pub(crate) fn with_storage_ref<R>(&self, f: impl FnOnce(&mut S) -> Result<R>) -> Result<R> {
        self.view.with(f)
    }

    fn open_version(&self, descriptor: ComponentDescriptor) -> Result<Box<dyn ComponentVersionAccess>> {
        let repo = self.this.upgrade().ok_or_else(|| CoreError::Closed {
            what: format!("repository {}", self.description),
        })?;
        Ok(Box::new(VersionHandle {
            view: self.view.dup()?,
            repo,
            descriptor,
        }))
    }
}

impl<S: Storage> Repository for StorageRepository<S> {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn lookup_component_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Box<dyn ComponentVersionAccess>> {
        let nv = NameVersion::new(name, version);
        let descriptor = self
            .view
            .with(|s| s.read_descriptor(&nv))?
            .ok_or_else(|| CoreError::not_found(KIND_COMPONENT_VERSION, nv.to_string()))?;
        self.open_version(descriptor)
    }

    fn exists_component_version(&self, name: &str, version: &str) -> Result<bool> {
        let nv = NameVersion::new(name, version);
        Ok(self.view.with(|s| s.read_descriptor(&nv))?.is_some())
    }

    fn list_component_versions(&self) -> Result<Vec<NameVersion>> {
        let mut list = self.view.with(|s| s.list())?;
        sort_name_versions(&mut list);
        Ok(list)
    }

    fn new_component_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Box<dyn ComponentVersionAccess>> {
        self.open_version(ComponentDescriptor::new(name, version))
    }

    fn add_component_version(&self, cv: &dyn ComponentVersionAccess) -> Result<()> {
        let descriptor = cv.descriptor();
        descriptor.validate()?;
        debug!(version = %descriptor.name_version(), repository = %self.description, "storing descriptor");
        self.view.with(|s| s.write_descriptor(descriptor))
    }

    fn close(&self) -> Result<()> {
        self.view.close()
    }
}

/// An open component version of a [`StorageRepository`].
pub struct VersionHandle<S: Storage> {
    repo: Arc<StorageRepository<S>>,
    view: View<S>,
    descriptor: ComponentDescriptor,
}

impl<S: Storage> VersionHandle<S> {
    fn ensure_open(&self) -> Result<()> {
        if self.view.is_closed() {
            return Err(CoreError::Closed {
                what: format!("component version {}", self.descriptor.name_version()),
            });
        }
        Ok(())
    }
}

impl<S: Storage> ComponentVersionAccess for VersionHandle<S> {
    fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    fn repository(&self) -> Arc<dyn Repository> {
        self.repo.clone()
    }

    fn access_method(&self, spec: &AccessSpec) -> Result<Box<dyn AccessMethod>> {
        self.ensure_open()?;
        match spec {
            AccessSpec::LocalBlob {
                local_reference,
                media_type,
                ..
            } => Ok(Box::new(LocalBlobMethod {
                view: self.view.dup()?,
                digest: Digest::from_string(local_reference.clone()),
                media_type: media_type.clone(),
            })),
            AccessSpec::OciArtifact { image_reference } => Ok(Box::new(ExternalMethod::new(
                self.repo.artifacts.clone(),
                image_reference.clone(),
            ))),
            AccessSpec::None => Ok(Box::new(NoneMethod)),
        }
    }

    fn add_blob(
        &mut self,
        blob: &BlobAccess,
        hint: Option<&str>,
        global: Option<AccessSpec>,
    ) -> Result<AccessSpec> {
        self.ensure_open()?;
        self.view
            .with(|s| s.write_blob(blob.digest(), blob.data()))?;
        Ok(AccessSpec::local_blob(
            blob.digest(),
            blob.media_type(),
            hint.map(str::to_string),
            global,
        ))
    }

    fn set_meta(&mut self, meta: ComponentMeta) -> Result<()> {
        self.ensure_open()?;
        self.descriptor.set_meta(meta);
        Ok(())
    }

    fn set_resource(&mut self, resource: Resource) -> Result<()> {
        self.ensure_open()?;
        let id = resource.identity();
        check_hint(&self.descriptor, KIND_RESOURCE, &id, &resource.access)?;
        match self.descriptor.resources.iter_mut().find(|r| r.identity() == id) {
            Some(existing) => *existing = resource,
            None => self.descriptor.resources.push(resource),
        }
        Ok(())
    }

    fn set_source(&mut self, source: Source) -> Result<()> {
        self.ensure_open()?;
        let id = source.identity();
        check_hint(&self.descriptor, KIND_SOURCE, &id, &source.access)?;
        match self.descriptor.sources.iter_mut().find(|s| s.identity() == id) {
            Some(existing) => *existing = source,
            None => self.descriptor.sources.push(source),
        }
        Ok(())
    }

    fn set_reference(&mut self, reference: Reference) -> Result<()> {
        self.ensure_open()?;
        let id = reference.identity();
        match self.descriptor.references.iter_mut().find(|r| r.identity() == id) {
            Some(existing) => *existing = reference,
            None => self.descriptor.references.push(reference),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.view.close()
    }
}

/// Access method for blobs stored in the owning repository.
struct LocalBlobMethod<S: Storage> {
    view: View<S>,
    digest: Digest,
    media_type: String,
}

impl<S: Storage> AccessMethod for LocalBlobMethod<S> {
    fn get(&self) -> Result<BlobAccess> {
        let data = self
            .view
            .with(|s| s.read_blob(&self.digest))?
            .ok_or_else(|| CoreError::not_found("blob", self.digest.as_str()))?;
        let blob = BlobAccess::new(data, self.media_type.clone());
        if blob.digest() != &self.digest {
            return Err(CoreError::IntegrityFailure {
                expected: self.digest.to_string(),
                actual: blob.digest().to_string(),
            });
        }
        Ok(blob)
    }

    fn mime_type(&self) -> &str {
        &self.media_type
    }

    fn kind(&self) -> &str {
        ferry_core::access::LOCAL_BLOB
    }

    fn is_local(&self) -> bool {
        true
    }
}

/// Access method for elements without content.
struct NoneMethod;

impl AccessMethod for NoneMethod {
    fn get(&self) -> Result<BlobAccess> {
        Err(CoreError::not_found("content", "none access"))
    }

    fn mime_type(&self) -> &str {
        ""
    }

    fn kind(&self) -> &str {
        ferry_core::access::NONE
    }

    fn is_local(&self) -> bool {
        false
    }
}
