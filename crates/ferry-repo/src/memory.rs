//! In-memory transport archive.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ferry_core::{ComponentDescriptor, Digest, NameVersion, Result};

use crate::external::ExternalArtifacts;
use crate::storage::{Storage, StorageRepository};

/// Repository kept entirely in memory.
pub type MemoryRepository = StorageRepository<MemoryStorage>;

/// Descriptor and blob maps of an in-memory repository.
///
/// Counts descriptor writes per component version so callers can verify that
/// a version was stored exactly once.
#[derive(Default)]
pub struct MemoryStorage {
    name: String,
    descriptors: BTreeMap<NameVersion, ComponentDescriptor>,
    blobs: HashMap<Digest, Vec<u8>>,
    writes: HashMap<NameVersion, usize>,
}

impl MemoryStorage {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryStorage {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Storage for MemoryStorage {
    fn description(&self) -> String {
        format!("memory repository {}", self.name)
    }

    fn read_descriptor(&self, nv: &NameVersion) -> Result<Option<ComponentDescriptor>> {
        Ok(self.descriptors.get(nv).cloned())
    }

    fn write_descriptor(&mut self, descriptor: &ComponentDescriptor) -> Result<()> {
        let nv = descriptor.name_version();
        *self.writes.entry(nv.clone()).or_default() += 1;
        self.descriptors.insert(nv, descriptor.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<NameVersion>> {
        Ok(self.descriptors.keys().cloned().collect())
    }

    fn read_blob(&self, digest: &Digest) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(digest).cloned())
    }

    fn write_blob(&mut self, digest: &Digest, data: &[u8]) -> Result<()> {
        self.blobs
            .entry(digest.clone())
            .or_insert_with(|| data.to_vec());
        Ok(())
    }
}

impl StorageRepository<MemoryStorage> {
    /// An empty in-memory repository.
    pub fn new(name: impl Into<String>, artifacts: ExternalArtifacts) -> Arc<Self> {
        StorageRepository::with_storage(MemoryStorage::new(name), artifacts)
    }

    /// How often the descriptor of `nv` has been written.
    pub fn descriptor_writes(&self, nv: &NameVersion) -> Result<usize> {
        self.with_storage_ref(|s| Ok(s.writes.get(nv).copied().unwrap_or(0)))
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> Result<usize> {
        self.with_storage_ref(|s| Ok(s.blobs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{
        AccessSpec, BlobAccess, ComponentVersionAccess, Identity, Reference, Relation, Repository,
        Resource, VersionGuard,
    };

    fn repo() -> Arc<MemoryRepository> {
        MemoryRepository::new("test", ExternalArtifacts::new())
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let repo = repo();
        let err = repo.lookup_component_version("acme.org/x", "v1").err().unwrap();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "component version \"acme.org/x:v1\" not found");
    }

    #[test]
    fn new_version_invisible_until_added() {
        let repo = repo();
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/x", "v1").unwrap());
        cv.set_reference(Reference::new("ref", "acme.org/y", "v1")).unwrap();
        assert!(!repo.exists_component_version("acme.org/x", "v1").unwrap());

        repo.add_component_version(&*cv).unwrap();
        cv.close().unwrap();
        assert!(repo.exists_component_version("acme.org/x", "v1").unwrap());

        let found = VersionGuard::new(repo.lookup_component_version("acme.org/x", "v1").unwrap());
        assert_eq!(found.descriptor().references.len(), 1);
        assert_eq!(repo.descriptor_writes(&NameVersion::new("acme.org/x", "v1")).unwrap(), 1);
    }

    #[test]
    fn blobs_round_trip_through_access_method() {
        let repo = repo();
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/x", "v1").unwrap());
        let blob = BlobAccess::new(b"payload".to_vec(), "text/plain");
        let access = cv.add_blob(&blob, Some("data"), None).unwrap();
        assert_eq!(access.reference_name(), Some("data"));
        cv.set_resource(Resource::new("data", "v1", "blob", Relation::Local, access.clone()))
            .unwrap();

        let method = cv.access_method(&access).unwrap();
        assert!(method.is_local());
        assert_eq!(method.get().unwrap().data(), b"payload");
        assert_eq!(repo.blob_count().unwrap(), 1);
    }

    #[test]
    fn set_resource_replaces_same_identity() {
        let repo = repo();
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/x", "v1").unwrap());
        cv.set_resource(Resource::new("r", "v1", "blob", Relation::External, AccessSpec::None))
            .unwrap();
        cv.set_resource(Resource::new(
            "r",
            "v1",
            "blob",
            Relation::External,
            AccessSpec::oci_artifact("ghcr.io/acme/r:1"),
        ))
        .unwrap();
        assert_eq!(cv.descriptor().resources.len(), 1);
        let r = cv.resource_by_identity(&Identity::named("r")).unwrap();
        assert_eq!(r.access.kind(), "ociArtifact");
    }

    #[test]
    fn set_resource_rejects_hint_collision() {
        let repo = repo();
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/x", "v1").unwrap());
        let mt = "application/vnd.oci.image.manifest.v1";
        let a = cv.add_blob(&BlobAccess::new(b"a".to_vec(), mt), Some("img:1.0"), None).unwrap();
        let b = cv.add_blob(&BlobAccess::new(b"b".to_vec(), mt), Some("img:1.0"), None).unwrap();
        cv.set_resource(Resource::new("a", "v1", "ociImage", Relation::Local, a)).unwrap();
        let err = cv
            .set_resource(Resource::new("b", "v1", "ociImage", Relation::Local, b))
            .unwrap_err();
        assert!(err.to_string().contains("already used"));
    }

    #[test]
    fn version_closed_twice_fails() {
        let repo = repo();
        let mut cv = repo.new_component_version("acme.org/x", "v1").unwrap();
        cv.close().unwrap();
        let err = cv.close().unwrap_err();
        assert_eq!(err.to_string(), "component version acme.org/x:v1 already closed");
        assert!(cv.set_meta(Default::default()).is_err());
    }

    #[test]
    fn storage_outlives_repository_close_while_versions_are_open() {
        let repo = repo();
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/x", "v1").unwrap());
        assert_eq!(repo.open_views(), 2);
        repo.add_component_version(&*cv).unwrap();
        repo.close().unwrap();
        assert!(repo.close().is_err());

        let blob = BlobAccess::new(b"late".to_vec(), "text/plain");
        assert!(cv.add_blob(&blob, None, None).is_ok());
        cv.close().unwrap();
    }

    #[test]
    fn listing_is_sorted() {
        let repo = repo();
        for (name, version) in [("b", "v1"), ("a", "v1.10.0"), ("a", "v1.2.0")] {
            let cv = VersionGuard::new(repo.new_component_version(name, version).unwrap());
            repo.add_component_version(&*cv).unwrap();
        }
        let list: Vec<String> = repo
            .list_component_versions()
            .unwrap()
            .iter()
            .map(|nv| nv.to_string())
            .collect();
        assert_eq!(list, ["a:v1.2.0", "a:v1.10.0", "b:v1"]);
    }

    #[test]
    fn debug_output_names_the_repository() {
        let repo = repo();
        assert_eq!(
            format!("{repo:?}"),
            "StorageRepository { description: \"memory repository test\", open_views: 1, .. }"
        );
    }
}
