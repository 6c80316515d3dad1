//! Directory-backed repository.
//!
//! Layout:
//! ```text
//! <root>/
//!   components/
//!     <name with '/' as '~'>/
//!       <version>/
//!         component-descriptor.json
//!   blobs/
//!     sha256.<hex>
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ferry_core::{ComponentDescriptor, CoreError, Digest, NameVersion, Result};

use crate::external::ExternalArtifacts;
use crate::storage::{Storage, StorageRepository};

const DESCRIPTOR_FILE: &str = "component-descriptor.json";

/// Repository stored in a local directory.
pub type FileRepository = StorageRepository<DirectoryStorage>;

/// Filesystem backend rooted at one directory.
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Create the directory layout below `root` if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("components"))?;
        std::fs::create_dir_all(root.join("blobs"))?;
        Ok(DirectoryStorage { root })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one version. Names and versions that would leave the
    /// `components` directory are rejected.
    fn version_dir(&self, nv: &NameVersion) -> Result<PathBuf> {
        let invalid = |detail: &str| CoreError::InvalidNameVersion {
            input: nv.to_string(),
            detail: detail.to_string(),
        };
        if nv.name().split('/').any(|segment| !is_plain_segment(segment)) {
            return Err(invalid("component name is not usable as a directory path"));
        }
        if nv.version().contains('/') || !is_plain_segment(nv.version()) {
            return Err(invalid("version is not usable as a directory name"));
        }
        Ok(self
            .root
            .join("components")
            .join(nv.name().replace('/', "~"))
            .join(nv.version()))
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join("blobs")
            .join(digest.as_str().replacen(':', ".", 1))
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['\\', '~', '\0'])
        && !Path::new(segment).has_root()
}

impl Storage for DirectoryStorage {
    fn description(&self) -> String {
        format!("directory repository {}", self.root.display())
    }

    fn read_descriptor(&self, nv: &NameVersion) -> Result<Option<ComponentDescriptor>> {
        let path = self.version_dir(nv)?.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn write_descriptor(&mut self, descriptor: &ComponentDescriptor) -> Result<()> {
        let dir = self.version_dir(&descriptor.name_version())?;
        std::fs::create_dir_all(&dir)?;
        std::fs::write(
            dir.join(DESCRIPTOR_FILE),
            serde_json::to_string_pretty(descriptor)?,
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<NameVersion>> {
        let components = self.root.join("components");
        if !components.is_dir() {
            return Ok(Vec::new());
        }

        let mut list = Vec::new();
        for entry in std::fs::read_dir(&components)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().replace('~', "/");
            for version in std::fs::read_dir(entry.path())? {
                let version = version?;
                if version.path().join(DESCRIPTOR_FILE).is_file() {
                    list.push(NameVersion::new(
                        name.clone(),
                        version.file_name().to_string_lossy().to_string(),
                    ));
                }
            }
        }
        Ok(list)
    }

    fn read_blob(&self, digest: &Digest) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(digest);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    fn write_blob(&mut self, digest: &Digest, data: &[u8]) -> Result<()> {
        if !digest.verify(data) {
            return Err(CoreError::IntegrityFailure {
                expected: digest.to_string(),
                actual: Digest::compute(data).to_string(),
            });
        }
        let path = self.blob_path(digest);
        if !path.is_file() {
            std::fs::write(path, data)?;
        }
        Ok(())
    }
}

impl StorageRepository<DirectoryStorage> {
    /// Open (creating if needed) a directory repository.
    pub fn open(root: impl Into<PathBuf>, artifacts: ExternalArtifacts) -> Result<Arc<Self>> {
        Ok(StorageRepository::with_storage(
            DirectoryStorage::create(root)?,
            artifacts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{
        BlobAccess, ComponentVersionAccess, Label, Reference, Relation, Repository, Resource,
        VersionGuard,
    };

    fn store(repo: &FileRepository) -> Digest {
        let mut cv = VersionGuard::new(repo.new_component_version("acme.org/app", "v1.0.0").unwrap());
        let mut meta = cv.descriptor().meta();
        meta.provider = "acme".into();
        meta.labels.push(Label::new("team", "core"));
        cv.set_meta(meta).unwrap();
        let blob = BlobAccess::new(b"config".to_vec(), "application/json");
        let access = cv.add_blob(&blob, Some("config"), None).unwrap();
        cv.set_resource(
            Resource::new("config", "v1.0.0", "json", Relation::Local, access)
                .with_digest(blob.digest().clone()),
        )
        .unwrap();
        cv.set_reference(Reference::new("lib", "acme.org/lib", "v2")).unwrap();
        repo.add_component_version(&*cv).unwrap();
        cv.close().unwrap();
        blob.digest().clone()
    }

    #[test]
    fn layout_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), ExternalArtifacts::new()).unwrap();
        let digest = store(&repo);

        assert!(dir
            .path()
            .join("components/acme.org~app/v1.0.0/component-descriptor.json")
            .is_file());
        assert!(dir.path().join(format!("blobs/sha256.{}", digest.hex())).is_file());
    }

    #[test]
    fn reopened_repository_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = FileRepository::open(dir.path(), ExternalArtifacts::new()).unwrap();
            store(&repo);
            repo.close().unwrap();
        }

        let repo = FileRepository::open(dir.path(), ExternalArtifacts::new()).unwrap();
        assert_eq!(
            repo.list_component_versions().unwrap(),
            vec![NameVersion::new("acme.org/app", "v1.0.0")]
        );
        let cv = VersionGuard::new(repo.lookup_component_version("acme.org/app", "v1.0.0").unwrap());
        let cd = cv.descriptor();
        assert_eq!(cd.provider, "acme");
        assert_eq!(cd.labels, vec![Label::new("team", "core")]);
        assert_eq!(cd.references[0].target(), NameVersion::new("acme.org/lib", "v2"));

        let method = cv.access_method(&cd.resources[0].access).unwrap();
        assert_eq!(method.get().unwrap().data(), b"config");
    }

    #[test]
    fn tampered_blob_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), ExternalArtifacts::new()).unwrap();
        let digest = store(&repo);
        std::fs::write(
            dir.path().join(format!("blobs/sha256.{}", digest.hex())),
            b"tampered",
        )
        .unwrap();

        let cv = VersionGuard::new(repo.lookup_component_version("acme.org/app", "v1.0.0").unwrap());
        let method = cv.access_method(&cv.descriptor().resources[0].access).unwrap();
        let err = method.get().unwrap_err();
        assert!(matches!(err, CoreError::IntegrityFailure { .. }));
    }

    #[test]
    fn versions_cannot_leave_the_repository_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), ExternalArtifacts::new()).unwrap();

        let escaped = outside.path().join("escaped");
        let absolute = escaped.to_string_lossy().to_string();
        for (name, version) in [
            ("acme.org/x", absolute.as_str()),
            ("acme.org/x", ".."),
            ("acme.org/../../x", "v1"),
            ("acme.org/x", "v1\\..\\.."),
        ] {
            let cv = VersionGuard::new(repo.new_component_version(name, version).unwrap());
            let err = repo.add_component_version(&*cv).unwrap_err();
            assert!(
                matches!(err.root(), CoreError::InvalidNameVersion { .. }),
                "{name}:{version} -> {err}"
            );
        }

        assert!(!escaped.join(DESCRIPTOR_FILE).exists());
        assert!(std::fs::read_dir(outside.path()).unwrap().next().is_none());
        assert!(repo.lookup_component_version("acme.org/x", "..").is_err());
        assert!(repo.list_component_versions().unwrap().is_empty());
    }
}
