//! Registry of externally hosted artifacts.
//!
//! Stands in for the remote registries behind `ociArtifact` accesses. One
//! registry is constructed by the caller and handed to every repository that
//! should be able to resolve such accesses; nothing here is global.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ferry_core::access::OCI_ARTIFACT;
use ferry_core::{AccessMethod, BlobAccess, CoreError, Result};

/// Shared map from image reference to artifact content.
#[derive(Clone, Default)]
pub struct ExternalArtifacts {
    artifacts: Arc<RwLock<HashMap<String, BlobAccess>>>,
}

impl ExternalArtifacts {
    pub fn new() -> Self {
        ExternalArtifacts::default()
    }

    /// Make `blob` reachable under `image_reference`.
    pub fn register(&self, image_reference: impl Into<String>, blob: BlobAccess) {
        self.artifacts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(image_reference.into(), blob);
    }

    /// Fetch the artifact stored under `image_reference`.
    pub fn get(&self, image_reference: &str) -> Result<BlobAccess> {
        self.artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(image_reference)
            .cloned()
            .ok_or_else(|| CoreError::not_found("artifact", image_reference))
    }

    pub fn contains(&self, image_reference: &str) -> bool {
        self.artifacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(image_reference)
    }
}

/// Access method for `ociArtifact` specs.
pub struct ExternalMethod {
    artifacts: ExternalArtifacts,
    image_reference: String,
    media_type: String,
}

impl ExternalMethod {
    pub fn new(artifacts: ExternalArtifacts, image_reference: impl Into<String>) -> Self {
        let image_reference = image_reference.into();
        let media_type = artifacts
            .get(&image_reference)
            .map(|b| b.media_type().to_string())
            .unwrap_or_default();
        ExternalMethod {
            artifacts,
            image_reference,
            media_type,
        }
    }
}

impl AccessMethod for ExternalMethod {
    fn get(&self) -> Result<BlobAccess> {
        self.artifacts.get(&self.image_reference)
    }

    fn mime_type(&self) -> &str {
        &self.media_type
    }

    fn kind(&self) -> &str {
        OCI_ARTIFACT
    }

    fn is_local(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_artifacts_are_shared_between_clones() {
        let registry = ExternalArtifacts::new();
        let clone = registry.clone();
        registry.register("ghcr.io/acme/img:1.0", BlobAccess::new(b"img".to_vec(), "x/y"));
        assert!(clone.contains("ghcr.io/acme/img:1.0"));

        let method = ExternalMethod::new(clone, "ghcr.io/acme/img:1.0");
        assert_eq!(method.mime_type(), "x/y");
        assert_eq!(method.get().unwrap().data(), b"img");
        assert!(!method.is_local());
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let err = ExternalArtifacts::new().get("ghcr.io/none:1").unwrap_err();
        assert!(err.is_not_found());
    }
}
