//! Access specifications: where the content of a resource or source lives.

use serde::{Deserialize, Serialize};

use crate::blob::Digest;

/// Type name of [`AccessSpec::LocalBlob`].
pub const LOCAL_BLOB: &str = "localBlob";
/// Type name of [`AccessSpec::OciArtifact`].
pub const OCI_ARTIFACT: &str = "ociArtifact";
/// Type name of [`AccessSpec::None`].
pub const NONE: &str = "none";

/// Serialized description of how to reach an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AccessSpec {
    /// Blob stored alongside the component version in its repository.
    #[serde(rename_all = "camelCase")]
    LocalBlob {
        /// Repository-local blob reference (the content digest).
        local_reference: String,
        /// Media type of the blob.
        media_type: String,
        /// Suggested stable name for re-exposing the blob.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_name: Option<String>,
        /// Original external access kept for provenance and fallback.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        global_access: Option<Box<AccessSpec>>,
    },
    /// Artifact held by an OCI registry.
    #[serde(rename_all = "camelCase")]
    OciArtifact {
        /// Full image reference, e.g. `ghcr.io/acme/app:1.0`.
        image_reference: String,
    },
    /// No content.
    None,
}

impl AccessSpec {
    /// Local blob access for a blob with the given digest.
    pub fn local_blob(
        digest: &Digest,
        media_type: impl Into<String>,
        reference_name: Option<String>,
        global_access: Option<AccessSpec>,
    ) -> Self {
        AccessSpec::LocalBlob {
            local_reference: digest.as_str().to_string(),
            media_type: media_type.into(),
            reference_name: reference_name.filter(|h| !h.is_empty()),
            global_access: global_access.map(Box::new),
        }
    }

    /// OCI artifact access.
    pub fn oci_artifact(image_reference: impl Into<String>) -> Self {
        AccessSpec::OciArtifact {
            image_reference: image_reference.into(),
        }
    }

    /// Access type name.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessSpec::LocalBlob { .. } => LOCAL_BLOB,
            AccessSpec::OciArtifact { .. } => OCI_ARTIFACT,
            AccessSpec::None => NONE,
        }
    }

    /// Whether the content lives inside the owning repository.
    pub fn is_local(&self) -> bool {
        matches!(self, AccessSpec::LocalBlob { .. })
    }

    /// Whether this spec describes no content at all.
    pub fn is_none(&self) -> bool {
        matches!(self, AccessSpec::None)
    }

    /// Media type declared by the spec, if any.
    pub fn media_type(&self) -> Option<&str> {
        match self {
            AccessSpec::LocalBlob { media_type, .. } => Some(media_type),
            _ => None,
        }
    }

    /// Reference name hint for a local blob, if set.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            AccessSpec::LocalBlob { reference_name, .. } => reference_name.as_deref(),
            _ => None,
        }
    }

    /// Global fallback access recorded on a local blob.
    pub fn global_access(&self) -> Option<&AccessSpec> {
        match self {
            AccessSpec::LocalBlob { global_access, .. } => global_access.as_deref(),
            _ => None,
        }
    }

    /// Name hint to use when this artifact is stored as a local blob.
    ///
    /// OCI references lose their registry host so the hint stays stable
    /// across mirrors.
    pub fn reference_hint(&self) -> Option<String> {
        match self {
            AccessSpec::LocalBlob { reference_name, .. } => reference_name.clone(),
            AccessSpec::OciArtifact { image_reference } => {
                Some(strip_registry_host(image_reference).to_string())
            }
            AccessSpec::None => None,
        }
    }
}

fn strip_registry_host(reference: &str) -> &str {
    let reference = reference.split('@').next().unwrap_or(reference);
    match reference.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            rest
        }
        _ => reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let local = AccessSpec::local_blob(&Digest::compute(b"x"), "text/plain", None, None);
        assert_eq!(local.kind(), LOCAL_BLOB);
        assert!(local.is_local());
        assert_eq!(AccessSpec::oci_artifact("ghcr.io/a/b:1").kind(), OCI_ARTIFACT);
        assert!(AccessSpec::None.is_none());
    }

    #[test]
    fn oci_hint_drops_host_and_digest() {
        let spec = AccessSpec::oci_artifact("ghcr.io/acme/img:1.0@sha256:abcd");
        assert_eq!(spec.reference_hint().as_deref(), Some("acme/img:1.0"));
        let spec = AccessSpec::oci_artifact("localhost:5000/img:1.0");
        assert_eq!(spec.reference_hint().as_deref(), Some("img:1.0"));
        let spec = AccessSpec::oci_artifact("library/img:1.0");
        assert_eq!(spec.reference_hint().as_deref(), Some("library/img:1.0"));
    }

    #[test]
    fn empty_hint_is_dropped() {
        let spec =
            AccessSpec::local_blob(&Digest::compute(b"x"), "text/plain", Some(String::new()), None);
        assert_eq!(spec.reference_name(), None);
    }

    #[test]
    fn json_shape() {
        let spec = AccessSpec::local_blob(
            &Digest::compute(b""),
            "text/plain",
            Some("img:1.0".into()),
            Some(AccessSpec::oci_artifact("ghcr.io/acme/img:1.0")),
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "localBlob");
        assert_eq!(json["referenceName"], "img:1.0");
        assert_eq!(json["globalAccess"]["type"], "ociArtifact");
        assert_eq!(json["globalAccess"]["imageReference"], "ghcr.io/acme/img:1.0");

        let none = serde_json::to_value(&AccessSpec::None).unwrap();
        assert_eq!(none["type"], "none");
    }
}
