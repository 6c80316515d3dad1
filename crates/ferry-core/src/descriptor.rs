//! Component descriptor model.
//!
//! A descriptor lists the resources, sources and references of one component
//! version. Element identities (name plus extra identity attributes) are
//! unique per element kind within one descriptor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::AccessSpec;
use crate::blob::Digest;
use crate::error::{CoreError, Result};
use crate::name_version::NameVersion;

/// Element kind name for resources.
pub const KIND_RESOURCE: &str = "resource";
/// Element kind name for sources.
pub const KIND_SOURCE: &str = "source";
/// Element kind name for references.
pub const KIND_REFERENCE: &str = "reference";

/// A name/value label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Label {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity of an element within one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(BTreeMap<String, String>);

impl Identity {
    /// Identity consisting of a name only.
    pub fn named(name: impl Into<String>) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), name.into());
        Identity(attrs)
    }

    /// The `name` attribute.
    pub fn name(&self) -> &str {
        self.0.get("name").map(String::as_str).unwrap_or("")
    }

    /// Look up an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        let extra: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != "name")
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if !extra.is_empty() {
            write!(f, "[{}]", extra.join(","))?;
        }
        Ok(())
    }
}

/// Metadata shared by resources, sources and references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMeta {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_identity: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

impl ElementMeta {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ElementMeta {
            name: name.into(),
            version: version.into(),
            extra_identity: BTreeMap::new(),
            labels: Vec::new(),
        }
    }

    /// Identity formed by the name and the extra identity attributes.
    pub fn identity(&self) -> Identity {
        let mut attrs = self.extra_identity.clone();
        attrs.insert("name".to_string(), self.name.clone());
        Identity(attrs)
    }
}

/// Whether an artifact is delivered with the component or fetched externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Local,
    External,
}

/// A deliverable artifact of a component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub kind: String,
    pub relation: Relation,
    pub access: AccessSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        relation: Relation,
        access: AccessSpec,
    ) -> Self {
        Resource {
            meta: ElementMeta::new(name, version),
            kind: kind.into(),
            relation,
            access,
            digest: None,
        }
    }

    /// Builder: set an extra identity attribute.
    pub fn with_extra_identity(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.extra_identity.insert(key.into(), value.into());
        self
    }

    /// Builder: set the content digest.
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// A copy of this resource pointing at a different access.
    pub fn with_access(&self, access: AccessSpec) -> Self {
        Resource {
            access,
            ..self.clone()
        }
    }

    pub fn identity(&self) -> Identity {
        self.meta.identity()
    }
}

/// Source material a component version was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(flatten)]
    pub meta: ElementMeta,
    #[serde(rename = "type")]
    pub kind: String,
    pub access: AccessSpec,
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        access: AccessSpec,
    ) -> Self {
        Source {
            meta: ElementMeta::new(name, version),
            kind: kind.into(),
            access,
        }
    }

    /// A copy of this source pointing at a different access.
    pub fn with_access(&self, access: AccessSpec) -> Self {
        Source {
            access,
            ..self.clone()
        }
    }

    pub fn identity(&self) -> Identity {
        self.meta.identity()
    }
}

/// An edge to another component version.
///
/// `meta.name` is the local reference name, `meta.version` the version of
/// the referenced component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub component_name: String,
}

impl Reference {
    pub fn new(
        name: impl Into<String>,
        component_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Reference {
            meta: ElementMeta::new(name, version),
            component_name: component_name.into(),
        }
    }

    /// The referenced component version.
    pub fn target(&self) -> NameVersion {
        NameVersion::new(&self.component_name, &self.meta.version)
    }

    pub fn identity(&self) -> Identity {
        self.meta.identity()
    }
}

/// Version-level metadata copied verbatim between repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentMeta {
    pub provider: String,
    pub labels: Vec<Label>,
    pub creation_time: Option<String>,
}

/// Content of one component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl ComponentDescriptor {
    /// An empty descriptor.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ComponentDescriptor {
            name: name.into(),
            version: version.into(),
            provider: String::new(),
            labels: Vec::new(),
            creation_time: None,
            resources: Vec::new(),
            sources: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn name_version(&self) -> NameVersion {
        NameVersion::new(&self.name, &self.version)
    }

    pub fn meta(&self) -> ComponentMeta {
        ComponentMeta {
            provider: self.provider.clone(),
            labels: self.labels.clone(),
            creation_time: self.creation_time.clone(),
        }
    }

    pub fn set_meta(&mut self, meta: ComponentMeta) {
        self.provider = meta.provider;
        self.labels = meta.labels;
        self.creation_time = meta.creation_time;
    }

    pub fn resource_by_identity(&self, id: &Identity) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.identity() == id)
    }

    pub fn source_by_identity(&self, id: &Identity) -> Option<&Source> {
        self.sources.iter().find(|s| &s.identity() == id)
    }

    pub fn reference_by_identity(&self, id: &Identity) -> Option<&Reference> {
        self.references.iter().find(|r| &r.identity() == id)
    }

    /// Reject descriptors with duplicate element identities.
    pub fn validate(&self) -> Result<()> {
        let owner = self.name_version();
        check_unique(KIND_RESOURCE, &owner, self.resources.iter().map(Resource::identity))?;
        check_unique(KIND_SOURCE, &owner, self.sources.iter().map(Source::identity))?;
        check_unique(KIND_REFERENCE, &owner, self.references.iter().map(Reference::identity))
    }

    /// Whether `other` carries the same signature-relevant content.
    ///
    /// Access specifications and labels are volatile and ignored; digests
    /// are compared only where both sides know them.
    pub fn is_equivalent(&self, other: &ComponentDescriptor) -> bool {
        fn digests_match(a: &Option<Digest>, b: &Option<Digest>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }

        self.name == other.name
            && self.version == other.version
            && self.provider == other.provider
            && self.resources.len() == other.resources.len()
            && self.resources.iter().zip(&other.resources).all(|(a, b)| {
                a.identity() == b.identity()
                    && a.kind == b.kind
                    && a.relation == b.relation
                    && digests_match(&a.digest, &b.digest)
            })
            && self.sources.len() == other.sources.len()
            && self
                .sources
                .iter()
                .zip(&other.sources)
                .all(|(a, b)| a.identity() == b.identity() && a.kind == b.kind)
            && self.references.len() == other.references.len()
            && self
                .references
                .iter()
                .zip(&other.references)
                .all(|(a, b)| a.identity() == b.identity() && a.target() == b.target())
    }
}

fn check_unique(
    kind: &str,
    owner: &NameVersion,
    identities: impl Iterator<Item = Identity>,
) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for id in identities {
        if !seen.insert(id.clone()) {
            return Err(CoreError::DuplicateIdentity {
                kind: kind.to_string(),
                identity: id.to_string(),
                owner: owner.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new("acme.org/app", "v1");
        cd.provider = "acme".into();
        cd.resources.push(Resource::new(
            "image",
            "v1",
            "ociImage",
            Relation::External,
            AccessSpec::oci_artifact("ghcr.io/acme/app:1.0"),
        ));
        cd.references.push(Reference::new("lib", "acme.org/lib", "v2"));
        cd
    }

    #[test]
    fn identity_includes_extra_attributes() {
        let r = Resource::new("image", "v1", "ociImage", Relation::Local, AccessSpec::None)
            .with_extra_identity("arch", "arm64");
        let id = r.identity();
        assert_eq!(id.name(), "image");
        assert_eq!(id.get("arch"), Some("arm64"));
        assert_eq!(id.to_string(), "image[arch=arm64]");
        assert_ne!(id, Identity::named("image"));
    }

    #[test]
    fn duplicate_identity_rejected() {
        let mut cd = sample();
        cd.resources.push(cd.resources[0].clone());
        let err = cd.validate().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateIdentity { .. }));
        assert!(err.to_string().contains("duplicate resource identity image"));
    }

    #[test]
    fn same_name_different_extra_identity_is_unique() {
        let mut cd = sample();
        let arm = cd.resources[0].clone().with_extra_identity("arch", "arm64");
        cd.resources.push(arm);
        assert!(cd.validate().is_ok());
    }

    #[test]
    fn reference_target() {
        let cd = sample();
        assert_eq!(cd.references[0].target(), NameVersion::new("acme.org/lib", "v2"));
    }

    #[test]
    fn equivalence_ignores_access_and_labels() {
        let a = sample();
        let mut b = sample();
        b.labels.push(Label::new("team", "core"));
        b.resources[0].access = AccessSpec::local_blob(&Digest::compute(b"x"), "x", None, None);
        assert!(a.is_equivalent(&b));

        b.provider = "other".into();
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn equivalence_detects_digest_change() {
        let mut a = sample();
        let mut b = sample();
        a.resources[0].digest = Some(Digest::compute(b"one"));
        b.resources[0].digest = Some(Digest::compute(b"two"));
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn json_round_trip_keeps_flattened_meta() {
        let cd = sample();
        let json = serde_json::to_value(&cd).unwrap();
        assert_eq!(json["resources"][0]["name"], "image");
        assert_eq!(json["resources"][0]["type"], "ociImage");
        assert_eq!(json["references"][0]["componentName"], "acme.org/lib");
        let back: ComponentDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, cd);
    }
}
