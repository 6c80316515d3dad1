//! Fixture builder for component graphs.
//!
//! Used by tests across the workspace to populate repositories through the
//! regular repository capabilities.

use ferry_core::{
    AccessSpec, BlobAccess, ComponentVersionAccess, Label, Reference, Relation, Repository,
    Resource, Result, Source, VersionGuard,
};

enum Content {
    Blob {
        data: Vec<u8>,
        media_type: String,
        hint: Option<String>,
    },
    Access(AccessSpec),
}

struct Element {
    name: String,
    kind: String,
    relation: Relation,
    content: Content,
}

/// Describes one component version to be stored.
pub struct ComponentBuilder {
    name: String,
    version: String,
    provider: String,
    labels: Vec<Label>,
    resources: Vec<Element>,
    sources: Vec<Element>,
    references: Vec<Reference>,
}

/// Start describing `name:version`.
pub fn component(name: &str, version: &str) -> ComponentBuilder {
    ComponentBuilder {
        name: name.to_string(),
        version: version.to_string(),
        provider: "acme".to_string(),
        labels: Vec::new(),
        resources: Vec::new(),
        sources: Vec::new(),
        references: Vec::new(),
    }
}

impl ComponentBuilder {
    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    pub fn label(mut self, name: &str, value: &str) -> Self {
        self.labels.push(Label::new(name, value));
        self
    }

    /// Reference `component:version` under the local name `name`.
    pub fn reference(mut self, name: &str, component: &str, version: &str) -> Self {
        self.references.push(Reference::new(name, component, version));
        self
    }

    /// A local resource whose content is stored as a blob.
    pub fn local_resource(
        mut self,
        name: &str,
        kind: &str,
        media_type: &str,
        data: &[u8],
        hint: Option<&str>,
    ) -> Self {
        self.resources.push(Element {
            name: name.to_string(),
            kind: kind.to_string(),
            relation: Relation::Local,
            content: Content::Blob {
                data: data.to_vec(),
                media_type: media_type.to_string(),
                hint: hint.map(str::to_string),
            },
        });
        self
    }

    /// A resource with the given access.
    pub fn resource(mut self, name: &str, kind: &str, relation: Relation, access: AccessSpec) -> Self {
        self.resources.push(Element {
            name: name.to_string(),
            kind: kind.to_string(),
            relation,
            content: Content::Access(access),
        });
        self
    }

    /// A source whose content is stored as a blob.
    pub fn local_source(mut self, name: &str, kind: &str, media_type: &str, data: &[u8]) -> Self {
        self.sources.push(Element {
            name: name.to_string(),
            kind: kind.to_string(),
            relation: Relation::Local,
            content: Content::Blob {
                data: data.to_vec(),
                media_type: media_type.to_string(),
                hint: None,
            },
        });
        self
    }

    /// A source with the given access.
    pub fn source(mut self, name: &str, kind: &str, access: AccessSpec) -> Self {
        self.sources.push(Element {
            name: name.to_string(),
            kind: kind.to_string(),
            relation: Relation::External,
            content: Content::Access(access),
        });
        self
    }

    /// Store the version in `repo`.
    pub fn store(self, repo: &dyn Repository) -> Result<()> {
        let mut cv = VersionGuard::new(repo.new_component_version(&self.name, &self.version)?);
        let mut meta = cv.descriptor().meta();
        meta.provider = self.provider.clone();
        meta.labels = self.labels.clone();
        cv.set_meta(meta)?;

        for element in &self.resources {
            let (access, digest) = materialize(&mut *cv, &element.content)?;
            let mut resource =
                Resource::new(&element.name, &self.version, &element.kind, element.relation, access);
            resource.digest = digest;
            cv.set_resource(resource)?;
        }
        for element in &self.sources {
            let (access, _) = materialize(&mut *cv, &element.content)?;
            cv.set_source(Source::new(&element.name, &self.version, &element.kind, access))?;
        }
        for reference in &self.references {
            cv.set_reference(reference.clone())?;
        }

        repo.add_component_version(&*cv)?;
        cv.close()
    }
}

fn materialize(
    cv: &mut dyn ComponentVersionAccess,
    content: &Content,
) -> Result<(AccessSpec, Option<ferry_core::Digest>)> {
    match content {
        Content::Blob {
            data,
            media_type,
            hint,
        } => {
            let blob = BlobAccess::new(data.clone(), media_type.clone());
            let access = cv.add_blob(&blob, hint.as_deref(), None)?;
            Ok((access, Some(blob.digest().clone())))
        }
        Content::Access(access) => Ok((access.clone(), None)),
    }
}
