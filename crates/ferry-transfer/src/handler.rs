//! Transfer policy.
//!
//! A [`TransferHandler`] answers the questions the engine asks while copying:
//! whether an element travels by value, and what to do with versions the
//! target already holds. Handlers perform no I/O.

use ferry_core::{ComponentDescriptor, Reference, Relation, Resource, Source};

use crate::options::TransferOptions;

/// How an element is carried into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Copy the content (or, for references, the referenced version).
    ByValue,
    /// Keep the original access (or only the reference pointer).
    ByReference,
}

/// Element the engine asks about.
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    Resource(&'a Resource),
    Source(&'a Source),
    Reference(&'a Reference),
}

/// Decision surface consulted by the transfer engine.
pub trait TransferHandler {
    /// By value or by reference for one element.
    fn decide(&self, element: Element<'_>) -> Decision;

    /// Treat `existing` as absent and transfer anyway.
    fn enforce_transport(&self, source: &ComponentDescriptor, existing: &ComponentDescriptor) -> bool;

    /// Update volatile data (labels) of an otherwise equivalent `existing`.
    fn update_version(&self, source: &ComponentDescriptor, existing: &ComponentDescriptor) -> bool;

    /// Replace `existing` with a full copy of `source`.
    fn should_overwrite(&self, source: &ComponentDescriptor, existing: &ComponentDescriptor) -> bool;

    /// Record the original access as global access of copied content.
    fn keep_global_access(&self) -> bool;

    /// Do not descend below versions skipped because they already exist.
    fn stop_on_existing(&self) -> bool;
}

/// Handler driven by [`TransferOptions`].
#[derive(Debug, Clone, Default)]
pub struct StandardHandler {
    options: TransferOptions,
}

impl StandardHandler {
    pub fn new(options: TransferOptions) -> Self {
        StandardHandler { options }
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    fn by_value(enabled: bool) -> Decision {
        if enabled {
            Decision::ByValue
        } else {
            Decision::ByReference
        }
    }
}

impl TransferHandler for StandardHandler {
    fn decide(&self, element: Element<'_>) -> Decision {
        let opts = &self.options;
        match element {
            Element::Resource(r) => {
                if opts.is_access_type_omitted(r.access.kind()) || opts.is_artifact_type_omitted(&r.kind) {
                    return Decision::ByReference;
                }
                Self::by_value(
                    opts.resources_by_value
                        || (opts.local_resources_by_value && r.relation == Relation::Local),
                )
            }
            Element::Source(s) => {
                if opts.is_access_type_omitted(s.access.kind()) || opts.is_artifact_type_omitted(&s.kind) {
                    return Decision::ByReference;
                }
                Self::by_value(opts.sources_by_value)
            }
            Element::Reference(_) => Self::by_value(opts.recursive),
        }
    }

    fn enforce_transport(&self, _: &ComponentDescriptor, _: &ComponentDescriptor) -> bool {
        self.options.enforce_transport
    }

    fn update_version(&self, _: &ComponentDescriptor, _: &ComponentDescriptor) -> bool {
        !self.options.skip_update
    }

    fn should_overwrite(&self, _: &ComponentDescriptor, _: &ComponentDescriptor) -> bool {
        self.options.overwrite
    }

    fn keep_global_access(&self) -> bool {
        self.options.keep_global_access
    }

    fn stop_on_existing(&self) -> bool {
        self.options.stop_on_existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::AccessSpec;

    fn oci(relation: Relation) -> Resource {
        Resource::new("img", "v1", "ociImage", relation, AccessSpec::oci_artifact("ghcr.io/acme/img:1"))
    }

    #[test]
    fn defaults_keep_everything_by_reference() {
        let h = StandardHandler::default();
        assert_eq!(h.decide(Element::Resource(&oci(Relation::Local))), Decision::ByReference);
        let src = Source::new("src", "v1", "git", AccessSpec::oci_artifact("ghcr.io/acme/src:1"));
        assert_eq!(h.decide(Element::Source(&src)), Decision::ByReference);
        let r = Reference::new("lib", "acme.org/lib", "v1");
        assert_eq!(h.decide(Element::Reference(&r)), Decision::ByReference);
    }

    #[test]
    fn local_resources_by_value_respects_relation() {
        let h = StandardHandler::new(TransferOptions::new().local_resources_by_value(true));
        assert_eq!(h.decide(Element::Resource(&oci(Relation::Local))), Decision::ByValue);
        assert_eq!(h.decide(Element::Resource(&oci(Relation::External))), Decision::ByReference);
    }

    #[test]
    fn omitted_types_win_over_by_value() {
        let h = StandardHandler::new(
            TransferOptions::new()
                .resources_by_value(true)
                .omit_artifact_type("ociImage"),
        );
        assert_eq!(h.decide(Element::Resource(&oci(Relation::Local))), Decision::ByReference);

        let h = StandardHandler::new(
            TransferOptions::new()
                .resources_by_value(true)
                .omit_access_type("ociArtifact"),
        );
        assert_eq!(h.decide(Element::Resource(&oci(Relation::External))), Decision::ByReference);
    }

    #[test]
    fn recursive_transfers_references_by_value() {
        let h = StandardHandler::new(TransferOptions::new().recursive(true));
        let r = Reference::new("lib", "acme.org/lib", "v1");
        assert_eq!(h.decide(Element::Reference(&r)), Decision::ByValue);
    }

    #[test]
    fn existing_version_questions() {
        let cd = ComponentDescriptor::new("acme.org/app", "v1");
        let h = StandardHandler::new(TransferOptions::new().overwrite(true).skip_update(true));
        assert!(h.should_overwrite(&cd, &cd));
        assert!(!h.update_version(&cd, &cd));
        assert!(!h.enforce_transport(&cd, &cd));
    }
}
