//! Component version model and repository capabilities for ferry.
//!
//! A component version is a named, versioned bundle of resources, sources and
//! references to other component versions. This crate holds the pieces shared
//! by the completeness checker and the transfer engine:
//!
//! - **Identities**: [`NameVersion`] and per-branch traversal [`History`]
//! - **Descriptors**: resources, sources, references and their access specs
//! - **Capabilities**: [`Repository`], [`ComponentVersionAccess`],
//!   [`AccessMethod`] and [`Resolver`] implemented by concrete backends
//!
//! Open component versions are owned by a [`VersionGuard`], which closes them
//! exactly once on every exit path.

pub mod access;
pub mod blob;
pub mod descriptor;
pub mod error;
pub mod hint;
pub mod history;
pub mod name_version;
pub mod printer;
pub mod repository;
pub mod resolver;

// Re-exports for convenience.
pub use access::AccessSpec;
pub use blob::{base_media_type, BlobAccess, Digest};
pub use descriptor::{
    ComponentDescriptor, ComponentMeta, ElementMeta, Identity, Label, Reference, Relation,
    Resource, Source, KIND_REFERENCE, KIND_RESOURCE, KIND_SOURCE,
};
pub use error::{CoreError, Result};
pub use hint::check_hint;
pub use history::{History, KIND_COMPONENT_VERSION};
pub use name_version::NameVersion;
pub use printer::{Printer, SharedBuffer};
pub use repository::{AccessMethod, ComponentVersionAccess, Repository, VersionGuard};
pub use resolver::{lookup_in, resolve_reference, CompoundResolver, RepositoryResolver, Resolver};
