//! Component repositories for ferry.
//!
//! Provides an in-memory transport archive and a directory-backed
//! repository. Both share one implementation of the repository capabilities
//! over a [`Storage`] backend whose lifetime is governed by reference-counted
//! views: the backend is released exactly once, when the repository and every
//! component version opened from it have been closed.

pub mod external;
pub mod local;
pub mod memory;
pub mod shared;
pub mod storage;
pub mod testing;
pub mod version;

// Re-exports for convenience.
pub use external::ExternalArtifacts;
pub use local::{DirectoryStorage, FileRepository};
pub use memory::{MemoryRepository, MemoryStorage};
pub use shared::View;
pub use storage::{Storage, StorageRepository, VersionHandle};
pub use version::{compare_versions, parse_version, sort_name_versions};
