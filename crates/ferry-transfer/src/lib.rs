//! Transfer of component version graphs between repositories.
//!
//! The [`TransferEngine`] copies a component version into a target
//! repository and, depending on the [`TransferHandler`], the versions it
//! references and the content of its resources and sources. The
//! [`StandardHandler`] derives every decision from [`TransferOptions`].

pub mod engine;
pub mod handler;
pub mod options;

// Re-exports for convenience.
pub use engine::{transfer_version, TransferEngine};
pub use handler::{Decision, Element, StandardHandler, TransferHandler};
pub use options::{TransferOptions, FLAG_NAMES};
