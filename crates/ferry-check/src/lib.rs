//! Completeness checking for component version graphs.
//!
//! A component version is complete when every version it transitively
//! references can be resolved, starting in the repository of the referencing
//! version and falling back to an optional resolver. Cycles are errors.
//! Results are reported per root as a status (`OK`, `Error`, `Incomplete`,
//! `Resources`, `Sources`) plus the missing versions and their paths.

pub mod check;
pub mod report;

// Re-exports for convenience.
pub use check::{status, CheckEntry, CheckOptions, CheckResult, Checker, Missing};
pub use report::{format_json, format_missing, format_table};
