//! Traversal path tracking and cycle detection.
//!
//! A [`History`] records the component versions visited from the root of a
//! check or transfer call down to the current node. Extending a history never
//! mutates it: [`History::add`] hands back an extended copy, so sibling
//! branches that start from the same parent never see each other's entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::name_version::NameVersion;

/// Element kind used for component version traversal.
pub const KIND_COMPONENT_VERSION: &str = "component version";

/// An ordered traversal path without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<NameVersion>);

impl History {
    /// An empty path.
    pub fn new() -> Self {
        History(Vec::new())
    }

    /// Return a copy of this path extended by `nv`.
    ///
    /// Fails with [`CoreError::Recursion`] if `nv` is already on the path;
    /// the error renders the path as it was before the revisit.
    pub fn add(&self, kind: &str, nv: &NameVersion) -> Result<History> {
        if self.contains(nv) {
            return Err(CoreError::Recursion {
                kind: kind.to_string(),
                element: nv.clone(),
                history: self.clone(),
            });
        }
        let mut next = self.0.clone();
        next.push(nv.clone());
        Ok(History(next))
    }

    /// Whether `nv` occurs on the path.
    pub fn contains(&self, nv: &NameVersion) -> bool {
        self.0.iter().any(|e| e == nv)
    }

    /// The minimal cycle closed by revisiting `nv`: from its first occurrence
    /// to the end of the path, followed by `nv` again.
    ///
    /// Returns `None` if `nv` is not on the path.
    pub fn cycle(&self, nv: &NameVersion) -> Option<History> {
        let start = self.0.iter().position(|e| e == nv)?;
        let mut cycle = self.0[start..].to_vec();
        cycle.push(nv.clone());
        Some(History(cycle))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recently added entry.
    pub fn last(&self) -> Option<&NameVersion> {
        self.0.last()
    }

    /// Iterate from root to current node.
    pub fn iter(&self) -> impl Iterator<Item = &NameVersion> {
        self.0.iter()
    }

    /// Entries as a slice.
    pub fn as_slice(&self) -> &[NameVersion] {
        &self.0
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for nv in &self.0 {
            write!(f, "{sep}{nv}")?;
            sep = "->";
        }
        Ok(())
    }
}

impl FromIterator<NameVersion> for History {
    fn from_iter<I: IntoIterator<Item = NameVersion>>(iter: I) -> Self {
        let mut history = History::new();
        for nv in iter {
            if !history.contains(&nv) {
                history.0.push(nv);
            }
        }
        history
    }
}
