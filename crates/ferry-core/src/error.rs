//! Error taxonomy shared by the checker, the transfer engine and the
//! repository implementations.

use crate::history::History;
use crate::name_version::NameVersion;

/// Errors raised while walking or copying component versions.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An element is absent from every reachable repository.
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// A component version was reached again on its own traversal path.
    #[error("{kind} recursion: use of {element} for {history}")]
    Recursion {
        kind: String,
        element: NameVersion,
        history: History,
    },

    /// Two local blobs of one version share a reference hint and base media type.
    #[error("reference name hint \"{hint}\" ({media_type}) already used by {element}")]
    AmbiguousHint {
        hint: String,
        media_type: String,
        element: String,
    },

    /// Two elements of one descriptor share the same identity.
    #[error("duplicate {kind} identity {identity} in {owner}")]
    DuplicateIdentity {
        kind: String,
        identity: String,
        owner: NameVersion,
    },

    /// The element already exists and may not be replaced.
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: String, name: String },

    /// A handle was used or closed after it had been closed.
    #[error("{what} already closed")]
    Closed { what: String },

    /// No access method is known for an access specification type.
    #[error("unknown access method type \"{kind}\"")]
    UnknownAccessMethod { kind: String },

    /// A configuration option name is not recognised.
    #[error("unknown transfer option \"{name}\"")]
    UnknownOption { name: String },

    /// A `name:version` string could not be parsed.
    #[error("invalid component version reference \"{input}\": {detail}")]
    InvalidNameVersion { input: String, detail: String },

    /// Stored blob content does not match its digest.
    #[error("integrity check failed for blob {expected}: content hashes to {actual}")]
    IntegrityFailure { expected: String, actual: String },

    /// The caller raised the interrupt flag.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// An error annotated with the element it happened on.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<CoreError>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`].
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Add one level of context to this error.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        CoreError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error below any context wrapping.
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the innermost error is a [`CoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), CoreError::NotFound { .. })
    }

    /// Whether the innermost error is a [`CoreError::Recursion`].
    pub fn is_recursion(&self) -> bool {
        matches!(self.root(), CoreError::Recursion { .. })
    }
}

/// Result type alias for component operations.
pub type Result<T> = std::result::Result<T, CoreError>;
