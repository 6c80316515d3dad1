//! Transfer options.
//!
//! Options are plain fields with builder methods. String-named flags, as
//! used by configuration files and command lines, are validated once through
//! [`TransferOptions::set_flag`].

use serde::{Deserialize, Serialize};

use ferry_core::{CoreError, Result};

/// Names accepted by [`TransferOptions::set_flag`].
pub const FLAG_NAMES: &[&str] = &[
    "recursive",
    "resources-by-value",
    "local-resources-by-value",
    "sources-by-value",
    "keep-global-access",
    "overwrite",
    "skip-update",
    "enforce-transport",
    "stop-on-existing",
];

/// Settings consulted by the standard transfer handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransferOptions {
    /// Transfer referenced component versions too.
    pub recursive: bool,
    /// Copy the content of every resource into the target.
    pub resources_by_value: bool,
    /// Copy the content of resources with a local relation.
    pub local_resources_by_value: bool,
    /// Copy the content of every source into the target.
    pub sources_by_value: bool,
    /// Keep the original access as global access of copied content.
    pub keep_global_access: bool,
    /// Replace versions already present in the target.
    pub overwrite: bool,
    /// Leave present versions alone even if only their labels differ.
    pub skip_update: bool,
    /// Transfer as if the target held none of the versions.
    pub enforce_transport: bool,
    /// Do not descend below versions skipped because they already exist.
    pub stop_on_existing: bool,
    /// Access types never copied by value.
    pub omit_access_types: Vec<String>,
    /// Resource and source types never copied by value.
    pub omit_artifact_types: Vec<String>,
}

impl TransferOptions {
    pub fn new() -> Self {
        TransferOptions::default()
    }

    pub fn recursive(mut self, enabled: bool) -> Self {
        self.recursive = enabled;
        self
    }

    pub fn resources_by_value(mut self, enabled: bool) -> Self {
        self.resources_by_value = enabled;
        self
    }

    pub fn local_resources_by_value(mut self, enabled: bool) -> Self {
        self.local_resources_by_value = enabled;
        self
    }

    pub fn sources_by_value(mut self, enabled: bool) -> Self {
        self.sources_by_value = enabled;
        self
    }

    pub fn keep_global_access(mut self, enabled: bool) -> Self {
        self.keep_global_access = enabled;
        self
    }

    pub fn overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    pub fn skip_update(mut self, enabled: bool) -> Self {
        self.skip_update = enabled;
        self
    }

    pub fn enforce_transport(mut self, enabled: bool) -> Self {
        self.enforce_transport = enabled;
        self
    }

    pub fn stop_on_existing(mut self, enabled: bool) -> Self {
        self.stop_on_existing = enabled;
        self
    }

    pub fn omit_access_type(mut self, kind: impl Into<String>) -> Self {
        self.omit_access_types.push(kind.into());
        self
    }

    pub fn omit_artifact_type(mut self, kind: impl Into<String>) -> Self {
        self.omit_artifact_types.push(kind.into());
        self
    }

    /// Set a boolean option by name.
    pub fn set_flag(&mut self, name: &str, value: bool) -> Result<()> {
        let field = match name {
            "recursive" => &mut self.recursive,
            "resources-by-value" => &mut self.resources_by_value,
            "local-resources-by-value" => &mut self.local_resources_by_value,
            "sources-by-value" => &mut self.sources_by_value,
            "keep-global-access" => &mut self.keep_global_access,
            "overwrite" => &mut self.overwrite,
            "skip-update" => &mut self.skip_update,
            "enforce-transport" => &mut self.enforce_transport,
            "stop-on-existing" => &mut self.stop_on_existing,
            _ => {
                return Err(CoreError::UnknownOption {
                    name: name.to_string(),
                })
            }
        };
        *field = value;
        Ok(())
    }

    pub fn is_access_type_omitted(&self, kind: &str) -> bool {
        self.omit_access_types.iter().any(|t| t == kind)
    }

    pub fn is_artifact_type_omitted(&self, kind: &str) -> bool {
        self.omit_artifact_types.iter().any(|t| t == kind)
    }
}
