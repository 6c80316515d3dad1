//! Component version identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Identity of one component version: a `(name, version)` pair.
///
/// Rendered and serialized as `name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameVersion {
    name: String,
    version: String,
}

impl NameVersion {
    /// Create a new identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        NameVersion {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for NameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for NameVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: &str| CoreError::InvalidNameVersion {
            input: s.to_string(),
            detail: detail.to_string(),
        };
        let (name, version) = s.rsplit_once(':').ok_or_else(|| invalid("missing ':'"))?;
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if version.is_empty() || version.contains('/') {
            return Err(invalid("empty or malformed version"));
        }
        Ok(NameVersion::new(name, version))
    }
}

impl Serialize for NameVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NameVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let nv = NameVersion::new("acme.org/x", "v1");
        assert_eq!(nv.to_string(), "acme.org/x:v1");
        assert_eq!("acme.org/x:v1".parse::<NameVersion>().unwrap(), nv);
    }

    #[test]
    fn parse_keeps_port_in_name() {
        let nv: NameVersion = "localhost:5000/x:1.0.0".parse().unwrap();
        assert_eq!(nv.name(), "localhost:5000/x");
        assert_eq!(nv.version(), "1.0.0");
    }

    #[test]
    fn parse_rejects_missing_version() {
        assert!("acme.org/x".parse::<NameVersion>().is_err());
        assert!("acme.org/x:".parse::<NameVersion>().is_err());
        assert!(":v1".parse::<NameVersion>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let nv = NameVersion::new("a", "v1");
        assert_eq!(serde_json::to_string(&nv).unwrap(), "\"a:v1\"");
        let back: NameVersion = serde_json::from_str("\"a:v1\"").unwrap();
        assert_eq!(back, nv);
    }
}
