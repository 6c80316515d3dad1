//! Content-addressed blobs.
//!
//! Every blob carried between repositories is addressed by the SHA-256 of
//! its bytes, rendered as `sha256:<hex>`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Content digest of a blob (`sha256:<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Compute the digest of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Digest(format!("sha256:{}", hex_encode(&hasher.finalize())))
    }

    /// Wrap an already rendered digest string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Digest(s.into())
    }

    /// Full `algorithm:hex` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex part without the algorithm prefix.
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, h)| h).unwrap_or(&self.0)
    }

    /// Verify that the given data matches this digest.
    pub fn verify(&self, data: &[u8]) -> bool {
        Digest::compute(data) == *self
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Blob content together with its media type and digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobAccess {
    data: Vec<u8>,
    media_type: String,
    digest: Digest,
}

impl BlobAccess {
    /// Wrap bytes, computing their digest.
    pub fn new(data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        let data = data.into();
        let digest = Digest::compute(&data);
        BlobAccess {
            data,
            media_type: media_type.into(),
            digest,
        }
    }

    /// Blob bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Media type of the content.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Content digest.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Strip parameters and structured-syntax suffixes from a media type.
///
/// `application/vnd.oci.image.manifest.v1+tar+gzip; charset=x` becomes
/// `application/vnd.oci.image.manifest.v1`.
pub fn base_media_type(media_type: &str) -> &str {
    let no_params = media_type.split(';').next().unwrap_or("").trim();
    no_params.split('+').next().unwrap_or(no_params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_input() {
        assert_eq!(
            Digest::compute(b"").as_str(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_verify_and_hex() {
        let d = Digest::compute(b"payload");
        assert!(d.verify(b"payload"));
        assert!(!d.verify(b"tampered"));
        assert_eq!(d.hex().len(), 64);
    }

    #[test]
    fn blob_carries_digest() {
        let blob = BlobAccess::new(b"abc".to_vec(), "text/plain");
        assert_eq!(blob.size(), 3);
        assert_eq!(blob.digest(), &Digest::compute(b"abc"));
    }

    #[test]
    fn base_media_types() {
        assert_eq!(
            base_media_type("application/vnd.oci.image.manifest.v1+tar+gzip"),
            "application/vnd.oci.image.manifest.v1"
        );
        assert_eq!(
            base_media_type("application/vnd.oci.image.manifest.v1"),
            "application/vnd.oci.image.manifest.v1"
        );
        assert_eq!(base_media_type("text/plain; charset=utf-8"), "text/plain");
    }
}
