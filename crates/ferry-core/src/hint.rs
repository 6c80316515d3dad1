//! Reference hint collision guard for local blobs.

use crate::access::AccessSpec;
use crate::blob::base_media_type;
use crate::descriptor::{ComponentDescriptor, Identity, KIND_RESOURCE, KIND_SOURCE};
use crate::error::{CoreError, Result};

/// Reject `access` if another local blob of `descriptor` already uses the
/// same reference hint with the same base media type.
///
/// The element being replaced (same kind and identity) is not considered a
/// collision. Accesses without a hint always pass.
pub fn check_hint(
    descriptor: &ComponentDescriptor,
    kind: &str,
    identity: &Identity,
    access: &AccessSpec,
) -> Result<()> {
    let (hint, media_type) = match access {
        AccessSpec::LocalBlob {
            reference_name: Some(hint),
            media_type,
            ..
        } if !hint.is_empty() => (hint.as_str(), base_media_type(media_type)),
        _ => return Ok(()),
    };

    let resources = descriptor
        .resources
        .iter()
        .map(|r| (KIND_RESOURCE, r.identity(), &r.access));
    let sources = descriptor
        .sources
        .iter()
        .map(|s| (KIND_SOURCE, s.identity(), &s.access));

    for (other_kind, other_id, other_access) in resources.chain(sources) {
        if other_kind == kind && &other_id == identity {
            continue;
        }
        if other_access.reference_name() != Some(hint) {
            continue;
        }
        let other_type = other_access.media_type().map(base_media_type).unwrap_or("");
        if other_type == media_type {
            return Err(CoreError::AmbiguousHint {
                hint: hint.to_string(),
                media_type: media_type.to_string(),
                element: format!("{other_kind} {other_id}"),
            });
        }
    }
    Ok(())
}
