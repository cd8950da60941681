use crate::jobs::model::JobKind;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Deterministic key over the identity of a unit of work. The source
/// text is deliberately excluded: re-enqueueing after an edit while a
/// prior job for the same field is outstanding coalesces onto that job
/// instead of producing a second one.
pub fn idempotency_key(
    kind: JobKind,
    organization_id: Uuid,
    source_table: &str,
    source_id: Uuid,
    source_field: &str,
    target_lang: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(organization_id.as_bytes());
    hasher.update(b"|");
    hasher.update(source_table.as_bytes());
    hasher.update(b"|");
    hasher.update(source_id.as_bytes());
    hasher.update(b"|");
    hasher.update(source_field.as_bytes());
    hasher.update(b"|");
    hasher.update(target_lang.unwrap_or("").as_bytes());

    use std::fmt::Write;

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
