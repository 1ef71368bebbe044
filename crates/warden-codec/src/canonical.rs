//! Canonical serialization of a [`VaultDocument`] (spec.md §4.2, step 1).
//!
//! `VaultDocument` already keys its maps with `BTreeMap`, so `serde_json`
//! emits fields in a stable order without any extra sorting pass; this
//! module exists so "canonical bytes" has exactly one definition used by
//! both encryption and fingerprinting.

use warden_types::{Fingerprint, VaultDocument};

/// Serialize `doc` to its canonical byte form.
pub fn canonicalize(doc: &VaultDocument) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(doc)
}

/// Hash of the canonical byte form, stored as `VaultMetadata::fingerprint`
/// and recomputed on every save (spec.md §8-4).
pub fn fingerprint(canonical_bytes: &[u8]) -> Fingerprint {
    *blake3::hash(canonical_bytes).as_bytes()
}

/// Fingerprint of `doc` with its own `metadata.fingerprint` field zeroed
/// first, so the hash commits to the document's content rather than to
/// whatever fingerprint happened to be stored in it previously.
pub fn compute_fingerprint(doc: &VaultDocument) -> Fingerprint {
    let mut doc = doc.clone();
    doc.metadata.fingerprint = [0u8; 32];
    fingerprint(&canonicalize(&doc).expect("VaultDocument always serializes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn canonical_bytes_are_deterministic() {
        let doc = VaultDocument::new(Utc::now());
        let a = canonicalize(&doc).unwrap();
        let b = canonicalize(&doc).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let doc_a = VaultDocument::new(Utc::now());
        let mut doc_b = doc_a.clone();
        doc_b.global_tags.insert("prod".into());
        let fp_a = fingerprint(&canonicalize(&doc_a).unwrap());
        let fp_b = fingerprint(&canonicalize(&doc_b).unwrap());
        assert_ne!(fp_a, fp_b);
    }
}
