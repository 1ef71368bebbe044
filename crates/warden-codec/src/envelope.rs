//! Combines canonicalization, the outer AEAD layer, and the header framing
//! into the write/read paths described in spec.md §4.2.

use warden_crypto::Key;
use warden_types::VaultDocument;

use crate::canonical::{canonicalize, compute_fingerprint};
use crate::error::CodecError;
use crate::header::{Header, Recipient};

/// Canonicalize, stamp the fingerprint, and seal `doc` under `dek`, ready to
/// be framed to disk by `file::write_vault_file`.
pub fn encode(doc: &VaultDocument, dek: &Key, recipients: Vec<Recipient>) -> Result<(Header, Vec<u8>), CodecError> {
    let mut doc = doc.clone();
    doc.metadata.fingerprint = compute_fingerprint(&doc);

    let nonce = warden_crypto::random_nonce();
    let header = Header {
        schema_version: doc.schema_version,
        algo: Header::ALGO_V1.to_string(),
        recipients,
        nonce,
        created_at: doc.metadata.created_at,
        fingerprint_algo: Header::FINGERPRINT_BLAKE3.to_string(),
    };
    let header_bytes = serde_json::to_vec(&header).map_err(|_| CodecError::Malformed("header did not serialize"))?;

    let plaintext = canonicalize(&doc).map_err(|_| CodecError::Malformed("document did not serialize"))?;
    let ciphertext = warden_crypto::seal(dek, &header.nonce, &header_bytes, &plaintext)
        .map_err(|_| CodecError::IntegrityError)?;
    Ok((header, ciphertext))
}

/// Open the ciphertext framed alongside `header`/`header_bytes` under `dek`,
/// rejecting unsupported schema versions before returning the document.
pub fn decode(header: &Header, header_bytes: &[u8], ciphertext: &[u8], dek: &Key) -> Result<VaultDocument, CodecError> {
    if header.schema_version > Header::SUPPORTED_SCHEMA_VERSION {
        return Err(CodecError::SchemaError {
            found: header.schema_version,
            supported: Header::SUPPORTED_SCHEMA_VERSION,
        });
    }
    let plaintext = warden_crypto::open(dek, &header.nonce, header_bytes, ciphertext)
        .map_err(|_| CodecError::IntegrityError)?;
    let doc: VaultDocument =
        serde_json::from_slice(&plaintext).map_err(|_| CodecError::Malformed("ciphertext did not decode to a document"))?;
    Ok(doc)
}
