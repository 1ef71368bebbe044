//! Physical vault file framing and the durable, crash-safe write path
//! (spec.md §4.2 step 3, §6 "Vault file format").
//!
//! ```text
//! Magic(8 bytes) "VLT1"..  | HeaderLen(u32, big-endian) | Header(JSON, UTF-8) |
//! Ciphertext(bytes)        | AuthTag(bytes)
//! ```
//!
//! The GCM tag is appended to the ciphertext by `warden_crypto::seal`, so on
//! disk "Ciphertext" and "AuthTag" are one contiguous buffer; the header
//! authenticates both as a single AEAD output.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::CodecError;
use crate::header::Header;

const MAGIC: &[u8; 8] = b"VLT1\0\0\0\0";

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    let mut tmp_name = file_name;
    tmp_name.push(".tmp");
    path.with_file_name(tmp_name)
}

/// Frame `header` and `ciphertext` into the on-disk layout.
fn frame(header: &Header, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
    let header_json = serde_json::to_vec(header).map_err(|_| CodecError::Malformed("header did not serialize"))?;
    let header_len = u32::try_from(header_json.len())
        .map_err(|_| CodecError::Malformed("header too large"))?;
    let mut out = Vec::with_capacity(8 + 4 + header_json.len() + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&header_len.to_be_bytes());
    out.extend_from_slice(&header_json);
    out.extend_from_slice(ciphertext);
    Ok(out)
}

/// Split a raw file buffer back into its header (parsed, and as the raw
/// bytes actually on disk - callers need the latter to re-derive the exact
/// AEAD associated data used at encryption time) and the ciphertext.
fn unframe(buf: &[u8]) -> Result<(Header, &[u8], &[u8]), CodecError> {
    if buf.len() < 12 {
        return Err(CodecError::Malformed("file shorter than fixed framing"));
    }
    if &buf[0..8] != MAGIC {
        return Err(CodecError::Malformed("bad magic bytes"));
    }
    let header_len = u32::from_be_bytes(buf[8..12].try_into().unwrap()) as usize;
    let header_start = 12;
    let header_end = header_start
        .checked_add(header_len)
        .filter(|&end| end <= buf.len())
        .ok_or(CodecError::Malformed("header length exceeds file size"))?;
    let header_bytes = &buf[header_start..header_end];
    let header: Header = serde_json::from_slice(header_bytes)
        .map_err(|_| CodecError::Malformed("header is not valid JSON"))?;
    Ok((header, header_bytes, &buf[header_end..]))
}

/// Write `header`/`ciphertext` to `path`, crash-safely: stage to a sibling
/// `.tmp` file, `fsync` it, atomically rename over `path`, then `fsync` the
/// containing directory so the rename itself survives a crash.
pub async fn write_vault_file(path: &Path, header: &Header, ciphertext: &[u8]) -> Result<(), CodecError> {
    let tmp_path = tmp_path_for(path);
    let framed = frame(header, ciphertext)?;

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(&framed).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await?;

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fsync_dir(&dir).await?;
    Ok(())
}

/// Read and unframe the vault file at `path`. Returns the parsed header, the
/// exact header bytes as stored on disk (the AEAD associated data), and the
/// raw ciphertext (still encrypted and unauthenticated at this point;
/// callers must run it through `warden_crypto::open`).
pub async fn read_vault_file(path: &Path) -> Result<(Header, Vec<u8>, Vec<u8>), CodecError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;
    let (header, header_bytes, ciphertext) = unframe(&buf)?;
    Ok((header, header_bytes.to_vec(), ciphertext.to_vec()))
}

async fn fsync_dir(dir: &Path) -> Result<(), CodecError> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
        let f = std::fs::File::open(&dir)?;
        f.sync_all()
    })
    .await
    .expect("fsync_dir task panicked")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_header() -> Header {
        Header {
            schema_version: 1,
            algo: Header::ALGO_V1.to_string(),
            recipients: Vec::new(),
            nonce: [1u8; 12],
            created_at: Utc::now(),
            fingerprint_algo: Header::FINGERPRINT_BLAKE3.to_string(),
        }
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault");
        let header = sample_header();
        write_vault_file(&path, &header, b"ciphertext-bytes").await.unwrap();

        let (read_header, _header_bytes, ciphertext) = read_vault_file(&path).await.unwrap();
        assert_eq!(read_header.schema_version, header.schema_version);
        assert_eq!(ciphertext, b"ciphertext-bytes");
    }

    #[tokio::test]
    async fn tmp_file_is_not_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault");
        write_vault_file(&path, &sample_header(), b"x").await.unwrap();
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn unframe_rejects_bad_magic() {
        let buf = vec![0u8; 20];
        assert!(unframe(&buf).is_err());
    }
}
