//! OS advisory locking (spec.md §4.2 "Concurrency"): a single exclusive
//! writer lock serializes writers across processes; readers take a shared
//! lock and see a consistent snapshot because the file is replaced
//! atomically, never mutated in place.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::CodecError;

/// A held advisory lock on a vault's `.lock` file. Dropping it releases the
/// lock.
pub struct VaultLock {
    _file: File,
}

fn lock_path_for(vault_path: &Path) -> PathBuf {
    let file_name = vault_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    let mut lock_name = file_name;
    lock_name.push(".lock");
    vault_path.with_file_name(lock_name)
}

/// Acquire the exclusive writer lock for the vault at `vault_path`, failing
/// immediately (rather than blocking) if another process already holds it.
pub async fn acquire_exclusive(vault_path: &Path) -> Result<VaultLock, CodecError> {
    let path = lock_path_for(vault_path);
    tokio::task::spawn_blocking(move || {
        let file = File::create(&path)?;
        file.try_lock_exclusive().map_err(|_| CodecError::LockedByAnotherWriter)?;
        Ok(VaultLock { _file: file })
    })
    .await
    .expect("lock task panicked")
}

/// Acquire a shared reader lock, failing immediately if an exclusive writer
/// currently holds it.
pub async fn acquire_shared(vault_path: &Path) -> Result<VaultLock, CodecError> {
    let path = lock_path_for(vault_path);
    tokio::task::spawn_blocking(move || {
        let file = File::create(&path)?;
        file.try_lock_shared().map_err(|_| CodecError::LockedByAnotherWriter)?;
        Ok(VaultLock { _file: file })
    })
    .await
    .expect("lock task panicked")
}
