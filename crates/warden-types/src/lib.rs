//! Shared data model for Warden: the types every other crate in the
//! workspace builds on. No I/O, no crypto, no locking - this crate only
//! shapes data and validates identifiers. See `warden-codec` for the on-disk
//! representation and `warden-store` for the mutation invariants.

#![forbid(unsafe_code)]

mod errors;
mod ids;
mod policy;
mod scope;
mod secret_bytes;
mod subject;
mod vault;

pub use errors::{ErrorKind, Outcome};
pub use ids::{InvalidName, Principal, ProjectName, SecretKey, TokenId};
pub use policy::{PolicyTable, PrincipalPolicy};
pub use scope::{Action, Resource, Scope};
pub use secret_bytes::SecretBytes;
pub use subject::Subject;
pub use vault::{
    Classification, Fingerprint, Generator, Project, RotationPolicy, Secret, SecretVersion,
    Source, VaultDocument, VaultMetadata, VersionState,
};
