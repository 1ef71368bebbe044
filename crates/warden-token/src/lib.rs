//! Bearer token issuance and validation for Warden (C6 + C7): a compact
//! signed wire format, a principal policy table, and the signing-key
//! rotation supplementing the vault's own crypto.

#![forbid(unsafe_code)]

mod claims;
mod error;
mod issuer;
mod policy;
mod rotation;
mod validator;
mod wire;

pub use claims::{Claims, KeySelector, TokenScope, WildcardMarker};
pub use error::{IssueError, ValidateError};
pub use issuer::{issue, SystemTtlDefaults};
pub use policy::{PolicyTable, PrincipalPolicy};
pub use rotation::SigningKeyRing;
pub use validator::{validate, Want};
pub use wire::{decode_and_verify, encode};
