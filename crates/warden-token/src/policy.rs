//! The principal policy table. Canonical definition lives in `warden-types`
//! so `VaultDocument` can carry it as a persisted section (spec.md §6:
//! "Policy is part of the persisted vault document"); re-exported here so
//! existing callers of `warden_token::PolicyTable`/`PrincipalPolicy` keep
//! working unchanged.

pub use warden_types::{PolicyTable, PrincipalPolicy};
