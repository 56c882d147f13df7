//! NetVantage Vault - envelope-encrypted credential storage module.
//!
//! This crate provides:
//! - [`VaultState`] — the seal/unseal state machine and credential CRUD,
//!   built on [`netvantage_crypto`]'s envelope-encryption primitives
//! - [`VaultPlugin`] — the `Plugin` implementation that wires the vault into
//!   the fabric's lifecycle and advertises `credential_provider`
//! - [`routes::router`] — the axum HTTP surface mounted under `/api/v1/vault`

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod model;
mod plugin;
pub mod routes;
mod store;
mod validation;
mod vault;

pub use error::{VaultError, VaultResult};
pub use model::{CredentialKey, CredentialMetadata, CredentialRecord, CredentialType, MasterKeyRecord, VaultStatus};
pub use plugin::{VaultPlugin, CREDENTIAL_PROVIDER_ROLE, VAULT_PASSPHRASE_ENV};
pub use vault::VaultState;
