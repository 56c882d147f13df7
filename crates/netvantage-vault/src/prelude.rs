pub use crate::{
    routes::router, CredentialKey, CredentialMetadata, CredentialRecord, CredentialType, MasterKeyRecord, VaultError,
    VaultPlugin, VaultResult, VaultState, VaultStatus,
};
