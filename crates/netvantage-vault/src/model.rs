//! Credential, key, and master-key record shapes.

use netvantage_core::Timestamp;
use serde::{Deserialize, Serialize};

/// The kind of secret a [`CredentialRecord`] holds, gating which keys its
/// `data` must carry (see [`crate::validation::validate_data`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Username/password pair for SSH login.
    SshPassword,
    /// Username/private-key pair for SSH login.
    SshKey,
    /// SNMP v2c community string.
    SnmpV2c,
    /// SNMP v3 USM credentials.
    SnmpV3,
    /// Opaque bearer API key.
    ApiKey,
    /// HTTP basic-auth username/password.
    HttpBasic,
    /// Operator-defined field map, not otherwise modelled.
    Custom,
}

/// A stored credential. `encrypted_data` is `nonce(12) ‖ AEAD(DEK, json)`;
/// it is never returned from a metadata-only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Stable credential id.
    pub id: String,
    /// Operator-facing name, 1..255 non-blank characters.
    pub name: String,
    /// Credential type, gating the shape of the decrypted `data`.
    #[serde(rename = "type")]
    pub kind: CredentialType,
    /// Device this credential is associated with, if any.
    pub device_id: Option<String>,
    /// Free-form operator description.
    pub description: Option<String>,
    /// `nonce(12) ‖ AEAD(DEK, plaintext_json)`.
    pub encrypted_data: Vec<u8>,
    /// When this credential was first created.
    pub created_at: Timestamp,
    /// When this credential was last updated.
    pub updated_at: Timestamp,
}

impl CredentialRecord {
    /// This record with `encrypted_data` stripped, for metadata-only reads.
    #[must_use]
    pub fn without_data(&self) -> CredentialMetadata {
        CredentialMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            device_id: self.device_id.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// [`CredentialRecord`] with `encrypted_data` omitted, returned from every
/// route except `GET /credentials/{id}/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
    /// Stable credential id.
    pub id: String,
    /// Operator-facing name.
    pub name: String,
    /// Credential type.
    #[serde(rename = "type")]
    pub kind: CredentialType,
    /// Associated device, if any.
    pub device_id: Option<String>,
    /// Operator description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    pub updated_at: Timestamp,
}

/// The wrapped DEK for one credential. One row per credential; exists iff
/// the credential does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialKey {
    /// The credential this key belongs to.
    pub credential_id: String,
    /// `nonce(12) ‖ AEAD(KEK, DEK)`.
    pub wrapped_dek: Vec<u8>,
}

/// Singleton master-key record persisted once per vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterKeyRecord {
    /// Argon2id salt.
    pub salt: [u8; 16],
    /// `AEAD(KEK, MAGIC)`, the known-plaintext verification blob.
    pub verification_blob: Vec<u8>,
}

/// Current vault seal state and credential/key counts, for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStatus {
    /// `"uninitialised"`, `"sealed"`, or `"unsealed"`.
    pub state: String,
    /// Number of stored credentials.
    pub credential_count: usize,
}
