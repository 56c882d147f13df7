//! The audit entry type.
//!
//! Every security-relevant operation — credential creation, decryption,
//! session open/close, vault seal/unseal — is recorded as an
//! [`AuditEntry`]. Entries are chain-linked (each carries the content
//! hash of the previous entry for the same subject) and signed by the
//! host's runtime key, so a tampered or reordered history is
//! detectable even though the store itself is a plain key-value map.

use netvantage_crypto::{ContentHash, KeyPair, PublicKey, Signature};
use netvantage_core::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuditError, AuditResult};

/// A single, signed audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The resource the action was performed on (a credential ID, a
    /// session ID, a device ID — whatever the caller is auditing).
    pub subject_id: String,
    /// The identity that performed the action, if known.
    pub user_id: Option<String>,
    /// What happened, e.g. `"created"`, `"closed:disconnected"`,
    /// `"closed:expired"`.
    pub action: String,
    /// Why plaintext was requested, for credential-data reads.
    pub purpose: Option<String>,
    /// Originating IP address of the request, if available.
    pub source_ip: Option<String>,
    /// When this entry was recorded.
    pub timestamp: Timestamp,
    /// Content hash of the previous entry for this subject, or
    /// [`ContentHash::zero`] if this is the first.
    pub previous_hash: ContentHash,
    /// Runtime public key that signed this entry.
    pub runtime_key: PublicKey,
    /// Signature over the entry's canonical byte representation.
    pub signature: Signature,
}

impl AuditEntry {
    /// Create and sign a new entry.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        subject_id: impl Into<String>,
        user_id: Option<String>,
        action: impl Into<String>,
        purpose: Option<String>,
        source_ip: Option<String>,
        previous_hash: ContentHash,
        runtime_key: &KeyPair,
    ) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            user_id,
            action: action.into(),
            purpose,
            source_ip,
            timestamp: Timestamp::now(),
            previous_hash,
            runtime_key: runtime_key.export_public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        let signing_data = entry.signing_data();
        entry.signature = runtime_key.sign(&signing_data);
        entry
    }

    /// Bytes fed to the signature and the content hash. Field order is
    /// fixed so re-derivation is deterministic across versions.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.id.as_bytes());
        data.extend_from_slice(self.subject_id.as_bytes());
        if let Some(user_id) = &self.user_id {
            data.extend_from_slice(user_id.as_bytes());
        }
        data.extend_from_slice(self.action.as_bytes());
        if let Some(purpose) = &self.purpose {
            data.extend_from_slice(purpose.as_bytes());
        }
        if let Some(ip) = &self.source_ip {
            data.extend_from_slice(ip.as_bytes());
        }
        data.extend_from_slice(&self.timestamp.0.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        data.extend_from_slice(self.previous_hash.as_bytes());
        data.extend_from_slice(self.runtime_key.as_bytes());
        data
    }

    /// The content hash of this entry, used as the `previous_hash` of
    /// whatever entry follows it for the same subject.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }

    /// Verify this entry's signature against its own `runtime_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidSignature`] if the signature does
    /// not match the entry's contents.
    pub fn verify_signature(&self) -> AuditResult<()> {
        let signing_data = self.signing_data();
        self.runtime_key.verify(&signing_data, &self.signature).map_err(|_| AuditError::InvalidSignature {
            entry_id: self.id.to_string(),
        })
    }

    /// Whether this entry's `previous_hash` matches `previous`'s content
    /// hash, i.e. whether it legitimately follows it in the chain.
    #[must_use]
    pub fn follows(&self, previous: &AuditEntry) -> bool {
        self.previous_hash == previous.content_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_signature_round_trips() {
        let key = KeyPair::generate();
        let entry = AuditEntry::create("cred-1", Some("alice".into()), "created", None, None, ContentHash::zero(), &key);
        assert!(entry.verify_signature().is_ok());
    }

    #[test]
    fn chain_linking_detects_order() {
        let key = KeyPair::generate();
        let first = AuditEntry::create("sess-1", None, "created", None, None, ContentHash::zero(), &key);
        let second =
            AuditEntry::create("sess-1", None, "closed:disconnected", None, None, first.content_hash(), &key);

        assert!(second.follows(&first));
        assert!(!first.follows(&second));
    }

    #[test]
    fn tampering_breaks_signature() {
        let key = KeyPair::generate();
        let mut entry = AuditEntry::create("cred-1", None, "created", None, None, ContentHash::zero(), &key);
        assert!(entry.verify_signature().is_ok());

        entry.action = "deleted".to_string();
        assert!(entry.verify_signature().is_err());
    }
}
