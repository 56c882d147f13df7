//! High-level audit logging: signs and chain-links entries so callers
//! never have to manage `previous_hash` themselves.

use std::sync::Arc;

use netvantage_core::Timestamp;
use netvantage_crypto::{ContentHash, KeyPair};

use crate::entry::AuditEntry;
use crate::error::AuditResult;
use crate::storage::AuditStorage;

/// The audit service every module writes through.
///
/// One [`AuditLog`] is constructed at host startup with the runtime's
/// signing key and shared with every module via [`netvantage_core::Dependencies`].
/// Write failures are never fatal to the caller (see
/// [`AuditLog::append_best_effort`]) — per the fabric's audit
/// guarantees, a broken audit trail logs a warning rather than failing
/// the user-visible operation.
#[derive(Clone)]
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
    runtime_key: Arc<KeyPair>,
}

impl AuditLog {
    /// Build a log over `storage`, signing every entry with `runtime_key`.
    #[must_use]
    pub fn new(storage: Arc<dyn AuditStorage>, runtime_key: Arc<KeyPair>) -> Self {
        Self { storage, runtime_key }
    }

    /// Record a new entry for `subject_id`, chain-linked to whatever was
    /// last recorded for that subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain head lookup or the write fails.
    pub async fn append(
        &self,
        subject_id: impl Into<String>,
        user_id: Option<String>,
        action: impl Into<String>,
        purpose: Option<String>,
        source_ip: Option<String>,
    ) -> AuditResult<AuditEntry> {
        let subject_id = subject_id.into();
        let previous_hash = match self.storage.chain_head(&subject_id).await? {
            Some(head_id) => {
                self.storage.get(head_id).await?.map(|e| e.content_hash()).unwrap_or_else(ContentHash::zero)
            },
            None => ContentHash::zero(),
        };

        let entry = AuditEntry::create(subject_id, user_id, action, purpose, source_ip, previous_hash, &self.runtime_key);
        self.storage.store(&entry).await?;
        Ok(entry)
    }

    /// [`AuditLog::append`], but swallows and logs any failure instead of
    /// propagating it — per the fabric's audit guarantees, a failed
    /// audit write must never fail the operation it's recording.
    pub async fn append_best_effort(
        &self,
        subject_id: impl Into<String>,
        user_id: Option<String>,
        action: impl Into<String>,
        purpose: Option<String>,
        source_ip: Option<String>,
    ) -> Option<AuditEntry> {
        match self.append(subject_id, user_id, action, purpose, source_ip).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "audit write failed");
                None
            },
        }
    }

    /// All entries recorded for a subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    pub async fn entries_for_subject(&self, subject_id: &str) -> AuditResult<Vec<AuditEntry>> {
        self.storage.entries_for_subject(subject_id).await
    }

    /// Verify every entry for `subject_id` is correctly signed and
    /// correctly chain-linked to its predecessor, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn verify_chain(&self, subject_id: &str) -> AuditResult<ChainVerificationResult> {
        let entries = self.entries_for_subject(subject_id).await?;
        let mut issues = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            if entry.verify_signature().is_err() {
                issues.push(ChainIssue { entry_id: entry.id, reason: "invalid signature".to_string() });
            }
            if i == 0 {
                if entry.previous_hash != ContentHash::zero() {
                    issues.push(ChainIssue { entry_id: entry.id, reason: "first entry has non-zero previous_hash".to_string() });
                }
            } else if !entry.follows(&entries[i - 1]) {
                issues.push(ChainIssue { entry_id: entry.id, reason: "does not follow the preceding entry".to_string() });
            }
        }

        Ok(ChainVerificationResult { valid: issues.is_empty(), issues })
    }

    /// Prune every entry older than `retention_days` days. Called from a
    /// module's maintenance loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    pub async fn prune_retention(&self, retention_days: i64) -> AuditResult<usize> {
        let cutoff = Timestamp::from_datetime(chrono::Utc::now() - chrono::Duration::days(retention_days));
        self.storage.prune_older_than(cutoff).await
    }
}

/// Result of [`AuditLog::verify_chain`].
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// Whether the chain had no detected issues.
    pub valid: bool,
    /// Every issue found, in chain order.
    pub issues: Vec<ChainIssue>,
}

/// A single chain integrity problem found by [`AuditLog::verify_chain`].
#[derive(Debug, Clone)]
pub struct ChainIssue {
    /// The entry where the issue was detected.
    pub entry_id: uuid::Uuid,
    /// Human-readable description.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KvAuditStorage;
    use netvantage_storage::MemoryKvStore;

    fn log() -> AuditLog {
        AuditLog::new(Arc::new(KvAuditStorage::new(Arc::new(MemoryKvStore::new()))), Arc::new(KeyPair::generate()))
    }

    #[tokio::test]
    async fn append_chain_links_automatically() {
        let log = log();
        let first = log.append("cred-1", None, "created", None, None).await.unwrap();
        let second = log.append("cred-1", None, "read", Some("diagnostics".into()), None).await.unwrap();
        assert!(second.follows(&first));
    }

    #[tokio::test]
    async fn verify_chain_reports_clean_history() {
        let log = log();
        log.append("sess-1", None, "created", None, None).await.unwrap();
        log.append("sess-1", None, "closed:disconnected", None, None).await.unwrap();

        let result = log.verify_chain("sess-1").await.unwrap();
        assert!(result.valid);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn prune_retention_drops_expired_entries() {
        let log = log();
        log.append("cred-1", None, "created", None, None).await.unwrap();
        let pruned = log.prune_retention(-1).await.unwrap();
        assert_eq!(pruned, 1);
    }

    #[tokio::test]
    async fn append_best_effort_never_panics_on_success() {
        let log = log();
        let entry = log.append_best_effort("cred-1", None, "created", None, None).await;
        assert!(entry.is_some());
    }
}
