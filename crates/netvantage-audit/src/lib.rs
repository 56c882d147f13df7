//! Chain-linked, signed audit logging for the NetVantage plugin fabric.
//!
//! Every security-relevant operation — credential creation and
//! decryption, session open/close, vault seal/unseal — is recorded as
//! an [`AuditEntry`]. Entries are signed with the host's runtime key
//! and chain-linked per subject, so a tampered or reordered history is
//! detectable even though the backing store is a plain key-value map.
//! [`AuditLog`] is the service every module writes through; entries are
//! pruned on a retention clock via [`AuditLog::prune_retention`].

pub mod prelude;

mod entry;
mod error;
mod log;
mod storage;

pub use entry::AuditEntry;
pub use error::{AuditError, AuditResult};
pub use log::{AuditLog, ChainIssue, ChainVerificationResult};
pub use storage::{AuditStorage, KvAuditStorage};
