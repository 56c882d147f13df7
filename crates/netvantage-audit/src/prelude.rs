//! Commonly used types for convenient import.

pub use crate::{AuditEntry, AuditError, AuditLog, AuditResult, AuditStorage, ChainIssue, ChainVerificationResult, KvAuditStorage};
