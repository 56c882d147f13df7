//! Per-type validation for credential `data` payloads.

use crate::error::{VaultError, VaultResult};
use crate::model::CredentialType;

fn require_str(data: &serde_json::Value, key: &str) -> VaultResult<()> {
    match data.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(()),
        Some(serde_json::Value::String(_)) => Err(VaultError::Validation(format!("{key} must not be empty"))),
        Some(_) => Err(VaultError::Validation(format!("{key} must be a string"))),
        None => Err(VaultError::Validation(format!("missing required field: {key}"))),
    }
}

/// Validate `name` per the 1..255 non-blank character rule every credential
/// create/update path enforces.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] if `name` is empty, blank, or over
/// 255 characters.
pub(crate) fn validate_name(name: &str) -> VaultResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(VaultError::Validation("name must not be blank".into()));
    }
    if name.chars().count() > 255 {
        return Err(VaultError::Validation("name must be at most 255 characters".into()));
    }
    Ok(())
}

/// Validate that `data` carries the required keys for `kind`, per the
/// vault's credential data shape table.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] if a required key is absent, empty,
/// or the wrong JSON type.
pub(crate) fn validate_data(kind: CredentialType, data: &serde_json::Value) -> VaultResult<()> {
    match kind {
        CredentialType::SshPassword => {
            require_str(data, "username")?;
            require_str(data, "password")
        },
        CredentialType::SshKey => {
            require_str(data, "username")?;
            require_str(data, "private_key")
        },
        CredentialType::SnmpV2c => require_str(data, "community"),
        CredentialType::SnmpV3 => {
            require_str(data, "username")?;
            require_str(data, "auth_protocol")?;
            require_str(data, "auth_key")?;
            require_str(data, "security_level")
        },
        CredentialType::ApiKey => require_str(data, "key"),
        CredentialType::HttpBasic => {
            require_str(data, "username")?;
            require_str(data, "password")
        },
        CredentialType::Custom => match data.get("fields") {
            Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(VaultError::Validation("fields must be a map".into())),
            None => Err(VaultError::Validation("missing required field: fields".into())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ssh_password_requires_both_fields() {
        assert!(validate_data(CredentialType::SshPassword, &json!({"username": "root", "password": "hunter2"})).is_ok());
        assert!(validate_data(CredentialType::SshPassword, &json!({"username": "root"})).is_err());
        assert!(validate_data(CredentialType::SshPassword, &json!({"username": "", "password": "x"})).is_err());
    }

    #[test]
    fn custom_requires_map() {
        assert!(validate_data(CredentialType::Custom, &json!({"fields": {"a": "b"}})).is_ok());
        assert!(validate_data(CredentialType::Custom, &json!({"fields": "not-a-map"})).is_err());
    }

    #[test]
    fn name_rejects_blank_and_overlong() {
        assert!(validate_name("router-01").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }
}
