use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarcError {
    #[error("another varc command holds the vault lock ({0})")]
    Locked(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("vault state is corrupt: {0}")]
    StateCorrupt(String),
    #[error("vault directory does not exist: {0}")]
    VaultMissing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarcErrorCode {
    E001Locked,
    E002SettingsInvalid,
    E003StateCorrupt,
    E004VaultMissing,
}

impl VarcErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Locked => "E001_LOCKED",
            Self::E002SettingsInvalid => "E002_SETTINGS_INVALID",
            Self::E003StateCorrupt => "E003_STATE_CORRUPT",
            Self::E004VaultMissing => "E004_VAULT_MISSING",
        }
    }
}

impl VarcError {
    pub fn code(&self) -> VarcErrorCode {
        match self {
            Self::Locked(_) => VarcErrorCode::E001Locked,
            Self::InvalidSettings(_) => VarcErrorCode::E002SettingsInvalid,
            Self::StateCorrupt(_) => VarcErrorCode::E003StateCorrupt,
            Self::VaultMissing(_) => VarcErrorCode::E004VaultMissing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_maps_variant() {
        let err = VarcError::InvalidSettings("bad".to_string());
        assert_eq!(err.code(), VarcErrorCode::E002SettingsInvalid);
        assert_eq!(err.code().as_str(), "E002_SETTINGS_INVALID");
        assert_eq!(err.to_string(), "invalid settings: bad");
    }
}
