//! Vault configuration.

use crate::error::{VaultError, VaultResult};
use keyward_crypto::{DEFAULT_KDF_ITERATIONS, KdfParams};
use serde::{Deserialize, Serialize};

/// Configuration for the encryption service and key manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Argon2id time cost used for new password-encrypted payloads.
    /// Existing payloads carry their own count.
    pub kdf_iterations: u32,

    /// Minimum length of a key-backup master password.
    pub min_master_password_len: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            min_master_password_len: 8,
        }
    }
}

impl VaultConfig {
    /// Parses a JSON config; missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> VaultResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VaultResult<()> {
        KdfParams::with_iterations(self.kdf_iterations)
            .map_err(|e| VaultError::Config(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn kdf_params(&self) -> VaultResult<KdfParams> {
        Ok(KdfParams::with_iterations(self.kdf_iterations)?)
    }

    /// Config with a single KDF iteration, for tests.
    pub fn fast_kdf() -> Self {
        Self {
            kdf_iterations: 1,
            ..Self::default()
        }
    }
}
