//! Encryption service and key lifecycle for Keyward.
//!
//! Two service objects, both constructed explicitly around an injected
//! [`keyward_keystore::KeyStore`]:
//!
//! - [`EncryptionService`]: key creation/listing/deletion plus keyed and
//!   password-based AES-256-GCM encryption.
//! - [`SecureKeyManager`]: rotation, password-wrapped backups, restore,
//!   and secure deletion.
//!
//! # Failure signalling
//!
//! | Condition | Result |
//! |---|---|
//! | unknown key id | `Ok(None)` |
//! | tag mismatch / wrong password | `Ok(None)` |
//! | payload without `keyId`, bad purpose | `Err(VaultError::Precondition)` |
//! | key store failure | `Err(VaultError::KeyStore)` |

mod backup;
mod config;
mod error;
mod key;
mod manager;
mod service;

pub use backup::{KeyBackup, KeyBackupSummary};
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use key::{KeyInfo, KeyOrigin};
pub use manager::SecureKeyManager;
pub use service::EncryptionService;

pub use keyward_crypto::{EncryptedPayload, PasswordEncryptedPayload};
