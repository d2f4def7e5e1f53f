//! Inference API key storage.
//!
//! The key is read from the `MAILSIFT_API_KEY` environment variable when set,
//! otherwise from the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailsift";

/// Keyring entry holding the inference API key.
const API_KEY_ENTRY: &str = "mailsift_inference_api_key";

/// Environment variable that overrides the keyring.
pub const API_KEY_ENV: &str = "MAILSIFT_API_KEY";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Refused to store an empty key.
    #[error("API key is empty")]
    EmptyKey,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Stores the inference API key in the system keyring.
///
/// # Errors
///
/// Returns an error if the key is empty or the keyring operation fails.
pub fn store_api_key(api_key: &str) -> CredentialResult<()> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(CredentialError::EmptyKey);
    }
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    entry.set_password(api_key)?;
    debug!("Stored inference API key");
    Ok(())
}

/// Retrieves the inference API key from the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn get_api_key() -> CredentialResult<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => {
            debug!("No inference API key in keyring");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the inference API key from the keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails (except for a missing entry).
pub fn delete_api_key() -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    match entry.delete_credential() {
        Ok(()) => {
            debug!("Deleted inference API key");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No inference API key to delete");
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete inference API key: {e}");
            Err(e.into())
        }
    }
}

/// Resolves the API key: environment first, then keyring.
///
/// A blank environment value is ignored.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn resolve_api_key() -> CredentialResult<Option<String>> {
    if let Some(key) = key_from_env(std::env::var(API_KEY_ENV).ok()) {
        debug!("Using inference API key from {API_KEY_ENV}");
        return Ok(Some(key));
    }
    get_api_key()
}

fn key_from_env(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
