//! Durable storage for the session's token pair.
//!
//! The pair lives in a single slot keyed by [`AUTH_TOKENS_KEY`]. Only the
//! session manager writes it. [`FileTokenStore`] keeps it under the user's
//! config directory, optionally encrypted with a passphrase:
//!
//! ```ignore
//! use khabar_ox::storage::{FileTokenStore, TokenStore};
//!
//! let store = FileTokenStore::new("/my/custom/dir").with_passphrase("correct horse");
//! if let Some(tokens) = store.load()? {
//!     // hand to the session manager
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, AeadCore},
    Aes256Gcm, Key, KeyInit,
};
use argon2::Argon2;
use base64::{engine::general_purpose, Engine as _};
use parking_lot::Mutex;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::TokenPair;
use crate::paths::AUTH_TOKENS_KEY;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12; // AES-GCM nonce size

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to (de)serialize tokens: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Cannot determine storage location: {0}")]
    Location(String),
}

/// A single process-wide slot holding the serialized token pair.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenPair>, StorageError>;
    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        (**self).load()
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        (**self).save(tokens)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// In-process slot; contents do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw slot contents, as they would sit in durable storage.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    pub fn set_raw(&self, raw: impl Into<String>) {
        *self.slot.lock() = Some(raw.into());
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        self.slot
            .lock()
            .as_deref()
            .map(serde_json::from_str::<TokenPair>)
            .transpose()
            .map_err(StorageError::from)
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        *self.slot.lock() = Some(serde_json::to_string(tokens)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// File-backed slot. With a passphrase the file holds base64 of
/// `salt || nonce || AES-256-GCM ciphertext`; without one it holds plain JSON.
#[derive(Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
    passphrase: Option<String>,
}

impl std::fmt::Debug for FileTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTokenStore")
            .field("dir", &self.dir)
            .field("encrypted", &self.passphrase.is_some())
            .finish()
    }
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            passphrase: None,
        }
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// `KHABAR_STORAGE_DIR` (default `<config dir>/.khabar`) and optional `KHABAR_TOKEN_PASSPHRASE`.
    pub fn from_env() -> Result<Self, StorageError> {
        let dir = match std::env::var("KHABAR_STORAGE_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| StorageError::Location("no config directory".to_string()))?
                .join(".khabar"),
        };

        let store = Self::new(dir);
        Ok(match std::env::var("KHABAR_TOKEN_PASSPHRASE") {
            Ok(passphrase) if !passphrase.is_empty() => store.with_passphrase(passphrase),
            _ => store,
        })
    }

    pub fn path(&self) -> PathBuf {
        let extension = if self.passphrase.is_some() { "enc" } else { "json" };
        self.dir.join(format!("{AUTH_TOKENS_KEY}.{extension}"))
    }

    fn encode(&self, tokens: &TokenPair) -> Result<String, StorageError> {
        let json = serde_json::to_string(tokens)?;
        match &self.passphrase {
            Some(passphrase) => encrypt(json.as_bytes(), passphrase),
            None => Ok(json),
        }
    }

    fn decode(&self, contents: &str) -> Result<TokenPair, StorageError> {
        match &self.passphrase {
            Some(passphrase) => Ok(serde_json::from_slice(&decrypt(contents.trim(), passphrase)?)?),
            None => Ok(serde_json::from_str(contents)?),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        let path = self.path();
        if !path.exists() {
            debug!("No token file found at {:?}", path);
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        self.decode(&contents).map(Some)
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        create_private_dir(&self.dir)?;
        let path = self.path();
        fs::write(&path, self.encode(tokens)?)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Tokens saved to {:?}", path);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Token file removed");
        }
        Ok(())
    }
}

fn create_private_dir(dir: &Path) -> Result<(), StorageError> {
    if dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Derive an encryption key from the passphrase using Argon2.
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Key<Aes256Gcm>, StorageError> {
    let mut output_key_material = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut output_key_material)
        .map_err(|e| StorageError::Encryption(format!("key derivation failed: {e}")))?;
    Ok(*Key::<Aes256Gcm>::from_slice(&output_key_material))
}

fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String, StorageError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let cipher = Aes256Gcm::new(&derive_key(passphrase, &salt)?);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let encrypted = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| StorageError::Encryption(e.to_string()))?;

    let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + encrypted.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&encrypted);

    Ok(general_purpose::STANDARD.encode(combined))
}

fn decrypt(encoded: &str, passphrase: &str) -> Result<Vec<u8>, StorageError> {
    let data = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
    if data.len() < SALT_LEN + NONCE_LEN {
        return Err(StorageError::InvalidFormat(
            "Data too short to contain salt and nonce".to_string(),
        ));
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);

    Aes256Gcm::new(&derive_key(passphrase, salt)?)
        .decrypt(nonce, ciphertext)
        .map_err(|e| StorageError::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::token_pair;

    #[test]
    fn memory_store_round_trips_through_json() {
        let store = MemoryTokenStore::new();
        assert!(store.load().unwrap().is_none());

        let tokens = token_pair(3);
        store.save(&tokens).unwrap();
        assert!(store.raw().unwrap().contains(r#""refresh":"refresh.token.value""#));
        assert_eq!(store.load().unwrap(), Some(tokens));

        store.clear().unwrap();
        assert!(store.raw().is_none());
    }

    #[test]
    fn file_store_persists_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("khabar"));
        assert!(store.load().unwrap().is_none());

        let tokens = token_pair(5);
        store.save(&tokens).unwrap();
        assert!(store.path().ends_with("authTokens.json"));
        assert_eq!(FileTokenStore::new(dir.path().join("khabar")).load().unwrap(), Some(tokens));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn encrypted_file_store_needs_the_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path()).with_passphrase("sagarmatha");
        let tokens = token_pair(9);
        store.save(&tokens).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains(tokens.access()));
        assert_eq!(store.load().unwrap(), Some(tokens));

        let wrong = FileTokenStore::new(dir.path()).with_passphrase("kanchenjunga");
        assert!(matches!(wrong.load(), Err(StorageError::Decryption(_))));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StorageError::Serialize(_))));
    }
}
