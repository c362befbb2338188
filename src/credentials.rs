//! Credential store - keeps the single API key used for completions
//!
//! This module provides:
//! - The `CredentialProvider` seam the orchestrator reads from
//! - A file-backed store under the platform data directory
//! - An in-memory store for tests and throwaway sessions

use crate::config::Settings;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Fixed logical key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("API key must not be empty")]
    Empty,

    #[error("failed to access credential store: {0}")]
    Io(#[from] io::Error),
}

/// Get/set/clear of one credential string.
pub trait CredentialProvider: Send + Sync {
    /// The stored credential, or `None` when nothing usable is stored.
    fn get(&self) -> Option<String>;

    /// Store a credential, replacing any previous one. Blank values are rejected.
    fn set(&self, value: &str) -> Result<(), CredentialError>;

    fn clear(&self) -> Result<(), CredentialError>;
}

fn validate(value: &str) -> Result<&str, CredentialError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::Empty);
    }
    Ok(trimmed)
}

// ============================================
// File-backed store
// ============================================

/// Plain-text credential file in the app data directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIAL_KEY),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.data_dir {
            Some(dir) => Self::new(dir),
            None => Self::new(default_data_dir()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("chatline");
    }

    PathBuf::from("cache").join("chatline")
}

impl CredentialProvider for FileCredentialStore {
    fn get(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let value = raw.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn set(&self, value: &str) -> Result<(), CredentialError> {
        let value = validate(value)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, value)?;
        restrict_permissions(&self.path)?;
        tracing::info!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "credential cleared");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

// ============================================
// In-memory store
// ============================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    value: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(value: &str) -> Result<Self, CredentialError> {
        let store = Self::new();
        store.set(value)?;
        Ok(store)
    }
}

impl CredentialProvider for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: &str) -> Result<(), CredentialError> {
        let value = validate(value)?;
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
