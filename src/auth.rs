use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{Result, VaultError};
use crate::storage::AccountStorage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Source of the signed-in identity. Stores are built from whatever this
/// yields; nothing else reads it.
pub trait AuthGate {
    fn current_user(&self) -> Option<&Identity>;
    fn is_loading(&self) -> bool;
}

pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(VaultError::validation("email", "must look like name@domain")),
    }
}

/// Identity persisted in a JSON session file between runs.
pub struct SessionAuth {
    path: PathBuf,
    user: Option<Identity>,
    loading: bool,
}

impl SessionAuth {
    /// Unresolved until [`SessionAuth::resolve`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user: None,
            loading: true,
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut auth = Self::new(path);
        auth.resolve()?;
        Ok(auth)
    }

    /// Reads the session file. A corrupt file counts as signed out.
    pub fn resolve(&mut self) -> Result<Option<&Identity>> {
        self.user = match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(VaultError::Io(e)),
        };
        self.loading = false;
        Ok(self.user.as_ref())
    }

    /// Re-reads the account for the stored email so a recreated database
    /// does not leave the session pointing at a missing owner.
    pub fn refresh<A: AccountStorage>(&mut self, accounts: &A) -> Result<Option<&Identity>> {
        let Some(email) = self.user.as_ref().map(|u| u.email.clone()) else {
            return Ok(None);
        };
        let identity = accounts.find_or_create_user(&email)?;
        if self.user.as_ref() != Some(&identity) {
            write_session(&self.path, &identity)?;
            self.user = Some(identity);
        }
        Ok(self.user.as_ref())
    }

    pub fn sign_in<A: AccountStorage>(&mut self, accounts: &A, email: &str) -> Result<Identity> {
        let identity = accounts.find_or_create_user(email)?;
        write_session(&self.path, &identity)?;
        info!(user = %identity.id, "signed in");
        self.user = Some(identity.clone());
        self.loading = false;
        Ok(identity)
    }

    /// Returns whether a session existed.
    pub fn sign_out(&mut self) -> Result<bool> {
        let had_user = self.user.take().is_some();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(had_user),
            Err(e) => Err(VaultError::Io(e)),
        }
    }
}

impl AuthGate for SessionAuth {
    fn current_user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    fn is_loading(&self) -> bool {
        self.loading
    }
}

fn write_session(path: &Path, identity: &Identity) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(identity)?)?;
    Ok(())
}

/// A fixed identity, for embedding and tests.
pub struct StaticAuth(pub Option<Identity>);

impl AuthGate for StaticAuth {
    fn current_user(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    fn is_loading(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SqliteBackend;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Me@Example.COM ").unwrap(), "me@example.com");
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("me@").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn test_new_session_is_loading() {
        let dir = TempDir::new().unwrap();
        let auth = SessionAuth::new(dir.path().join("session.json"));
        assert!(auth.is_loading());
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn test_open_without_session_file() {
        let dir = TempDir::new().unwrap();
        let auth = SessionAuth::open(dir.path().join("session.json")).unwrap();
        assert!(!auth.is_loading());
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn test_sign_in_persists_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let backend = SqliteBackend::in_memory().unwrap();

        let mut auth = SessionAuth::open(&path).unwrap();
        let identity = auth.sign_in(&backend, "dev@example.com").unwrap();
        assert_eq!(auth.current_user(), Some(&identity));

        let reopened = SessionAuth::open(&path).unwrap();
        assert_eq!(reopened.current_user(), Some(&identity));
    }

    #[test]
    fn test_sign_out_removes_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let backend = SqliteBackend::in_memory().unwrap();

        let mut auth = SessionAuth::open(&path).unwrap();
        auth.sign_in(&backend, "dev@example.com").unwrap();
        assert!(auth.sign_out().unwrap());
        assert!(auth.current_user().is_none());
        assert!(!path.exists());
        assert!(!auth.sign_out().unwrap());
    }

    #[test]
    fn test_corrupt_session_is_signed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let auth = SessionAuth::open(&path).unwrap();
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn test_refresh_rebinds_to_new_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let old = SqliteBackend::in_memory().unwrap();
        let mut auth = SessionAuth::open(&path).unwrap();
        let stale = auth.sign_in(&old, "dev@example.com").unwrap();

        let fresh = SqliteBackend::in_memory().unwrap();
        let current = auth.refresh(&fresh).unwrap().cloned().unwrap();
        assert_ne!(current.id, stale.id);
        assert_eq!(current.email, stale.email);
        assert_eq!(SessionAuth::open(&path).unwrap().current_user(), Some(&current));
    }

    #[test]
    fn test_static_auth() {
        let auth = StaticAuth(None);
        assert!(auth.current_user().is_none());
        assert!(!auth.is_loading());
    }
}
