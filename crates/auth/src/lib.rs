use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Helper to construct the credentials-file key for a profile's token.
pub fn token_key(profile: &str) -> String {
    format!("{profile}:api_token")
}

/// API tokens kept in a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `~/.jira-ops/credentials`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(Self::at(home.join(".jira-ops").join("credentials")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a secret in the credentials file with 600 permissions.
    pub fn set_secret(&self, account: &str, secret: &str) -> Result<()> {
        let mut creds = self.read_all()?;
        creds.insert(account.to_string(), secret.to_string());
        self.persist(&creds)?;
        debug!(account, path = %self.path.display(), "Stored secret");
        Ok(())
    }

    pub fn get_secret(&self, account: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(account))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed credentials file {}", self.path.display()))
    }

    fn persist(&self, creds: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create {}", parent.display()))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options
            .open(&self.path)
            .with_context(|| format!("Unable to write {}", self.path.display()))?;
        // `mode` only applies on create; an older file may be wider.
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Unable to restrict {}", self.path.display()))?;
        serde_json::to_writer_pretty(file, creds)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("nested").join("credentials"));
        (dir, store)
    }

    #[test]
    fn test_token_key() {
        assert_eq!(token_key("work"), "work:api_token");
    }

    #[test]
    fn test_missing_file_has_no_secrets() {
        let (_dir, store) = store();
        assert_eq!(store.get_secret("work").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_per_account() {
        let (_dir, store) = store();
        store.set_secret("work", "t1").unwrap();
        store.set_secret("home", "t2").unwrap();
        store.set_secret("work", "t3").unwrap();

        assert_eq!(store.get_secret("work").unwrap().as_deref(), Some("t3"));
        assert_eq!(store.get_secret("home").unwrap().as_deref(), Some("t2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        store.set_secret("work", "secret").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_file_is_narrowed_to_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{}").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.set_secret("work", "secret").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get_secret("work").unwrap().as_deref(), Some("secret"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();
        let err = store.get_secret("work").unwrap_err();
        assert!(err.to_string().contains("Malformed credentials file"));
    }
}
