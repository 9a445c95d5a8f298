mod credentials;

pub use credentials::{read_env_file, Credentials};

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Represents the full configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    /// A missing file yields an empty configuration.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the configuration to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<PathBuf> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(path)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Inserts or replaces a profile; the first profile saved becomes the default.
    pub fn upsert_profile(&mut self, name: impl Into<String>, profile: Profile) {
        let name = name.into();
        if self.default_profile.is_none() {
            self.default_profile = Some(name.clone());
        }
        self.profiles.insert(name, profile);
    }

    /// Returns either the requested profile or falls back to the default one,
    /// then to the first profile by name.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        if let Some(name) = requested {
            self.profiles.get(name).map(|profile| (name, profile))
        } else if let Some(default_name) = self.default_profile.as_deref() {
            self.profiles
                .get(default_name)
                .map(|profile| (default_name, profile))
        } else if let Some((name, profile)) = self.profiles.iter().next() {
            Some((name.as_str(), profile))
        } else {
            None
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".jira-ops");
        path.push("config.yaml");
        path
    }
}

/// Connection settings for one Jira site. Values are optional so a profile
/// can keep its token in the credentials file instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, alias = "email", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn profile(base_url: &str) -> Profile {
        Profile {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load(Some("/nonexistent/config.yaml")).unwrap();
        assert!(config.profiles.is_empty());
        assert!(config.default_profile.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.upsert_profile(
            "work",
            Profile {
                base_url: Some("https://work.atlassian.net".to_string()),
                username: Some("dev@example.com".to_string()),
                api_token: None,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let saved = config.save(Some(&path)).unwrap();
        assert_eq!(saved, path);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("api_token"));

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.default_profile.as_deref(), Some("work"));
        let work = loaded.profile("work").unwrap();
        assert_eq!(work.username.as_deref(), Some("dev@example.com"));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "invalid: yaml: [unclosed").unwrap();

        let result = Config::load(Some(temp_file.path()));
        assert!(result.unwrap_err().to_string().contains("Malformed YAML"));
    }

    #[test]
    fn test_email_alias() {
        let config: Config = serde_yaml::from_str(
            "profiles:\n  old:\n    base_url: https://old.atlassian.net\n    email: me@example.com\n",
        )
        .unwrap();
        assert_eq!(
            config.profile("old").unwrap().username.as_deref(),
            Some("me@example.com")
        );
    }

    #[test]
    fn test_upsert_keeps_existing_default() {
        let mut config = Config::default();
        config.upsert_profile("first", profile("https://a.atlassian.net"));
        config.upsert_profile("second", profile("https://b.atlassian.net"));
        assert_eq!(config.default_profile.as_deref(), Some("first"));
        assert_eq!(config.profiles.len(), 2);
    }

    #[test]
    fn test_resolve_profile_order() {
        let mut config = Config::default();
        config.profiles.insert("beta".into(), profile("https://b.atlassian.net"));
        config.profiles.insert("alpha".into(), profile("https://a.atlassian.net"));

        let (name, _) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "alpha");

        config.default_profile = Some("beta".into());
        let (name, _) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "beta");

        let (name, found) = config.resolve_profile(Some("alpha")).unwrap();
        assert_eq!(name, "alpha");
        assert_eq!(found.base_url.as_deref(), Some("https://a.atlassian.net"));

        assert!(config.resolve_profile(Some("missing")).is_none());
        assert!(Config::default().resolve_profile(None).is_none());
    }
}
