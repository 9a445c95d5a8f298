use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::Profile;

/// Reads a `KEY=VALUE` env file without touching the process environment.
/// Lines that do not parse are skipped with a warning.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("Env file not found: {}", path.display()))?;

    let mut env = HashMap::new();
    for entry in entries {
        match entry {
            Ok((key, value)) => {
                env.insert(key, value);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping env file line"),
        }
    }
    Ok(env)
}

/// The three settings a connection needs, each possibly still unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
}

impl Credentials {
    pub fn new(
        base_url: Option<String>,
        username: Option<String>,
        api_token: Option<String>,
    ) -> Self {
        Self {
            base_url: non_blank(base_url),
            username: non_blank(username),
            api_token: non_blank(api_token),
        }
    }

    /// `JIRA_BASE_URL` (or `JIRA_URL`), `JIRA_USERNAME`, `JIRA_API_TOKEN`.
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let get = |key: &str| env.get(key).cloned();
        Self::new(
            get("JIRA_BASE_URL").or_else(|| get("JIRA_URL")),
            get("JIRA_USERNAME"),
            get("JIRA_API_TOKEN"),
        )
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(
            profile.base_url.clone(),
            profile.username.clone(),
            profile.api_token.clone(),
        )
    }

    /// Fills the gaps in `self` from a lower-priority source.
    pub fn or(self, fallback: Credentials) -> Self {
        Self {
            base_url: self.base_url.or(fallback.base_url),
            username: self.username.or(fallback.username),
            api_token: self.api_token.or(fallback.api_token),
        }
    }

    pub fn with_token_fallback(mut self, token: Option<String>) -> Self {
        if self.api_token.is_none() {
            self.api_token = non_blank(token);
        }
        self
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push("JIRA_BASE_URL");
        }
        if self.username.is_none() {
            missing.push("JIRA_USERNAME");
        }
        if self.api_token.is_none() {
            missing.push("JIRA_API_TOKEN");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Token with all but the last four characters hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.api_token.as_deref().map(mask)
    }
}

pub(crate) fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_env_file_quotes_and_export() {
        let file = env_file(
            "# Jira\nJIRA_URL=https://acme.atlassian.net/\n\nexport JIRA_USERNAME=\"dev@acme.io\"\nJIRA_API_TOKEN='abc=123'\n",
        );
        let env = read_env_file(file.path()).unwrap();
        assert_eq!(env["JIRA_URL"], "https://acme.atlassian.net/");
        assert_eq!(env["JIRA_USERNAME"], "dev@acme.io");
        assert_eq!(env["JIRA_API_TOKEN"], "abc=123");
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_read_env_file_strips_inline_comments() {
        let file = env_file(
            "JIRA_API_TOKEN=abc123 # work token\nJIRA_URL=\"https://x.atlassian.net\" # site\n",
        );
        let env = read_env_file(file.path()).unwrap();
        assert_eq!(env["JIRA_API_TOKEN"], "abc123");
        assert_eq!(env["JIRA_URL"], "https://x.atlassian.net");

        let creds = Credentials::from_env_map(&env);
        assert_eq!(creds.api_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_read_env_file_missing() {
        let err = read_env_file(Path::new("/nonexistent/jira.env")).unwrap_err();
        assert!(err.to_string().contains("Env file not found"));
    }

    #[test]
    fn test_base_url_prefers_jira_base_url() {
        let env = HashMap::from([
            ("JIRA_URL".to_string(), "https://old.atlassian.net".to_string()),
            ("JIRA_BASE_URL".to_string(), "https://new.atlassian.net".to_string()),
        ]);
        let creds = Credentials::from_env_map(&env);
        assert_eq!(creds.base_url.as_deref(), Some("https://new.atlassian.net"));
        assert_eq!(creds.missing(), vec!["JIRA_USERNAME", "JIRA_API_TOKEN"]);
    }

    #[test]
    fn test_layering() {
        let flags = Credentials::new(None, Some("flag-user".into()), Some("  ".into()));
        let env_file = Credentials::new(
            Some("https://env.atlassian.net".into()),
            Some("env-user".into()),
            None,
        );
        let profile = Credentials::from_profile(&Profile {
            base_url: Some("https://profile.atlassian.net".into()),
            username: None,
            api_token: None,
        });

        let resolved = flags
            .or(env_file)
            .or(profile)
            .with_token_fallback(Some("stored-token".into()));

        assert_eq!(resolved.base_url.as_deref(), Some("https://env.atlassian.net"));
        assert_eq!(resolved.username.as_deref(), Some("flag-user"));
        assert_eq!(resolved.api_token.as_deref(), Some("stored-token"));
        assert!(resolved.is_complete());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("abcdefgh"), "****efgh");
        assert_eq!(mask("abc"), "***");
        let creds = Credentials::new(None, None, Some("secret-token".into()));
        assert_eq!(creds.masked_token().as_deref(), Some("********oken"));
    }
}
