// src/config/settings.rs
//! Process settings: optional TOML file, then environment overrides.
//!
//! Resolution order:
//! 1) built-in defaults
//! 2) `$CATALOG_CONFIG_PATH` or `config/catalog.toml` (missing file is fine)
//! 3) env vars (`CATALOG_DB_PATH`, `ADMIN_*`, `OPENAI_MODEL`, `OPENAI_BASE_URL`,
//!    `AI_TIMEOUT_SECS`, `AI_TEST_MODE`)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/catalog.toml";
pub const ENV_CONFIG_PATH: &str = "CATALOG_CONFIG_PATH";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub admin: AdminSettings,
    pub ai: AiSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file; `:memory:` keeps everything in process.
    pub db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "data/catalog.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    pub password: String,
    pub token: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
            token: "admin-token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// "mock" | "error"; anything else means the real provider.
    pub test_mode: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            test_mode: None,
        }
    }
}

impl Settings {
    /// Defaults → file → process env.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut settings = Self::load_file(&path)?;
        settings.apply_overrides(|k| std::env::var(k).ok());
        Ok(settings)
    }

    /// Missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing settings at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(s)?;
        settings.ai.timeout_secs = clamp_timeout(settings.ai.timeout_secs);
        Ok(settings)
    }

    /// Apply overrides from `lookup` (the process env in production). Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CATALOG_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(v) = get("ADMIN_USERNAME") {
            self.admin.username = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.admin.password = v;
        }
        if let Some(v) = get("ADMIN_TOKEN") {
            self.admin.token = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.ai.model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.ai.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = v
                .parse::<u64>()
                .map(clamp_timeout)
                .unwrap_or(DEFAULT_TIMEOUT_SECS);
        }
        if let Some(v) = get("AI_TEST_MODE") {
            self.ai.test_mode = Some(v.to_ascii_lowercase());
        }
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    if secs == 0 {
        DEFAULT_TIMEOUT_SECS
    } else {
        secs.min(MAX_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
[admin]
token = "t0ken"

[ai]
timeout_secs = 9999
"#,
        )
        .unwrap();
        assert_eq!(s.admin.token, "t0ken");
        assert_eq!(s.admin.username, "admin");
        assert_eq!(s.ai.timeout_secs, MAX_TIMEOUT_SECS);
        assert_eq!(s.storage, StorageSettings::default());
    }

    #[test]
    fn env_overrides_win_and_blank_is_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CATALOG_DB_PATH", ":memory:"),
            ("ADMIN_PASSWORD", "   "),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
            ("AI_TIMEOUT_SECS", "abc"),
            ("AI_TEST_MODE", "MOCK"),
        ]);
        let mut s = Settings::default();
        s.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(s.storage.db_path, ":memory:");
        assert_eq!(s.admin.password, "password");
        assert_eq!(s.ai.base_url, "http://localhost:9999/v1");
        assert_eq!(s.ai.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(s.ai.test_mode.as_deref(), Some("mock"));
    }

    #[test]
    fn missing_file_is_default_and_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert_eq!(Settings::load_file(&missing).unwrap(), Settings::default());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[admin\nusername = ").unwrap();
        assert!(Settings::load_file(&bad).is_err());
    }

    #[test]
    fn bundled_settings_file_parses() {
        let s = Settings::from_toml_str(include_str!("../../config/catalog.toml")).unwrap();
        assert_eq!(s.ai.model, "gpt-4o-mini");
    }
}
