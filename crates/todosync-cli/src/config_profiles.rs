//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use todosync_core::config::ClientConfig;

const CONFIG_FILE_NAME: &str = "profiles.json";
const PROFILE_ENV_VAR: &str = "TODOSYNC_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ClientConfig>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todosync")
        .join(CONFIG_FILE_NAME)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalized()
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let serialized = serde_json::to_string_pretty(&self.clone().normalized()?)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// `--profile`, then `TODOSYNC_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with(explicit, std::env::var(PROFILE_ENV_VAR).ok().as_deref())
    }

    fn resolve_profile_name_with(&self, explicit: Option<&str>, from_env: Option<&str>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(from_env))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| "default".to_string())
    }

    /// Profile values with the environment laid over them.
    pub fn client_config(&self, profile_name: &str) -> Result<ClientConfig, String> {
        let env = ClientConfig::from_env().map_err(|error| error.to_string())?;
        self.client_config_with(profile_name, env)
    }

    fn client_config_with(&self, profile_name: &str, env: ClientConfig) -> Result<ClientConfig, String> {
        self.profiles
            .get(profile_name)
            .cloned()
            .unwrap_or_default()
            .overlay(env)
            .normalized()
            .map_err(|error| format!("Profile '{profile_name}': {error}"))
    }

    fn normalized(mut self) -> Result<Self, String> {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        let mut profiles = BTreeMap::new();
        for (name, profile) in self.profiles {
            let profile = profile
                .normalized()
                .map_err(|error| format!("Profile '{name}': {error}"))?;
            profiles.insert(name, profile);
        }
        self.profiles = profiles;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")).as_deref(), Some("work"));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            ClientConfig {
                firebase_project_id: Some(" demo-project ".to_string()),
                firestore_url: Some("http://localhost:8080/v1/".to_string()),
                ..ClientConfig::default()
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        let profile = loaded.profiles.get("default").unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(profile.firebase_project_id.as_deref(), Some("demo-project"));
        assert_eq!(
            profile.firestore_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn malformed_profile_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{"profiles": {"default": {"firestore_url": "ftp://example.com"}}}"#,
        )
        .unwrap();
        let error = CliProfilesConfig::load_from_path(&path).unwrap_err();
        assert!(error.contains("firestore_url"));
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_env_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(
            config.resolve_profile_name_with(Some("mobile"), Some("env")),
            "mobile"
        );
        assert_eq!(config.resolve_profile_name_with(None, Some("env")), "env");
        assert_eq!(config.resolve_profile_name_with(None, None), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with(None, Some("  ")),
            "default"
        );
    }

    #[test]
    fn client_config_overlays_environment() {
        let mut config = CliProfilesConfig::default();
        config.profiles.insert(
            "default".to_string(),
            ClientConfig {
                firebase_project_id: Some("from-file".to_string()),
                firebase_api_key: Some("file-key".to_string()),
                ..ClientConfig::default()
            },
        );
        let env = ClientConfig {
            firebase_project_id: Some("from-env".to_string()),
            ..ClientConfig::default()
        };

        let merged = config.client_config_with("default", env).unwrap();
        assert_eq!(merged.firebase_project_id.as_deref(), Some("from-env"));
        assert_eq!(merged.firebase_api_key.as_deref(), Some("file-key"));

        let unknown = config
            .client_config_with("other", ClientConfig::default())
            .unwrap();
        assert_eq!(unknown, ClientConfig::default());
    }
}
