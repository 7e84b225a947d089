//! Crate configuration
//!
//! Settings are loaded from `Settings.toml` with environment variable
//! overrides, mirroring how the rest of the configuration surface works:
//! direct values in the file, or `*_env` indirections naming the variable
//! that holds the secret.

use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthlinkSettings {
    pub logging: LoggingSettings,
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub display_name: Option<String>,

    // Direct value (can be overridden by an environment variable)
    pub client_id: Option<String>,

    // Environment variable name for the override
    pub client_id_env: Option<String>,

    pub enabled: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: None,
            client_id: None,
            client_id_env: None,
            enabled: true,
        }
    }
}

impl ProviderSettings {
    /// Resolve the client id, preferring the environment indirection.
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        if let Some(env_var) = &self.client_id_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.client_id.clone()
    }
}

impl AuthlinkSettings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Priority, highest to lowest: environment variables, `Settings.toml`
    /// in `AUTHLINK_SECRETS_DIR` (if set), `Settings.toml` in the current
    /// directory, built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        Ok(settings)
    }

    /// Initialize the `log` facade from the configured level.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn init_logging(&self) {
        let _ = env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init();
    }

    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
        }

        if let Ok(secrets_dir) = std::env::var("AUTHLINK_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)?;
                settings = basic_toml::from_str(&secrets_toml_content)?;
            }
        }

        Ok(settings)
    }

    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(level) = std::env::var("AUTHLINK_LOG_LEVEL") {
            settings.logging.level = level;
        }
    }

    /// The settings for a named provider, when present and enabled.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers
            .iter()
            .find(|provider| provider.enabled && provider.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = AuthlinkSettings::default();
        assert_eq!(settings.logging.level, "info");
        assert!(settings.providers.is_empty());
    }

    #[test]
    #[serial]
    fn test_client_id_env_indirection() {
        let provider = ProviderSettings {
            name: "google".to_string(),
            client_id: Some("from_file".to_string()),
            client_id_env: Some("AUTHLINK_TEST_GOOGLE_CLIENT_ID".to_string()),
            ..Default::default()
        };

        std::env::remove_var("AUTHLINK_TEST_GOOGLE_CLIENT_ID");
        assert_eq!(provider.get_client_id(), Some("from_file".to_string()));

        std::env::set_var("AUTHLINK_TEST_GOOGLE_CLIENT_ID", "from_env");
        assert_eq!(provider.get_client_id(), Some("from_env".to_string()));
        std::env::remove_var("AUTHLINK_TEST_GOOGLE_CLIENT_ID");
    }

    #[test]
    #[serial]
    fn test_secrets_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let toml = r#"
[logging]
level = "debug"

[[providers]]
name = "apple"
enabled = true
"#;
        std::fs::write(dir.path().join("Settings.toml"), toml).unwrap();
        std::env::set_var("AUTHLINK_SECRETS_DIR", dir.path());

        let settings = AuthlinkSettings::load().unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.provider("apple").is_some());
        assert!(settings.provider("google").is_none());

        std::env::remove_var("AUTHLINK_SECRETS_DIR");
    }

    #[test]
    #[serial]
    fn test_log_level_env_override() {
        std::env::set_var("AUTHLINK_LOG_LEVEL", "trace");
        let settings = AuthlinkSettings::load().unwrap();
        assert_eq!(settings.logging.level, "trace");
        std::env::remove_var("AUTHLINK_LOG_LEVEL");
    }
}
