//! Runtime settings for the applier.
//!
//! Every section has defaults, so no settings file is needed. Values can be
//! overridden from the environment, e.g. `APPLIER__REMOTE__TIMEOUT_MS=5000`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplierSettings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

impl ApplierSettings {
    pub fn validate(&self) -> Result<(), String> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.remote.timeout_ms == 0 {
            return Err("remote.timeout_ms must be > 0".into());
        }
        if self.remote.api_username.trim().is_empty() {
            return Err("remote.api_username must not be empty".into());
        }
        let file_name = self.store.file_name.as_str();
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name == ".." {
            return Err("store.file_name must be a plain file name".into());
        }
        Ok(())
    }

    /// Timeout applied to every remote request.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// User the API key acts on behalf of.
    #[serde(default = "default_api_username")]
    pub api_username: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}
fn default_api_username() -> String {
    "system".into()
}
fn default_timeout_ms() -> u64 {
    30_000
}
impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_username: default_api_username(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Name of the store file inside the data directory.
    #[serde(default = "default_store_file_name")]
    pub file_name: String,
    /// Record the applied configuration inside the store file.
    #[serde(default = "default_snapshot_config")]
    pub snapshot_config: bool,
}
fn default_store_file_name() -> String {
    "nix_to_discourse_ids.json".into()
}
fn default_snapshot_config() -> bool {
    true
}
impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            file_name: default_store_file_name(),
            snapshot_config: default_snapshot_config(),
        }
    }
}

pub mod loader {
    use super::ApplierSettings;
    use crate::error::{ApplierError, Result};
    use config::{Config, Environment, File};
    use std::path::Path;

    /// Loads settings from an optional file, then applies `APPLIER__*`
    /// environment overrides and validates the result.
    pub fn load_settings(path: Option<&Path>) -> Result<ApplierSettings> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(File::from(p).required(true));
        }
        // Environment variable overrides, e.g., APPLIER__LOGGING__LEVEL=debug
        builder = builder.add_source(
            Environment::with_prefix("APPLIER")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ApplierError::configuration(format!("settings build error: {e}")))?;
        let merged: ApplierSettings = cfg
            .try_deserialize()
            .map_err(|e| ApplierError::configuration(format!("settings deserialize error: {e}")))?;
        merged.validate().map_err(ApplierError::configuration)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::loader::load_settings;
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let settings = ApplierSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.remote.api_username, "system");
        assert_eq!(settings.store.file_name, "nix_to_discourse_ids.json");
        assert!(settings.store.snapshot_config);
        assert_eq!(settings.remote_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("applier.toml");
        fs::write(
            &path,
            r#"
[logging]
level = "debug"

[store]
file_name = "ids.json"
snapshot_config = false
"#,
        )
        .expect("write toml");

        let settings = load_settings(Some(&path)).expect("should parse settings");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.store.file_name, "ids.json");
        assert!(!settings.store.snapshot_config);
        assert_eq!(settings.remote.api_username, "system");
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load_settings(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings build error"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = ApplierSettings::default();
        settings.logging.level = "loud".into();
        assert!(settings.validate().unwrap_err().contains("logging.level"));

        let mut settings = ApplierSettings::default();
        settings.remote.timeout_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = ApplierSettings::default();
        settings.store.file_name = "../escape.json".into();
        assert!(settings.validate().unwrap_err().contains("store.file_name"));
    }
}
