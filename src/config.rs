use crate::filter::Scope;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config file '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub fields: FieldNames,
}

/// Journal field names used to build matches and to read entries.
///
/// Kept as data because the journal schema has changed over time (for
/// example the legacy `UNIT` field next to `_SYSTEMD_UNIT`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub message: String,
    pub priority: String,
    pub facility: String,
    /// Fields compared against `--unit` in system scope, ORed together
    pub system_unit: Vec<String>,
    /// Fields compared against `--unit` in user scope, ORed together
    pub user_unit: Vec<String>,
    /// Fields tried in order for the unit shown next to a match
    pub display_unit: Vec<String>,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            message: "MESSAGE".to_string(),
            priority: "PRIORITY".to_string(),
            facility: "SYSLOG_FACILITY".to_string(),
            system_unit: vec!["_SYSTEMD_UNIT".to_string(), "UNIT".to_string()],
            user_unit: vec!["_SYSTEMD_USER_UNIT".to_string()],
            display_unit: vec!["UNIT".to_string(), "_SYSTEMD_UNIT".to_string()],
        }
    }
}

impl FieldNames {
    pub fn unit_fields(&self, scope: Scope) -> &[String] {
        match scope {
            Scope::LocalSystem => &self.system_unit,
            Scope::LocalUser => &self.user_unit,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let singles = [
            ("message", &self.message),
            ("priority", &self.priority),
            ("facility", &self.facility),
        ];
        if let Some((key, _)) = singles.iter().find(|(_, name)| name.is_empty()) {
            return Err(format!("fields.{key} must not be empty"));
        }
        let lists = [
            ("system_unit", &self.system_unit),
            ("user_unit", &self.user_unit),
        ];
        for (key, names) in lists {
            if names.is_empty() || names.iter().any(String::is_empty) {
                return Err(format!("fields.{key} needs at least one non-empty field name"));
            }
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ProbeConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    let config = toml::from_str::<ProbeConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display.clone(),
        source,
    })?;
    config
        .fields
        .validate()
        .map_err(|reason| ConfigError::Invalid {
            path: path_display,
            reason,
        })?;
    Ok(config)
}

pub fn default_config() -> &'static ProbeConfig {
    static DEFAULT_CONFIG: LazyLock<ProbeConfig> = LazyLock::new(ProbeConfig::default);
    &DEFAULT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_fields() {
        let fields = &default_config().fields;
        assert_eq!(fields.message, "MESSAGE");
        assert_eq!(
            fields.unit_fields(Scope::LocalSystem),
            ["_SYSTEMD_UNIT", "UNIT"]
        );
        assert_eq!(fields.unit_fields(Scope::LocalUser), ["_SYSTEMD_USER_UNIT"]);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("probe.toml");
        fs::write(&path, "[fields]\nuser_unit = [\"_SYSTEMD_USER_UNIT\", \"USER_UNIT\"]\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.fields.user_unit, ["_SYSTEMD_USER_UNIT", "USER_UNIT"]);
        assert_eq!(config.fields.priority, "PRIORITY");
    }

    #[test]
    fn test_empty_unit_list_is_invalid() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("probe.toml");
        fs::write(&path, "[fields]\nsystem_unit = []\n").unwrap();

        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_and_malformed_config() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            load_config_from_path(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.toml");
        fs::write(&path, "[fields\n").unwrap();
        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
