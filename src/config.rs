//! TOML configuration for the reader
//!
//! Every key is optional; a missing file at the default location falls back
//! to built-in defaults so the reader still starts on a fresh machine.
//!
//! ```toml
//! device_index = 0
//! precision = 4
//! poll_interval_ms = 50
//!
//! [tolerance]
//! left_joystick = 0.2
//! right_joystick = 0.2
//! left_trigger = 0.05
//! right_trigger = 0.05
//!
//! [scale]
//! joystick_max = 32768
//! trigger_max = 256
//!
//! [layout]
//! A = "BTN_A"
//! ```

use crate::controller::key_map::LayoutOverride;
use crate::controller::normalize::{Scale, Tolerances};
use crate::controller::ReaderSettings;
use crate::error::ReaderError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_DIR: &str = "padreader";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    pub device_index: usize,
    pub precision: u32,
    pub poll_interval_ms: u64,
    pub tolerance: Tolerances,
    pub scale: Scale,
    pub layout: LayoutOverride,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let settings = ReaderSettings::default();
        Self {
            device_index: settings.device_index,
            precision: settings.precision,
            poll_interval_ms: settings.poll_interval_ms,
            tolerance: settings.tolerances,
            scale: settings.scale,
            layout: settings.layout,
        }
    }
}

impl ReaderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ReaderError> {
        toml::from_str(content).map_err(|e| ReaderError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ReaderError> {
        info!("Loading reader config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// `<config dir>/padreader/config.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads `path` if given, otherwise the default location
    ///
    /// An explicit path must exist. A missing file at the default location
    /// yields the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ReaderError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            warn!(
                "No config file at {}, using default settings",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ReaderError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ReaderError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        info!("Saved reader config to {}", path.display());
        Ok(())
    }

    /// Validated reader settings
    pub fn into_settings(self) -> Result<ReaderSettings, ReaderError> {
        let settings = ReaderSettings {
            tolerances: self.tolerance,
            precision: self.precision,
            scale: self.scale,
            layout: self.layout,
            device_index: self.device_index,
            poll_interval_ms: self.poll_interval_ms,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::control::ControlId;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ReaderConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.into_settings().unwrap(), ReaderSettings::default());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config = ReaderConfig::from_toml_str(
            r#"
            precision = 2

            [tolerance]
            right_trigger = 0.1

            [layout]
            XBOX = "BTN_GUIDE"
            L_TRIGGER = "ABS_BRAKE"
            "#,
        )
        .unwrap();

        assert_eq!(config.precision, 2);
        assert_eq!(config.tolerance.right_trigger, 0.1);
        assert_eq!(config.tolerance.left_joystick, 0.2);
        assert_eq!(config.scale, Scale::default());
        assert_eq!(config.layout[&ControlId::Mode], "BTN_GUIDE");
        assert_eq!(config.layout[&ControlId::LeftTrigger], "ABS_BRAKE");
        assert!(config.into_settings().is_ok());
    }

    #[test]
    fn test_unknown_control_is_a_config_error() {
        let err = ReaderConfig::from_toml_str("[layout]\nTURBO = \"BTN_C\"\n").unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));
    }

    #[test]
    fn test_misspelled_section_keys_are_config_errors() {
        let err = ReaderConfig::from_toml_str("[tolerance]\nleft_joystik = 0.3\n").unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));

        let err = ReaderConfig::from_toml_str("[scale]\ntrigger_maximum = 1024\n").unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));

        let err = ReaderConfig::from_toml_str("precission = 2\n").unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected_on_conversion() {
        let config = ReaderConfig::from_toml_str("[tolerance]\nleft_joystick = 2.0\n").unwrap();
        assert!(matches!(
            config.into_settings(),
            Err(ReaderError::InvalidSettings(_))
        ));

        let config = ReaderConfig::from_toml_str("[layout]\nA = \"BTN_EAST\"\n").unwrap();
        assert!(matches!(
            config.into_settings(),
            Err(ReaderError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let mut config = ReaderConfig::default();
        config.precision = 3;
        config.layout.insert(ControlId::Start, "BTN_MENU".to_string());

        let path = std::env::temp_dir()
            .join(format!("padreader-test-{}", std::process::id()))
            .join(CONFIG_FILE);
        config.save(&path).unwrap();
        let loaded = ReaderConfig::load_or_default(Some(&path)).unwrap();
        let _ = std::fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let path = std::env::temp_dir().join("padreader-does-not-exist.toml");
        assert!(matches!(
            ReaderConfig::load_or_default(Some(&path)),
            Err(ReaderError::Io(_))
        ));
    }
}
