use crate::engine::PreferenceStore;
use crate::settings::{CfgDefaultKeymaps, Preferences, PreferencesPatch, Settings};
use eyre::Result;
use serde::de::DeserializeOwned;
use std::{fs, path::Path, path::PathBuf};
use tracing::{debug, warn};

pub const APP_NAME: &str = "flashread";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub preferences: Preferences,
    pub keymap: CfgDefaultKeymaps,
    filepath: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::load_from(prefix.join("configuration.json"))
    }

    /// Load configuration from `filepath`, writing the defaults there when the
    /// file does not exist yet. A malformed file or section falls back to
    /// defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut config = Self {
            settings: Settings::default(),
            preferences: Preferences::default(),
            keymap: CfgDefaultKeymaps::default(),
            filepath,
        };

        if !config.filepath.exists() {
            config.save()?;
            return Ok(config);
        }

        let config_str = fs::read_to_string(&config.filepath)?;
        match serde_json::from_str::<serde_json::Value>(&config_str) {
            Ok(user_config) => {
                config.settings = section(&user_config, "Setting");
                config.preferences = section::<Preferences>(&user_config, "Preferences").normalized();
                config.keymap = section(&user_config, "Keymap");
                debug!(path = %config.filepath.display(), "configuration loaded");
            }
            Err(err) => {
                warn!(
                    path = %config.filepath.display(),
                    "configuration file is not valid JSON, using defaults: {err}"
                );
            }
        }
        Ok(config)
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({
            "Setting": self.settings,
            "Preferences": self.preferences,
            "Keymap": self.keymap,
        });

        let config_str = serde_json::to_string_pretty(&config_json)?;
        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.filepath, config_str)?;
        Ok(())
    }
}

fn section<T: DeserializeOwned + Default>(config: &serde_json::Value, name: &str) -> T {
    let Some(value) = config.get(name) else {
        return T::default();
    };
    serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        warn!("ignoring invalid \"{name}\" section: {err}");
        T::default()
    })
}

impl PreferenceStore for Config {
    fn read_preferences(&self) -> Result<Preferences> {
        Ok(self.preferences)
    }

    fn write_preferences(&mut self, patch: &PreferencesPatch) -> Result<()> {
        self.preferences.merge(patch);
        self.save()
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join(APP_NAME));
    }
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(&home).join(".config").join(APP_NAME);
        if path.exists() {
            return Ok(path);
        }
        return Ok(PathBuf::from(home).join(format!(".{APP_NAME}")));
    }
    if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(format!(".{APP_NAME}")));
    }

    Err(eyre::eyre!("Could not determine application data directory"))
}
