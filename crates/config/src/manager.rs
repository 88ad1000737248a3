//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "AUDIOSHELF";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration manager
///
/// Owns the config directory and routes loads and saves through
/// [`ConfigPersistence`].
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the platform config directory
    ///
    /// - Linux: `~/.config/audioshelf/`
    /// - macOS: `~/Library/Application Support/audioshelf/`
    /// - Windows: `%APPDATA%\audioshelf\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE_NAME));

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "audioshelf")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.persistence.path().to_path_buf()
    }

    /// Loads the configuration file, or defaults when it does not exist
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads, applies `update_fn` and saves atomically
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use audioshelf_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.default_volume = 80;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a commented default file unless one exists
    ///
    /// Returns `Ok(true)` when a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default_with_comments()?;
        Ok(true)
    }

    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Returns every validation problem in the stored file
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the file and applies `AUDIOSHELF_<SECTION>_<FIELD>` overrides
    ///
    /// Example: `AUDIOSHELF_PLAYER_DEFAULT_VOLUME=80`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_overrides(&mut config, |name| std::env::var(name).ok())?;

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies overrides fetched through `lookup` to `config`
///
/// `lookup` receives the full variable name, e.g.
/// `AUDIOSHELF_NARRATOR_VOICE`. Values that fail to parse are rejected
/// with [`ConfigError::InvalidOverride`].
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let overrides = Overrides { lookup: &lookup };

    overrides.parsed("APP_LOG_LEVEL", &mut config.app.log_level)?;
    if let Some(path) = overrides.raw("APP_CATALOG_PATH") {
        config.app.catalog_path = Some(PathBuf::from(path));
    }

    let player = &mut config.player;
    overrides.parsed("PLAYER_DEFAULT_VOLUME", &mut player.default_volume)?;
    overrides.parsed("PLAYER_DEFAULT_RATE", &mut player.default_rate)?;
    overrides.parsed("PLAYER_TICK_MS", &mut player.tick_ms)?;
    overrides.parsed("PLAYER_PREVIEW_POLL_MS", &mut player.preview_poll_ms)?;
    overrides.parsed("PLAYER_UI_REFRESH_MS", &mut player.ui_refresh_ms)?;
    overrides.parsed("PLAYER_SKIP_SECS", &mut player.skip_secs)?;
    if let Some(device) = overrides.raw("PLAYER_OUTPUT_DEVICE") {
        player.output_device = Some(device);
    }

    let narrator = &mut config.narrator;
    overrides.parsed("NARRATOR_API_KEY_ENV", &mut narrator.api_key_env)?;
    overrides.parsed("NARRATOR_MODEL", &mut narrator.model)?;
    overrides.parsed("NARRATOR_VOICE", &mut narrator.voice)?;
    overrides.parsed("NARRATOR_ENDPOINT", &mut narrator.endpoint)?;
    overrides.parsed("NARRATOR_SAMPLE_RATE_HINT", &mut narrator.sample_rate_hint)?;
    overrides.parsed("NARRATOR_CHANNEL_HINT", &mut narrator.channel_hint)?;
    overrides.parsed("NARRATOR_TIMEOUT_SECS", &mut narrator.timeout_secs)?;
    overrides.parsed("NARRATOR_PREVIEW_CHARS", &mut narrator.preview_chars)?;
    overrides.parsed("NARRATOR_MAX_ATTEMPTS", &mut narrator.max_attempts)?;

    Ok(())
}

struct Overrides<'a, F> {
    lookup: &'a F,
}

impl<F> Overrides<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn var_name(key: &str) -> String {
        format!("{}_{}", ENV_PREFIX, key)
    }

    fn raw(&self, key: &str) -> Option<String> {
        let name = Self::var_name(key);
        let value = (self.lookup)(&name)?;
        log::debug!("Config override from {}", name);
        Some(value)
    }

    fn parsed<T: FromStr>(&self, key: &str, target: &mut T) -> ConfigResult<()> {
        let Some(value) = self.raw(key) else {
            return Ok(());
        };

        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidOverride {
                var: Self::var_name(key),
                value,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup_test_manager() -> (TempDir, ConfigManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())
            .expect("Failed to create manager");
        (temp_dir, manager)
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let (_temp_dir, manager) = setup_test_manager();
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_load_or_default_with_corrupt_file() {
        let (_temp_dir, manager) = setup_test_manager();
        std::fs::write(manager.config_path(), "[player\n").unwrap();
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_update() {
        let (_temp_dir, manager) = setup_test_manager();

        manager
            .update(|config| {
                config.player.skip_secs = 30;
            })
            .expect("Should update");

        let loaded = manager.load().expect("Should load");
        assert_eq!(loaded.player.skip_secs, 30);
    }

    #[test]
    fn test_initialize_only_once() {
        let (_temp_dir, manager) = setup_test_manager();

        assert!(manager.initialize().expect("Should initialize"));
        assert!(manager.config_path().exists());
        assert!(!manager.initialize().expect("Should initialize"));
    }

    #[test]
    fn test_reset() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.narrator.voice = "Kore".to_string();
        manager.save(&config).expect("Should save");

        manager.reset().expect("Should reset");
        assert_eq!(manager.load().expect("Should load"), Config::default());
    }

    #[test]
    fn test_validate_reports_file_problems() {
        let (_temp_dir, manager) = setup_test_manager();
        std::fs::write(
            manager.config_path(),
            "[player]\ndefault_rate = 1.1\n[narrator]\nvoice = \"\"\n",
        )
        .unwrap();

        let errors = manager.validate().expect("Should validate");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_config_file_path() {
        let (_temp_dir, manager) = setup_test_manager();
        assert!(manager.config_path().ends_with("config.toml"));
        assert!(manager.config_path().starts_with(manager.config_dir()));
    }

    #[test]
    fn test_apply_overrides() {
        let env = vars(&[
            ("AUDIOSHELF_APP_LOG_LEVEL", "debug"),
            ("AUDIOSHELF_APP_CATALOG_PATH", "/tmp/books.json"),
            ("AUDIOSHELF_PLAYER_DEFAULT_VOLUME", "85"),
            ("AUDIOSHELF_PLAYER_DEFAULT_RATE", "1.5"),
            ("AUDIOSHELF_PLAYER_OUTPUT_DEVICE", "USB DAC"),
            ("AUDIOSHELF_NARRATOR_VOICE", "Kore"),
            ("AUDIOSHELF_NARRATOR_MAX_ATTEMPTS", " 1 "),
        ]);

        let mut config = Config::default();
        apply_overrides(&mut config, |name| env.get(name).cloned()).unwrap();

        assert_eq!(config.app.log_level, LogLevel::Debug);
        assert_eq!(
            config.app.catalog_path,
            Some(PathBuf::from("/tmp/books.json"))
        );
        assert_eq!(config.player.default_volume, 85);
        assert_eq!(config.player.default_rate, 1.5);
        assert_eq!(config.player.output_device.as_deref(), Some("USB DAC"));
        assert_eq!(config.narrator.voice, "Kore");
        assert_eq!(config.narrator.max_attempts, 1);
        assert_eq!(config.player.skip_secs, 15);
    }

    #[test]
    fn test_unparsable_override_is_rejected() {
        let env = vars(&[("AUDIOSHELF_PLAYER_DEFAULT_VOLUME", "loud")]);

        let mut config = Config::default();
        let err = apply_overrides(&mut config, |name| env.get(name).cloned()).unwrap_err();

        match err {
            ConfigError::InvalidOverride { var, value } => {
                assert_eq!(var, "AUDIOSHELF_PLAYER_DEFAULT_VOLUME");
                assert_eq!(value, "loud");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(config.player.default_volume, 70);
    }

    #[test]
    fn test_no_overrides_leaves_config_untouched() {
        let mut config = Config::default();
        apply_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_env_overrides() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");

        std::env::set_var("AUDIOSHELF_PLAYER_UI_REFRESH_MS", "250");
        let config = manager
            .load_with_env_overrides()
            .expect("Should load with overrides");
        std::env::remove_var("AUDIOSHELF_PLAYER_UI_REFRESH_MS");

        assert_eq!(config.player.ui_refresh_ms, 250);
    }
}
