//! Reading and writing `config.toml`
//!
//! Writes land in a sibling temp file that is renamed over the target, and
//! the file being replaced is copied to `config.toml.backup` first.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DEFAULT_HEADER: &str = "\
# Audioshelf configuration
#
# Every key is optional; missing keys take their default value.
# Environment variables named AUDIOSHELF_<SECTION>_<FIELD> override this file,
# e.g. AUDIOSHELF_PLAYER_DEFAULT_VOLUME=80.
#
# The narrator API key is read from the variable named by narrator.api_key_env.

";

pub struct ConfigPersistence {
    path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file into a [`Config`]
    ///
    /// A missing file yields defaults; a blank or malformed one is an error.
    /// Out-of-range values are kept and reported through the log.
    pub fn load(&self) -> ConfigResult<Config> {
        let Some(contents) = self.read_contents()? else {
            log::info!("No config at {}, using defaults", self.path.display());
            return Ok(Config::default());
        };

        let mut config: Config = toml::from_str(&contents).map_err(|source| {
            ConfigError::ParseError {
                path: self.path.clone(),
                source,
            }
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "{} declares version {}, reading it as version {}",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            );
            config.version = CONFIG_VERSION;
        }

        if let Err(errors) = config.validate() {
            log::warn!("{} has invalid values: {}", self.path.display(), joined(&errors));
        }

        Ok(config)
    }

    /// Validates `config` and replaces the file with it
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        let rendered = render(config)?;
        self.replace_file(&rendered)?;
        log::info!("Wrote config to {}", self.path.display());
        Ok(())
    }

    /// Writes the defaults under an explanatory comment header
    pub fn generate_default_with_comments(&self) -> ConfigResult<()> {
        let rendered = render(&Config::default())?;
        self.replace_file(&format!("{}{}", DEFAULT_HEADER, rendered))?;
        log::info!("Wrote default config to {}", self.path.display());
        Ok(())
    }

    fn read_contents(&self) -> ConfigResult<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "config file is blank"),
            });
        }

        Ok(Some(contents))
    }

    fn replace_file(&self, contents: &str) -> ConfigResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: format!("{} has no parent directory", self.path.display()),
            })?;

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::DirectoryCreationError {
                path: dir.to_path_buf(),
                source,
            })?;
            log::info!("Created {}", dir.display());
        }

        if self.path.exists() {
            let backup = self.path.with_extension("toml.backup");
            fs::copy(&self.path, &backup).map_err(|source| ConfigError::BackupError { source })?;
            log::debug!("Previous config kept at {}", backup.display());
        }

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.flush()?;
        staged
            .persist(&self.path)
            .map_err(|e| ConfigError::WriteError {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

fn render(config: &Config) -> ConfigResult<String> {
    config
        .validate()
        .map_err(|errors| ConfigError::ValidationError(joined(&errors)))?;
    Ok(toml::to_string_pretty(config)?)
}

fn joined(errors: &[crate::ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
