//! Application-level configuration section

use crate::validation::{ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Converts to the `log` crate filter used when initializing the logger
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: LogLevel,

    /// JSON file of books imported on top of the seed catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            catalog_path: None,
        }
    }
}

impl ConfigSection for AppConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(path) = &self.catalog_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "app.catalog_path",
                    "must not be empty when set",
                ));
            } else if path.extension().and_then(|e| e.to_str()) != Some("json") {
                errors.push(ValidationError::with_value(
                    "app.catalog_path",
                    "must point to a .json file",
                    path.display(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn merge(&mut self, other: Self) {
        self.log_level = other.log_level;
        if other.catalog_path.is_some() {
            self.catalog_path = other.catalog_path;
        }
    }

    fn section_name(&self) -> &'static str {
        "app"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_catalog_path_must_be_json() {
        let mut config = AppConfig::default();
        config.catalog_path = Some(PathBuf::from("books.csv"));
        assert!(config.validate().is_err());

        config.catalog_path = Some(PathBuf::from("books.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_catalog_path() {
        let mut config = AppConfig::default();
        config.catalog_path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_keeps_existing_catalog_path() {
        let mut base = AppConfig {
            catalog_path: Some(PathBuf::from("mine.json")),
            ..Default::default()
        };
        let other = AppConfig {
            log_level: LogLevel::Debug,
            catalog_path: None,
        };

        base.merge(other);
        assert_eq!(base.log_level, LogLevel::Debug);
        assert_eq!(base.catalog_path, Some(PathBuf::from("mine.json")));
    }

    #[test]
    fn test_log_level_parse_and_display() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" trace ".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Debug.as_filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::Error.as_filter(), log::LevelFilter::Error);
    }
}
