//! Turns the loaded config into runtime settings for the engine and narrator

use anyhow::{anyhow, Result};
use audioshelf_config::{AppConfig, Config, NarratorConfig, PlayerConfig};
use audioshelf_core::Catalog;
use audioshelf_engine::{AudioOutputConfig, CoordinatorConfig, DecodeHints, PlaybackRate};
use audioshelf_narrator::{
    GeminiNarrator, NarratorConfig as ClientConfig, NarratorError, RetryPolicy,
};
use std::time::Duration;

pub fn coordinator_config(config: &Config) -> CoordinatorConfig {
    let player = &config.player;
    CoordinatorConfig {
        tick: Duration::from_millis(player.tick_ms),
        poll: Duration::from_millis(player.preview_poll_ms),
        skip_secs: f64::from(player.skip_secs),
        initial_volume: player.volume_gain(),
        initial_rate: PlaybackRate::nearest(player.default_rate),
        decode_hints: DecodeHints {
            sample_rate: config.narrator.sample_rate_hint,
            channels: config.narrator.channel_hint,
        },
    }
}

/// UI redraw period; a zero setting falls back to the default rate
pub fn ui_refresh(player: &PlayerConfig) -> Duration {
    match player.ui_refresh_ms {
        0 => Duration::from_millis(PlayerConfig::default().ui_refresh_ms),
        ms => Duration::from_millis(ms),
    }
}

pub fn output_config(player: &PlayerConfig) -> AudioOutputConfig {
    AudioOutputConfig {
        device: player.output_device.clone(),
        ..AudioOutputConfig::default()
    }
}

pub fn client_config(section: &NarratorConfig, api_key: impl Into<String>) -> ClientConfig {
    ClientConfig::new(api_key)
        .with_endpoint(section.endpoint.clone())
        .with_model(section.model.clone())
        .with_voice(section.voice.clone())
        .with_timeout(Duration::from_secs(section.timeout_secs))
        .with_retry_policy(RetryPolicy::new(section.max_attempts as usize))
}

/// Builds the narrator when its API key variable is set
pub fn build_narrator(section: &NarratorConfig) -> Result<GeminiNarrator, NarratorError> {
    let api_key = section
        .api_key()
        .ok_or_else(|| NarratorError::MissingApiKey(section.api_key_env.clone()))?;
    GeminiNarrator::new(client_config(section, api_key))
}

/// Seed catalog plus any books from `app.catalog_path`
///
/// Imported books whose id is already present are skipped with a warning.
pub fn load_catalog(app: &AppConfig) -> Result<Catalog> {
    let mut catalog = Catalog::with_seed_books();

    let Some(path) = &app.catalog_path else {
        return Ok(catalog);
    };

    let extra = Catalog::from_json_file(path).map_err(|e| {
        let level = if e.is_critical() {
            log::Level::Error
        } else {
            log::Level::Warn
        };
        log::log!(level, "Catalog {} not loaded: {}", path.display(), e);
        anyhow!("{} ({})", e.user_message(), path.display())
    })?;

    for book in extra.books() {
        if let Err(e) = catalog.import(book.clone()) {
            log::warn!("Skipping '{}': {}", book.title, e);
        }
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_coordinator_config_from_defaults() {
        let coordinator = coordinator_config(&Config::default());
        assert_eq!(coordinator.tick, Duration::from_secs(1));
        assert_eq!(coordinator.poll, Duration::from_millis(100));
        assert_eq!(coordinator.skip_secs, 15.0);
        assert!((coordinator.initial_volume - 0.7).abs() < 1e-6);
        assert!(coordinator.initial_rate.is_normal());
        assert_eq!(coordinator.decode_hints.sample_rate, 24_000);
        assert_eq!(coordinator.decode_hints.channels, 1);
    }

    #[test]
    fn test_zero_ui_refresh_falls_back() {
        let mut config = Config::default();
        assert_eq!(ui_refresh(&config.player), Duration::from_millis(100));

        config.player.ui_refresh_ms = 250;
        assert_eq!(ui_refresh(&config.player), Duration::from_millis(250));

        config.player.ui_refresh_ms = 0;
        assert_eq!(ui_refresh(&config.player), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_ui_refresh_builds_an_interval() {
        let player = PlayerConfig {
            ui_refresh_ms: 0,
            ..Default::default()
        };
        let mut refresh = tokio::time::interval(ui_refresh(&player));
        refresh.tick().await;
    }

    #[test]
    fn test_rate_and_device_carried_over() {
        let mut config = Config::default();
        config.player.default_rate = 1.5;
        config.player.output_device = Some("USB DAC".to_string());

        assert_eq!(coordinator_config(&config).initial_rate.value(), 1.5);
        assert_eq!(
            output_config(&config.player).device.as_deref(),
            Some("USB DAC")
        );
    }

    #[test]
    fn test_client_config_mapping() {
        let mut section = NarratorConfig::default();
        section.voice = "Kore".to_string();
        section.endpoint = "http://localhost:9000".to_string();
        section.max_attempts = 2;

        let client = client_config(&section, "key");
        assert_eq!(client.voice, "Kore");
        assert_eq!(client.api_key, "key");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.retry_policy.max_attempts(), 2);
        assert_eq!(
            client.url(),
            "http://localhost:9000/models/gemini-2.5-flash-preview-tts:generateContent"
        );
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        let section = NarratorConfig {
            api_key_env: "AUDIOSHELF_TEST_MISSING_KEY".to_string(),
            ..Default::default()
        };
        match build_narrator(&section) {
            Err(NarratorError::MissingApiKey(var)) => {
                assert_eq!(var, "AUDIOSHELF_TEST_MISSING_KEY")
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_seed_catalog_without_path() {
        let catalog = load_catalog(&AppConfig::default()).unwrap();
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_catalog_file_adds_books() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[
                {{"id": "1", "title": "Duplicate", "author": "Someone", "duration": 60000, "added_at": "2024-01-01"}},
                {{"id": "extra-1", "title": "Extra", "author": "Someone Else", "duration": 120000, "added_at": "2024-02-01"}}
            ]"#
        )
        .unwrap();

        let app = AppConfig {
            catalog_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let catalog = load_catalog(&app).unwrap();
        assert_eq!(catalog.len(), 7);
        assert!(catalog
            .get(&audioshelf_core::BookId::from_string("extra-1"))
            .is_some());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let app = AppConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/books.json")),
            ..Default::default()
        };
        let err = load_catalog(&app).unwrap_err();
        assert!(err.to_string().contains("was not found"));
        assert!(err.to_string().contains("/nonexistent/books.json"));
    }

    #[test]
    fn test_damaged_catalog_file_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not a list").unwrap();

        let app = AppConfig {
            catalog_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = load_catalog(&app).unwrap_err();
        assert!(err.to_string().contains("damaged"));
    }
}
