// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use audioshelf_config::{Config, ConfigManager};
use clap::{Arg, ArgMatches, Command};
use commands::CatalogView;
use std::path::PathBuf;

mod commands;
mod player;
mod settings;

fn build_cli() -> Command {
    Command::new("audioshelf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audiobook library player with AI narrator previews")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config directory)")
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("List books in the catalog")
                .arg(
                    Arg::new("view")
                        .short('v')
                        .long("view")
                        .value_name("VIEW")
                        .help("Which books to show")
                        .value_parser(CatalogView::NAMES)
                        .default_value("all"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show detailed information about a book")
                .arg(Arg::new("id").required(true).value_name("BOOK_ID").help("Book ID")),
        )
        .subcommand(
            Command::new("play")
                .about("Open the interactive player for a book")
                .arg(Arg::new("id").required(true).value_name("BOOK_ID").help("Book ID to play")),
        )
        .subcommand(
            Command::new("preview")
                .about("Play the AI narrator preview of a book")
                .arg(Arg::new("id").required(true).value_name("BOOK_ID").help("Book ID to preview")),
        )
        .subcommand(Command::new("devices").about("List audio output devices"))
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand(Command::new("init").about("Write a default config file"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location")),
        )
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate config directory")
}

fn load_config(manager: &ConfigManager) -> Config {
    match manager.load_with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}, using default settings", e);
            Config::default()
        }
    }
}

/// Validation problems in the loaded config. They are found before the
/// logger exists, so main reports them once logging is up.
fn config_problems(config: &Config) -> Vec<String> {
    config
        .validate()
        .err()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn required_id(matches: &ArgMatches) -> Result<&str> {
    matches
        .get_one::<String>("id")
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Book ID is required"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;
    let config = load_config(&manager);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();
    log::debug!("Using config at {}", manager.config_path().display());
    for problem in config_problems(&config) {
        log::warn!("Config: {}", problem);
    }

    match matches.subcommand() {
        Some(("list", sub_matches)) => {
            let view = sub_matches
                .get_one::<String>("view")
                .and_then(|name| CatalogView::parse(name))
                .unwrap_or(CatalogView::All);
            let catalog = settings::load_catalog(&config.app)?;
            commands::list_books(&catalog, view)
        }
        Some(("info", sub_matches)) => {
            let catalog = settings::load_catalog(&config.app)?;
            commands::show_book_info(
                &catalog,
                required_id(sub_matches)?,
                config.narrator.preview_chars,
            )
        }
        Some(("play", sub_matches)) => {
            let catalog = settings::load_catalog(&config.app)?;
            player::start_playback(&config, catalog, required_id(sub_matches)?).await
        }
        Some(("preview", sub_matches)) => {
            let catalog = settings::load_catalog(&config.app)?;
            commands::preview_book(&config, &catalog, required_id(sub_matches)?).await
        }
        Some(("devices", _)) => commands::list_devices(),
        Some(("config", sub_matches)) => match sub_matches.subcommand() {
            Some(("init", _)) => commands::config_init(&manager),
            Some(("show", _)) => commands::config_show(&manager, &config),
            Some(("path", _)) => {
                println!("{}", manager.config_path().display());
                Ok(())
            }
            _ => {
                let mut cli = build_cli();
                if let Some(config_cmd) = cli.find_subcommand_mut("config") {
                    config_cmd.print_help()?;
                }
                Ok(())
            }
        },
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
