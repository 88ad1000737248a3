// FILE: crates/cli/src/commands.rs

use crate::settings;
use anyhow::{anyhow, bail, Context, Result};
use audioshelf_config::{Config, ConfigManager};
use audioshelf_core::{format_clock, BookId, Catalog, CatalogBook};
use audioshelf_engine::{list_output_devices, PlaybackCoordinator, PreviewDecoder, PreviewOutcome};
use console::{style, Term};


/// Which slice of the catalog `list` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogView {
    All,
    Newest,
    InProgress,
    Series,
}

impl CatalogView {
    pub const NAMES: [&'static str; 4] = ["all", "newest", "in-progress", "series"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "all" => Some(CatalogView::All),
            "newest" => Some(CatalogView::Newest),
            "in-progress" => Some(CatalogView::InProgress),
            "series" => Some(CatalogView::Series),
            _ => None,
        }
    }
}

/// Books shown by a flat view, in display order
pub fn select_books(catalog: &Catalog, view: CatalogView) -> Vec<&CatalogBook> {
    match view {
        CatalogView::All => catalog.books().iter().collect(),
        CatalogView::Newest => catalog.newest_first(),
        CatalogView::InProgress => catalog.in_progress(),
        CatalogView::Series => catalog.series_groups().into_values().flatten().collect(),
    }
}

/// List the catalog
pub fn list_books(catalog: &Catalog, view: CatalogView) -> Result<()> {
    if view == CatalogView::Series {
        let groups = catalog.series_groups();
        if groups.is_empty() {
            println!("No series in the catalog.");
            return Ok(());
        }
        for (series, books) in groups {
            println!("\n{}", style(series).bold().magenta());
            println!("{}", "-".repeat(80));
            for book in books {
                print_book_summary(book);
            }
        }
        return Ok(());
    }

    let books = select_books(catalog, view);
    if books.is_empty() {
        println!("Nothing to show.");
        return Ok(());
    }

    println!("\n{} Books", style(books.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for book in books {
        print_book_summary(book);
    }
    Ok(())
}

/// Show detailed information about a book
pub fn show_book_info(catalog: &Catalog, id: &str, preview_chars: usize) -> Result<()> {
    let book = find_book(catalog, id)?;

    println!("\n{}", style("Book Information").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("ID: {}", book.id);
    println!("Title: {}", style(&book.title).bold());
    println!("Author: {}", book.author);
    if let Some(series) = &book.series {
        println!("Series: {}", series);
    }
    if !book.genres.is_empty() {
        println!("Genres: {}", book.genres.join(", "));
    }
    println!("Added: {}", book.added_at);
    println!(
        "Progress: {} / {}",
        format_clock(book.progress.as_secs_f64()),
        format_clock(book.duration.as_secs_f64())
    );
    println!("{}", progress_bar(book.progress_fraction(), 40));

    if !book.description.is_empty() {
        println!("\n{}", book.description);
    }
    println!(
        "\n{} {}",
        style("Narration:").dim(),
        style(book.narration_text(preview_chars)).italic()
    );
    Ok(())
}

/// Enumerate audio output devices
pub fn list_devices() -> Result<()> {
    let devices = list_output_devices().context("Failed to enumerate audio devices")?;

    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("\n{} Output Devices", style(devices.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for device in devices {
        let marker = if device.is_default {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!("{} {}", marker, style(&device.name).bold());
        println!(
            "    id: {}  default: {} Hz, {} ch",
            device.id, device.default_sample_rate, device.default_channels
        );
    }
    Ok(())
}

/// Write a default config file
pub fn config_init(manager: &ConfigManager) -> Result<()> {
    if manager.initialize().context("Failed to create config file")? {
        println!(
            "{} Created {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!(
            "Config already exists at {}",
            manager.config_path().display()
        );
    }
    Ok(())
}

/// Print the effective config, overrides included
pub fn config_show(manager: &ConfigManager, config: &Config) -> Result<()> {
    println!("# {}", manager.config_path().display());
    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    println!("{}", rendered);

    if let Err(errors) = config.validate() {
        for error in errors {
            println!("{} {}", style("warning:").yellow().bold(), error);
        }
    }
    Ok(())
}

/// Play the AI narrator preview of a book and wait for it to finish
pub async fn preview_book(config: &Config, catalog: &Catalog, id: &str) -> Result<()> {
    let book = find_book(catalog, id)?;
    let narrator =
        settings::build_narrator(&config.narrator).context("AI narrator is not configured")?;

    let mut coordinator = PlaybackCoordinator::with_cpal_output(
        settings::coordinator_config(config),
        settings::output_config(&config.player),
    );

    println!("Requesting narration for '{}'...", style(&book.title).bold());
    let text = book.narration_text(config.narrator.preview_chars);
    let outcome = coordinator
        .preview(&narrator, &PreviewDecoder::new(), &text)
        .await;

    let duration_secs = match outcome {
        PreviewOutcome::Started { duration_secs } => duration_secs,
        PreviewOutcome::Unavailable { reason, message } => bail!("{} ({})", message, reason),
    };
    println!("Playing {} of narration", format_clock(duration_secs));

    let term = Term::stdout();
    let mut refresh = tokio::time::interval(settings::ui_refresh(&config.player));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = refresh.tick() => {}
            _ = &mut ctrl_c => break,
        }

        let snapshot = coordinator.snapshot();
        let line = format!(
            "  {} / {} {}",
            format_clock(snapshot.position_secs),
            format_clock(snapshot.duration_secs),
            progress_bar(snapshot.progress_fraction(), 30)
        );
        term.clear_line().ok();
        term.write_str(&line).ok();

        if !snapshot.is_playing {
            break;
        }
    }

    term.write_line("").ok();
    coordinator.close();
    Ok(())
}

pub fn find_book<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a CatalogBook> {
    catalog
        .require(&BookId::from_string(id))
        .map_err(|e| anyhow!("{} Use 'list' to see ids.", e.user_message()))
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {:>3}%",
        "=".repeat(filled),
        " ".repeat(width - filled),
        (fraction * 100.0).round() as u32
    )
}

pub fn book_summary(book: &CatalogBook) -> String {
    let mut line = format!("{:>8}  {} by {}", book.id.as_str(), book.title, book.author);
    if book.is_in_progress() {
        line.push_str(&format!(
            "  ({}% listened)",
            (book.progress_fraction() * 100.0).round() as u32
        ));
    }
    line
}

fn print_book_summary(book: &CatalogBook) {
    println!("{}", book_summary(book));
    println!(
        "          {}  added {}",
        style(format_clock(book.duration.as_secs_f64())).dim(),
        book.added_at
    );
}
