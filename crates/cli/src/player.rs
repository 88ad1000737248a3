use crate::commands::{find_book, progress_bar};
use crate::settings;
use anyhow::{bail, Context, Result};
use audioshelf_config::Config;
use audioshelf_core::{format_clock, BookId, Catalog, Duration as CoreDuration};
use audioshelf_engine::{
    ActiveItem, PlaybackCoordinator, PlaybackMode, PlaybackSnapshot, PreviewDecoder,
    PreviewOutcome,
};
use audioshelf_narrator::GeminiNarrator;
use console::{style, Key, Term};
use tokio::sync::mpsc;

const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    TogglePlay,
    SkipBack,
    SkipForward,
    CycleRate,
    VolumeUp,
    VolumeDown,
    Preview,
    BackToBook,
    Quit,
}

pub fn action_for_key(key: &Key) -> Option<PlayerAction> {
    match key {
        Key::Char(' ') => Some(PlayerAction::TogglePlay),
        Key::ArrowLeft => Some(PlayerAction::SkipBack),
        Key::ArrowRight => Some(PlayerAction::SkipForward),
        Key::Char('r') | Key::Char('R') => Some(PlayerAction::CycleRate),
        Key::Char('+') | Key::Char('=') => Some(PlayerAction::VolumeUp),
        Key::Char('-') | Key::Char('_') => Some(PlayerAction::VolumeDown),
        Key::Char('p') | Key::Char('P') => Some(PlayerAction::Preview),
        Key::Char('b') | Key::Char('B') => Some(PlayerAction::BackToBook),
        Key::Char('q') | Key::Char('Q') | Key::Escape => Some(PlayerAction::Quit),
        _ => None,
    }
}

struct PlayerSession<'a> {
    config: &'a Config,
    catalog: Catalog,
    book_id: BookId,
    coordinator: PlaybackCoordinator,
    narrator: Option<GeminiNarrator>,
    decoder: PreviewDecoder,
    message: Option<String>,
}

pub async fn start_playback(config: &Config, catalog: Catalog, id: &str) -> Result<()> {
    let term = Term::stdout();
    if !term.is_term() {
        bail!("The player needs an interactive terminal");
    }

    let book = find_book(&catalog, id)?.clone();

    let narrator = match settings::build_narrator(&config.narrator) {
        Ok(narrator) => Some(narrator),
        Err(e) => {
            log::warn!("AI narrator disabled: {}", e);
            None
        }
    };

    let mut coordinator = PlaybackCoordinator::with_cpal_output(
        settings::coordinator_config(config),
        settings::output_config(&config.player),
    );
    coordinator
        .load_and_play(book.clone())
        .context("Failed to start playback")?;

    let mut session = PlayerSession {
        config,
        catalog,
        book_id: book.id,
        coordinator,
        narrator,
        decoder: PreviewDecoder::new(),
        message: None,
    };

    if term.hide_cursor().is_err() {
        log::warn!("Failed to hide cursor");
    }

    let result = session.run(&term).await;

    session.coordinator.close();
    let _ = term.show_cursor();
    term.clear_screen().ok();
    result
}

/// Reads keys on a plain thread; the channel closes when the reader fails.
fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("audioshelf-keys".to_string())
        .spawn(move || {
            while let Ok(key) = term.read_key() {
                if tx.send(key).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| log::error!("Failed to start key reader: {}", e))
        .ok();
    rx
}

impl PlayerSession<'_> {
    async fn run(&mut self, term: &Term) -> Result<()> {
        let mut keys = spawn_key_reader(term.clone());
        let mut refresh = tokio::time::interval(settings::ui_refresh(&self.config.player));

        loop {
            tokio::select! {
                _ = refresh.tick() => {}
                key = keys.recv() => {
                    let Some(key) = key else { break };
                    match action_for_key(&key) {
                        Some(PlayerAction::Quit) => break,
                        Some(action) => self.apply(action, term).await?,
                        None => {}
                    }
                }
            }

            let snapshot = self.coordinator.snapshot();
            self.remember_progress(&snapshot);
            draw_player_ui(term, &snapshot, self.message.as_deref())?;
        }

        Ok(())
    }

    async fn apply(&mut self, action: PlayerAction, term: &Term) -> Result<()> {
        match action {
            PlayerAction::TogglePlay => {
                if let Err(e) = self.coordinator.toggle_play_pause() {
                    self.message = Some(format!("Play/pause failed: {}", e));
                }
            }
            PlayerAction::SkipBack => self.coordinator.skip_back(),
            PlayerAction::SkipForward => self.coordinator.skip_forward(),
            PlayerAction::CycleRate => {
                let rate = self.coordinator.set_playback_rate(None);
                self.message = Some(format!("Speed {}", rate));
            }
            PlayerAction::VolumeUp | PlayerAction::VolumeDown => {
                let step = if action == PlayerAction::VolumeUp {
                    VOLUME_STEP
                } else {
                    -VOLUME_STEP
                };
                let current = self.coordinator.snapshot().volume;
                self.coordinator.set_volume(current + step);
            }
            PlayerAction::Preview => self.play_preview(term).await?,
            PlayerAction::BackToBook => {
                if self.coordinator.mode() != PlaybackMode::Simulated {
                    let book = self.catalog.require(&self.book_id)?.clone();
                    self.coordinator.load_and_play(book)?;
                    self.message = None;
                }
            }
            PlayerAction::Quit => {}
        }
        Ok(())
    }

    async fn play_preview(&mut self, term: &Term) -> Result<()> {
        if self.narrator.is_none() {
            self.message = Some(format!(
                "Preview unavailable: set {} to enable the AI narrator",
                self.config.narrator.api_key_env
            ));
            return Ok(());
        }

        let text = self
            .catalog
            .require(&self.book_id)?
            .narration_text(self.config.narrator.preview_chars);

        let snapshot = self.coordinator.snapshot();
        self.remember_progress(&snapshot);
        draw_player_ui(term, &snapshot, Some("Requesting AI narration..."))?;

        let Some(narrator) = &self.narrator else {
            return Ok(());
        };
        let outcome = self.coordinator.preview(narrator, &self.decoder, &text).await;

        self.message = Some(match outcome {
            PreviewOutcome::Started { duration_secs } => format!(
                "Narrator preview ({}). Press B to return to the book.",
                format_clock(duration_secs)
            ),
            PreviewOutcome::Unavailable { reason, message } => {
                log::info!("Preview unavailable: {}", reason);
                message
            }
        });
        Ok(())
    }

    /// Keeps the catalog's progress in step with the simulated clock
    fn remember_progress(&mut self, snapshot: &PlaybackSnapshot) {
        if let Some(ActiveItem::Book(book)) = &snapshot.item {
            let progress = CoreDuration::from_secs_f64(snapshot.position_secs);
            if let Err(e) = self.catalog.record_progress(&book.id, progress) {
                log::debug!("Progress not recorded: {}", e);
            }
        }
    }
}

pub fn status_label(snapshot: &PlaybackSnapshot) -> &'static str {
    match (snapshot.mode, snapshot.is_playing) {
        (PlaybackMode::Idle, _) => "Stopped",
        (_, true) => "Playing",
        (_, false) if snapshot.progress_fraction() >= 1.0 => "Finished",
        (_, false) => "Paused",
    }
}

fn draw_player_ui(term: &Term, snapshot: &PlaybackSnapshot, message: Option<&str>) -> Result<()> {
    term.clear_screen().context("Failed to clear screen")?;

    let (title, author) = snapshot
        .item
        .as_ref()
        .map(|item| (item.title(), item.author()))
        .unwrap_or(("Nothing playing", ""));

    term.write_line(&format!("\n  {}", style(title).bold().cyan()))
        .context("Failed to write title")?;
    if !author.is_empty() {
        term.write_line(&format!("  by {}", style(author).dim()))
            .context("Failed to write author")?;
    }
    term.write_line("").context("Failed to write blank line")?;

    term.write_line(&format!(
        "  {} / {}  (-{})",
        format_clock(snapshot.position_secs),
        format_clock(snapshot.duration_secs),
        format_clock(snapshot.remaining_secs())
    ))
    .context("Failed to write position")?;
    term.write_line(&format!("  {}", progress_bar(snapshot.progress_fraction(), 50)))
        .context("Failed to write progress bar")?;
    term.write_line("").context("Failed to write blank line")?;

    let status = match status_label(snapshot) {
        "Playing" => style("Playing").green(),
        "Paused" => style("Paused").yellow(),
        other => style(other).red(),
    };
    let source = match snapshot.mode {
        PlaybackMode::Preview => "AI narrator",
        PlaybackMode::Simulated => "audiobook",
        PlaybackMode::Idle => "-",
    };
    term.write_line(&format!("  Status: {}  [{}]", status, source))
        .context("Failed to write status")?;
    term.write_line(&format!("  Speed: {}", snapshot.rate))
        .context("Failed to write speed")?;
    term.write_line(&format!(
        "  Volume: {}%",
        (snapshot.volume * 100.0).round() as u32
    ))
    .context("Failed to write volume")?;

    if let Some(message) = message {
        term.write_line(&format!("\n  {}", style(message).italic()))
            .context("Failed to write message")?;
    }

    term.write_line("").context("Failed to write blank line")?;
    for line in [
        "  Controls:",
        "    Space   - Play/Pause",
        "    ←/→     - Skip back/forward",
        "    R       - Cycle speed",
        "    +/-     - Volume up/down",
        "    P       - AI narrator preview",
        "    B       - Back to the book",
        "    Q/Esc   - Quit",
    ] {
        term.write_line(line).context("Failed to write control")?;
    }

    Ok(())
}
