use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{EngineError, PlaybackController, PreferenceStore, TickOutcome};
use crate::models::{BookId, DisplayFrame, PlaybackState};
use crate::settings::{Action, DisplayMode, Preferences, PreferencesPatch};
use crate::state::State;
use crate::ui::sink::FrameSlot;
use crate::ui::windows::help::HelpWindow;

pub type ReaderController = PlaybackController<Rc<State>, FrameSlot>;

const IDLE_POLL: Duration = Duration::from_secs(60);
const JUMP_WORDS: isize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

/// UI-specific state management
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub show_help: bool,
    pub help_scroll_offset: u16,
    pub message: Option<String>,
    pub message_type: Option<MessageType>,
    pub message_time: Option<Instant>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_message(&mut self, message: String, message_type: MessageType) {
        self.message = Some(message);
        self.message_type = Some(message_type);
        self.message_time = Some(Instant::now());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_type = None;
        self.message_time = None;
    }

    pub fn message_expired(&self, timeout: Duration) -> bool {
        self.message_time.is_some_and(|t| t.elapsed() >= timeout)
    }
}

/// What a key press asks the reader to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Action(Action),
    Step(isize),
    Seek(u32),
}

/// Everything the reader screen needs except the terminal itself.
pub struct ApplicationState {
    pub controller: ReaderController,
    pub config: Config,
    pub title: String,
    pub ui_state: UiState,
    pub should_quit: bool,
    db_state: Rc<State>,
    redraw: bool,
}

impl ApplicationState {
    pub fn open(
        config: Config,
        db_state: Rc<State>,
        book_id: BookId,
        title: impl Into<String>,
    ) -> eyre::Result<Self> {
        let preferences = config.read_preferences()?;
        let mut controller =
            PlaybackController::with_preferences(Rc::clone(&db_state), FrameSlot::new(), preferences);
        controller.open_from(db_state.as_ref(), book_id)?;

        Ok(Self {
            controller,
            config,
            title: title.into(),
            ui_state: UiState::new(),
            should_quit: false,
            db_state,
            redraw: true,
        })
    }

    /// Run a due tick and expire old messages.
    pub fn tick(&mut self, now: Instant) {
        if self.ui_state.message_expired(self.message_timeout()) {
            self.ui_state.clear_message();
            self.redraw = true;
        }

        match self.controller.pump(now) {
            TickOutcome::Idle | TickOutcome::Advanced(_) => {}
            TickOutcome::Finished(_) => {
                self.flush_stats();
                self.ui_state
                    .set_message(format!("Finished \"{}\".", self.title), MessageType::Info);
                self.redraw = true;
            }
            TickOutcome::Faulted(err) => {
                self.flush_stats();
                self.ui_state.set_message(err.to_string(), MessageType::Error);
                self.redraw = true;
            }
        }
    }

    /// Whether the screen is stale: a new frame arrived, or the UI changed.
    pub fn take_redraw(&mut self) -> bool {
        let frame_changed = self.controller.sink_mut().take_dirty();
        std::mem::take(&mut self.redraw) || frame_changed
    }

    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// How long the event loop may block before something needs attention.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let tick = self
            .controller
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));
        let message = self.ui_state.message_time.map(|t| {
            self.message_timeout()
                .saturating_sub(now.saturating_duration_since(t))
        });
        [tick, message]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(IDLE_POLL)
    }

    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) {
        self.redraw = true;
        if self.ui_state.show_help {
            self.handle_help_key(key);
            return;
        }
        if self.ui_state.message.is_some() {
            self.ui_state.clear_message();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if let Some(command) = self.command_for(key) {
            self.execute(command, now);
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        let max_offset = HelpWindow::total_lines().saturating_sub(1) as u16;
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
                self.ui_state.show_help = false;
                self.ui_state.help_scroll_offset = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.ui_state.help_scroll_offset = self.ui_state.help_scroll_offset.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.ui_state.help_scroll_offset =
                    (self.ui_state.help_scroll_offset + 1).min(max_offset);
            }
            _ => {}
        }
    }

    fn command_for(&self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char(c) => {
                if let Some(action) = self.config.keymap.action_for(c) {
                    return Some(Command::Action(action));
                }
                match c {
                    ' ' => Some(Command::Action(Action::PlayPause)),
                    '=' => Some(Command::Action(Action::Faster)),
                    'h' => Some(Command::Step(-1)),
                    'l' => Some(Command::Step(1)),
                    '[' => Some(Command::Step(-JUMP_WORDS)),
                    ']' => Some(Command::Step(JUMP_WORDS)),
                    '0'..='9' => c.to_digit(10).map(|d| Command::Seek(d * 10)),
                    _ => None,
                }
            }
            KeyCode::Left => Some(Command::Step(-1)),
            KeyCode::Right => Some(Command::Step(1)),
            KeyCode::Esc => Some(Command::Action(Action::Quit)),
            _ => None,
        }
    }

    fn execute(&mut self, command: Command, now: Instant) {
        let result = match command {
            Command::Action(action) => self.apply_action(action, now),
            Command::Step(delta) => self.controller.step_by(delta).map(|_| ()),
            Command::Seek(percentage) => self.controller.seek(percentage).map(|_| ()),
        };
        if matches!(command, Command::Step(_) | Command::Seek(_)) {
            self.flush_stats();
        }
        if let Err(err) = result {
            self.ui_state.set_message(err.to_string(), MessageType::Error);
        }
    }

    fn apply_action(&mut self, action: Action, now: Instant) -> Result<(), EngineError> {
        match action {
            Action::PlayPause => {
                if self.controller.toggle(now)? == PlaybackState::Paused {
                    self.flush_stats();
                }
            }
            Action::Restart => {
                self.controller.restart()?;
                self.flush_stats();
            }
            Action::AddBookmark => {
                let position = self.controller.set_bookmark()?;
                self.ui_state.set_message(
                    format!("Bookmark set at word {}.", position + 1),
                    MessageType::Info,
                );
            }
            Action::ResumeBookmark => {
                if self.controller.resume_from_bookmark(now)?.is_none() {
                    self.ui_state
                        .set_message("No bookmark set.".to_string(), MessageType::Warning);
                }
            }
            Action::Faster | Action::Slower => {
                let wpm = self.controller.adjust_wpm(now, action == Action::Faster);
                self.save_preferences();
                self.ui_state
                    .set_message(format!("{wpm} WPM"), MessageType::Info);
            }
            Action::ToggleMode => {
                let prefs = *self.controller.preferences();
                let mode = match prefs.mode {
                    DisplayMode::Single => DisplayMode::Chunked,
                    DisplayMode::Chunked => DisplayMode::Single,
                };
                self.controller.set_mode(now, mode, prefs.chunk_size);
                self.save_preferences();
            }
            Action::ChunkSmaller | Action::ChunkLarger => {
                let prefs = *self.controller.preferences();
                let chunk_size = if action == Action::ChunkLarger {
                    prefs.chunk_size + 1
                } else {
                    prefs.chunk_size.saturating_sub(1)
                };
                self.controller.set_mode(now, prefs.mode, chunk_size);
                self.save_preferences();
                self.ui_state.set_message(
                    format!("Chunk size {}", self.controller.preferences().chunk_size),
                    MessageType::Info,
                );
            }
            Action::SentencePause => {
                let prefs = Preferences {
                    pause_at_sentence_end: !self.controller.preferences().pause_at_sentence_end,
                    ..*self.controller.preferences()
                };
                self.controller.set_preferences(now, prefs);
                self.save_preferences();
            }
            Action::SpeedVariability => {
                let prefs = Preferences {
                    speed_variability: !self.controller.preferences().speed_variability,
                    ..*self.controller.preferences()
                };
                self.controller.set_preferences(now, prefs);
                self.save_preferences();
            }
            Action::Help => self.ui_state.show_help = true,
            Action::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn save_preferences(&mut self) {
        let patch = PreferencesPatch::from(*self.controller.preferences());
        if let Err(err) = self.config.write_preferences(&patch) {
            warn!("failed to save preferences: {err:#}");
            self.ui_state
                .set_message("Could not save preferences.".to_string(), MessageType::Warning);
        }
    }

    /// Move words read since the last flush into today's statistics.
    fn flush_stats(&mut self) {
        let stats = self.controller.take_session_stats();
        if stats.is_empty() {
            return;
        }
        let Some(book_id) = self.controller.session().map(|s| s.book_id().clone()) else {
            return;
        };
        let today = Local::now().date_naive();
        if let Err(err) = self
            .db_state
            .record_session(today, &book_id, &self.title, &stats)
        {
            warn!(%book_id, "failed to record reading session: {err:#}");
        }
    }

    /// Pause, record statistics and release the book.
    pub fn shutdown(&mut self) {
        if self.controller.state() == PlaybackState::Playing {
            if let Err(err) = self.controller.pause() {
                warn!("failed to pause before closing: {err}");
            }
        }
        self.flush_stats();
        if let Some(session) = self.controller.close() {
            info!(book_id = %session.book_id(), cursor = session.cursor(), "reader closed");
        }
    }

    fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.config.settings.message_timeout_secs)
    }

    pub fn render(&self, frame: &mut Frame) {
        let settings = &self.config.settings;
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(u16::from(settings.show_top_bar)),
            Constraint::Min(3),
            Constraint::Length(u16::from(settings.show_progress_indicator)),
            Constraint::Length(1),
        ])
        .split(area);

        if settings.show_top_bar {
            let header = Paragraph::new(build_header_line(
                &self.title,
                Some(&self.status_text()),
                chunks[0].width,
            ))
            .style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_widget(header, chunks[0]);
        }

        self.render_word(frame, chunks[1]);

        if settings.show_progress_indicator {
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Magenta).bg(Color::DarkGray))
                .percent(u16::from(self.controller.percentage()))
                .label(format!("{}%", self.controller.percentage()));
            frame.render_widget(gauge, chunks[2]);
        }

        let hints = Paragraph::new("Space play/pause  h/l step  b bookmark  ? help  q quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(hints, chunks[3]);

        if self.ui_state.show_help {
            HelpWindow::render(frame, area, self.ui_state.help_scroll_offset);
        }
        if let (Some(message), Some(message_type)) =
            (&self.ui_state.message, self.ui_state.message_type)
        {
            render_message(frame, message, message_type);
        }
    }

    fn status_text(&self) -> String {
        let prefs = self.controller.preferences();
        let mode = match prefs.mode {
            DisplayMode::Single => prefs.mode.label().to_string(),
            DisplayMode::Chunked => format!("{} x{}", prefs.mode.label(), prefs.step()),
        };
        format!(
            "{} | {} WPM | {} | {}%",
            self.controller.state().label(),
            prefs.wpm,
            mode,
            self.controller.percentage()
        )
    }

    fn render_word(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let center_x = inner.x + inner.width / 2;
        let center_y = inner.y + inner.height / 2;
        let marker_style = Style::default().fg(Color::DarkGray);
        if center_y > inner.y {
            frame.render_widget(
                Paragraph::new("|").style(marker_style),
                Rect::new(center_x, center_y - 1, 1, 1),
            );
        }
        if center_y + 1 < inner.y + inner.height {
            frame.render_widget(
                Paragraph::new("|").style(marker_style),
                Rect::new(center_x, center_y + 1, 1, 1),
            );
        }

        let line_area = Rect::new(inner.x, center_y, inner.width, 1);
        let line = match self.controller.sink().frame() {
            Some(display) if !display.words.is_empty() => {
                self.word_line(display, inner.width)
            }
            Some(display) if display.state == PlaybackState::Finished => {
                Line::from("Finished. Press Space to read again.").alignment(Alignment::Center)
            }
            _ => Line::from("No words to show.").alignment(Alignment::Center),
        };
        frame.render_widget(Paragraph::new(line), line_area);
    }

    /// A single word is placed so its ORP letter sits on the centre column;
    /// a chunk is centred as a whole.
    fn word_line(&self, display: &DisplayFrame, width: u16) -> Line<'static> {
        let settings = &self.config.settings;
        let word_style = Style::default().fg(parse_color(&settings.word_color, Color::White));
        let orp_style = Style::default()
            .fg(parse_color(&settings.orp_color, Color::Red))
            .add_modifier(Modifier::BOLD);

        let mut spans = Vec::new();
        for (i, word) in display.words.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            let (before, orp, after) = word.split();
            spans.push(Span::styled(before.to_string(), word_style));
            spans.push(Span::styled(orp.to_string(), orp_style));
            spans.push(Span::styled(after.to_string(), word_style));
        }

        if display.is_chunk {
            return Line::from(spans).alignment(Alignment::Center);
        }
        let before_len = display.words[0].orp;
        let pad = (width as usize / 2).saturating_sub(before_len);
        spans.insert(0, Span::raw(" ".repeat(pad)));
        Line::from(spans)
    }
}

fn parse_color(value: &str, fallback: Color) -> Color {
    value.parse().unwrap_or(fallback)
}

fn build_header_line(title: &str, right_text: Option<&str>, width: u16) -> String {
    let width = width as usize;
    if width == 0 {
        return String::new();
    }

    let mut buffer = vec![' '; width];
    let right_len = right_text.map(|text| text.chars().count()).unwrap_or(0);
    let content_width = if right_len > 0 {
        width.saturating_sub(right_len + 1)
    } else {
        width
    };

    let title_chars: Vec<char> = title.chars().take(content_width).collect();
    let title_start = content_width.saturating_sub(title_chars.len()) / 2;
    for (i, ch) in title_chars.into_iter().enumerate() {
        if let Some(slot) = buffer.get_mut(title_start + i) {
            *slot = ch;
        }
    }

    if let Some(right_text) = right_text {
        let start = width.saturating_sub(right_len);
        for (i, ch) in right_text.chars().enumerate() {
            if let Some(slot) = buffer.get_mut(start + i) {
                *slot = ch;
            }
        }
    }

    buffer.into_iter().collect()
}

fn render_message(frame: &mut Frame, message: &str, message_type: MessageType) {
    let color = match message_type {
        MessageType::Info => Color::Blue,
        MessageType::Warning => Color::Yellow,
        MessageType::Error => Color::Red,
    };

    let message_paragraph = Paragraph::new(message)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });

    let frame_area = frame.area();
    if frame_area.width < 6 || frame_area.height < 5 {
        return;
    }
    let area = Rect {
        x: frame_area.x + 2,
        y: frame_area.y + 2,
        width: frame_area.width - 4,
        height: 3,
    };

    frame.render_widget(Clear, area);
    frame.render_widget(message_paragraph, area);
}

/// Terminal front-end around [`ApplicationState`].
pub struct Reader {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    app: ApplicationState,
}

impl Reader {
    pub fn new(
        config: Config,
        db_state: Rc<State>,
        book_id: BookId,
        title: impl Into<String>,
    ) -> eyre::Result<Self> {
        let app = ApplicationState::open(config, db_state, book_id, title)?;
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal, app })
    }

    /// Run the main application loop
    pub fn run(&mut self) -> eyre::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        let result = self.event_loop();
        self.app.shutdown();

        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        result
    }

    fn event_loop(&mut self) -> eyre::Result<()> {
        while !self.app.should_quit {
            self.app.tick(Instant::now());

            if self.app.take_redraw() {
                let app = &self.app;
                self.terminal.draw(|f| app.render(f))?;
            }

            let timeout = self.app.poll_timeout(Instant::now());
            if crossterm::event::poll(timeout)? {
                match crossterm::event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.app.handle_key_event(key, Instant::now());
                    }
                    Event::Resize(_, _) => self.app.request_redraw(),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProgressStore;
    use crate::ingest::book_from_text;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    const TEXT: &str = "The Quick Fox Runs Far. It was a fine day.";

    fn setup_app() -> (ApplicationState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_state = Rc::new(State::open(temp_dir.path().join("states.db")).unwrap());
        let mut config = Config::load_from(temp_dir.path().join("configuration.json")).unwrap();
        config.preferences.wpm = 600;

        let book = book_from_text("Fox", TEXT, "txt");
        db_state.add_book(&book).unwrap();
        let app = ApplicationState::open(config, db_state, book.id.clone(), "Fox").unwrap();
        (app, temp_dir)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut ApplicationState, c: char, now: Instant) {
        app.handle_key_event(key(KeyCode::Char(c)), now);
    }

    fn screen_text(app: &ApplicationState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_space_plays_and_ticks_advance() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        press(&mut app, ' ', t0);
        assert_eq!(app.controller.state(), PlaybackState::Playing);

        app.tick(t0 + Duration::from_millis(100));
        assert_eq!(app.controller.cursor(), 1);
        assert!(screen_text(&app).contains("Quick"));

        press(&mut app, ' ', t0 + Duration::from_millis(150));
        assert_eq!(app.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_pause_records_statistics() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        press(&mut app, 'p', t0);
        for n in 1..=3 {
            app.tick(t0 + Duration::from_millis(100 * n));
        }
        press(&mut app, 'p', t0 + Duration::from_millis(350));

        let today = Local::now().date_naive();
        let stats = app.db_state.daily_stats(today).unwrap();
        assert_eq!(stats.words_read, 3);
        assert_eq!(stats.books_read, 1);
    }

    #[test]
    fn test_navigation_keys() {
        let (mut app, _temp_dir) = setup_app();
        let now = Instant::now();
        app.handle_key_event(key(KeyCode::Right), now);
        press(&mut app, 'l', now);
        assert_eq!(app.controller.cursor(), 2);
        app.handle_key_event(key(KeyCode::Left), now);
        assert_eq!(app.controller.cursor(), 1);
        // Clamped to the last of the 10 words.
        press(&mut app, ']', now);
        assert_eq!(app.controller.cursor(), 9);
        press(&mut app, '[', now);
        assert_eq!(app.controller.cursor(), 0);

        // 10 words: '5' seeks to 50%.
        press(&mut app, '5', now);
        assert_eq!(app.controller.cursor(), 5);
        assert_eq!(app.controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_bookmark_keys() {
        let (mut app, _temp_dir) = setup_app();
        let now = Instant::now();
        press(&mut app, 'B', now);
        assert_eq!(app.ui_state.message.as_deref(), Some("No bookmark set."));

        press(&mut app, '3', now);
        press(&mut app, 'b', now);
        assert_eq!(app.ui_state.message.as_deref(), Some("Bookmark set at word 4."));
        press(&mut app, '0', now);
        press(&mut app, 'B', now);
        assert_eq!(app.controller.cursor(), 3);

        let book_id = app.controller.session().unwrap().book_id().clone();
        let record = app.db_state.read_progress(&book_id).unwrap().unwrap();
        assert_eq!(record.bookmark, Some(3));
    }

    #[test]
    fn test_speed_keys_save_preferences() {
        let (mut app, temp_dir) = setup_app();
        let now = Instant::now();
        press(&mut app, '+', now);
        press(&mut app, '=', now);
        assert_eq!(app.controller.preferences().wpm, 700);
        press(&mut app, '-', now);
        assert_eq!(app.controller.preferences().wpm, 650);

        press(&mut app, 'm', now);
        press(&mut app, '>', now);
        press(&mut app, 's', now);
        let saved = Config::load_from(temp_dir.path().join("configuration.json")).unwrap();
        assert_eq!(saved.preferences.wpm, 650);
        assert_eq!(saved.preferences.mode, DisplayMode::Chunked);
        assert_eq!(saved.preferences.chunk_size, 2);
        assert!(saved.preferences.pause_at_sentence_end);
        assert!(screen_text(&app).contains("The Quick"));
    }

    #[test]
    fn test_help_and_quit() {
        let (mut app, _temp_dir) = setup_app();
        let now = Instant::now();
        press(&mut app, '?', now);
        assert!(app.ui_state.show_help);
        assert!(screen_text(&app).contains("Help"));

        // q closes the help window before it quits.
        press(&mut app, 'q', now);
        assert!(!app.ui_state.show_help);
        assert!(!app.should_quit);
        app.handle_key_event(key(KeyCode::Esc), now);
        assert!(app.should_quit);
    }

    #[test]
    fn test_deleted_book_shows_message() {
        let (mut app, _temp_dir) = setup_app();
        let book_id = app.controller.session().unwrap().book_id().clone();
        app.db_state.delete_book(&book_id).unwrap();

        press(&mut app, ' ', Instant::now());
        assert_eq!(
            app.ui_state.message.as_deref(),
            Some("Please select a book first.")
        );
        assert_eq!(app.ui_state.message_type, Some(MessageType::Error));
    }

    #[test]
    fn test_finish_and_shutdown() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        press(&mut app, '9', t0);
        press(&mut app, ' ', t0);
        // Play on the last word starts over.
        assert_eq!(app.controller.cursor(), 0);
        for n in 1..=10 {
            app.tick(t0 + Duration::from_millis(100 * n));
        }
        assert_eq!(app.controller.state(), PlaybackState::Finished);
        assert!(screen_text(&app).contains("Finished"));

        app.shutdown();
        assert!(app.controller.session().is_none());
    }

    #[test]
    fn test_poll_timeout_follows_next_tick() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        assert_eq!(app.poll_timeout(t0), IDLE_POLL);
        press(&mut app, ' ', t0);
        assert_eq!(app.poll_timeout(t0), Duration::from_millis(100));
        assert_eq!(app.poll_timeout(t0 + Duration::from_millis(40)), Duration::from_millis(60));
    }

    #[test]
    fn test_redraw_only_when_something_changed() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        assert!(app.take_redraw());
        assert!(!app.take_redraw());

        press(&mut app, ' ', t0);
        assert!(app.take_redraw());
        app.tick(t0 + Duration::from_millis(50));
        assert!(!app.take_redraw());
        app.tick(t0 + Duration::from_millis(100));
        assert!(app.take_redraw());
        assert!(!app.take_redraw());

        app.request_redraw();
        assert!(app.take_redraw());
    }

    #[test]
    fn test_shutdown_while_playing_pauses_and_saves() {
        let (mut app, _temp_dir) = setup_app();
        let t0 = Instant::now();
        press(&mut app, ' ', t0);
        app.tick(t0 + Duration::from_millis(100));
        app.tick(t0 + Duration::from_millis(200));
        let book_id = app.controller.session().unwrap().book_id().clone();

        app.shutdown();
        assert_eq!(app.controller.next_deadline(), None);
        let record = app.db_state.read_progress(&book_id).unwrap().unwrap();
        assert_eq!(record.progress, 2);
        let stats = app.db_state.daily_stats(Local::now().date_naive()).unwrap();
        assert_eq!(stats.words_read, 2);
    }

    #[test]
    fn test_build_header_line() {
        let line = build_header_line("Title", Some("paused"), 20);
        assert_eq!(line.chars().count(), 20);
        assert!(line.ends_with("paused"));
        assert!(line.contains("Title"));
        assert_eq!(build_header_line("Title", None, 0), "");
    }
}
