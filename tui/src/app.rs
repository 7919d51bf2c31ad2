//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse)
//! - ConductorClient for orchestration
//! - DisplayState for rendering
//!
//! The App:
//! 1. Converts terminal events and slash commands to SurfaceEvents
//! 2. Sends events to the embedded Conductor via ConductorClient
//! 3. Receives ConductorMessages and updates DisplayState
//! 4. Renders the conversation pane, the map pane and a status bar

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::time::MissedTickBehavior;
use unicode_width::UnicodeWidthChar;

use geo_conductor::{ChatBackend, NotifyLevel};

use crate::commands::{expand_home, parse_command, Command, HELP_TEXT};
use crate::conductor_client::ConductorClient;
use crate::display::{DisplayMessage, DisplayRole, DisplayState};
use crate::map_panel::MapPanel;
use crate::theme::{
    ASSISTANT_AMBER, ATTACHMENT_MAGENTA, CITATION_BLUE, DIM_GRAY, ERROR_RED, FADE_GRAY,
    SUGGESTION_CYAN, USER_GREEN, WARNING_YELLOW,
};

/// Composer height including its border
const INPUT_HEIGHT: u16 = 5;

/// Redraw interval
const FRAME_DURATION: Duration = Duration::from_millis(50);

/// Lines scrolled per mouse wheel step
const MOUSE_SCROLL_LINES: usize = 3;

/// What the composer is collecting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// A chat message or slash command
    Message,
    /// The path of an image to attach
    AttachPath,
}

/// Main application state
pub struct App<B: ChatBackend + 'static> {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Goodbye message to show on exit
    goodbye_message: Option<String>,

    // === Conductor Integration ===
    /// Client for communicating with the embedded Conductor
    conductor: ConductorClient<B>,
    /// Display state derived from ConductorMessages
    display: DisplayState,

    // === Input State ===
    mode: InputMode,
    /// Message being composed
    input_buffer: String,
    /// Path being typed in attach mode
    attach_buffer: String,
    /// Image to send with the next message
    attachment: Option<PathBuf>,
    /// Help overlay visible
    show_help: bool,

    // === Scroll State ===
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,
    /// Height of the conversation viewport
    viewport_height: usize,
}

impl<B: ChatBackend + 'static> App<B> {
    /// Create a new App around a Conductor client
    pub fn new(conductor: ConductorClient<B>) -> Self {
        Self {
            running: true,
            goodbye_message: None,
            conductor,
            display: DisplayState::new(),
            mode: InputMode::Message,
            input_buffer: String::new(),
            attach_buffer: String::new(),
            attachment: None,
            show_help: false,
            scroll_offset: 0,
            total_lines: 0,
            viewport_height: 0,
        }
    }

    /// Start the Conductor and connect this surface
    pub async fn startup(&mut self) {
        if let Err(e) = self.conductor.start().await {
            tracing::warn!("Conductor start error: {}", e);
        }
        if let Err(e) = self.conductor.connect().await {
            tracing::warn!("Conductor connect error: {}", e);
        }
        self.process_conductor_messages();
    }

    /// Main event loop
    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> anyhow::Result<()> {
        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(FRAME_DURATION);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Render initial frame immediately so user sees UI
        terminal.draw(|frame| self.draw(frame))?;
        self.startup().await;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => match maybe_event {
                    // Only handle Press events (not Release or Repeat)
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Err(e) = self.handle_key(key).await {
                            tracing::warn!(error = %e, "Failed to handle key");
                        }
                    }
                    Some(Ok(Event::Mouse(mouse))) => self.handle_mouse(mouse),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => self.running = false,
                },

                _ = ticker.tick() => {}
            }

            self.tick().await;
            terminal.draw(|frame| self.draw(frame))?;
        }

        Ok(())
    }

    /// Drain streaming progress and Conductor messages
    pub async fn tick(&mut self) {
        self.conductor.poll_streaming().await;
        self.process_conductor_messages();
    }

    /// Process all pending messages from the Conductor
    fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
        if let Some(message) = self.display.quit_message.take() {
            self.goodbye_message = Some(message);
            self.running = false;
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        self.display.clear_notification();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('c') if ctrl => self.quit().await?,
            KeyCode::Esc if self.show_help => self.show_help = false,
            KeyCode::Esc if self.mode == InputMode::AttachPath => {
                self.mode = InputMode::Message;
                self.attach_buffer.clear();
            }
            KeyCode::Esc => self.quit().await?,
            KeyCode::F(1) => self.show_help = !self.show_help,

            KeyCode::Char('a') if ctrl => self.mode = InputMode::AttachPath,
            KeyCode::Char('x') if ctrl => self.run_command(Command::Detach).await?,
            KeyCode::Char('l') if ctrl => self.run_command(Command::Clear).await?,
            KeyCode::Char('r') if ctrl => self.run_command(Command::Recenter).await?,
            KeyCode::Char(c @ '1'..='9') if alt => {
                let n = c.to_digit(10).map_or(1, |d| d as usize);
                self.run_command(Command::Pick(n)).await?;
            }

            KeyCode::Enter => match self.mode {
                InputMode::Message => self.submit().await?,
                InputMode::AttachPath => self.finish_attach_prompt(),
            },
            KeyCode::Char(c) => self.active_buffer().push(c),
            KeyCode::Backspace => {
                self.active_buffer().pop();
            }

            // Conversation scrolling
            KeyCode::PageUp => self.scroll_up(self.page_size()),
            KeyCode::PageDown => self.scroll_offset = self.scroll_offset.saturating_sub(self.page_size()),
            KeyCode::Home if ctrl => self.scroll_offset = self.total_lines.saturating_sub(1),
            KeyCode::End if ctrl => self.scroll_offset = 0,

            _ => {}
        }
        Ok(())
    }

    /// Handle mouse input
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(MOUSE_SCROLL_LINES),
            MouseEventKind::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(MOUSE_SCROLL_LINES);
            }
            _ => {}
        }
    }

    fn active_buffer(&mut self) -> &mut String {
        match self.mode {
            InputMode::Message => &mut self.input_buffer,
            InputMode::AttachPath => &mut self.attach_buffer,
        }
    }

    fn page_size(&self) -> usize {
        (self.viewport_height / 2).max(1)
    }

    fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines).min(max_scroll);
    }

    /// Send the composer contents, or run them as a command
    async fn submit(&mut self) -> anyhow::Result<()> {
        if let Some(parsed) = parse_command(&self.input_buffer) {
            self.input_buffer.clear();
            return match parsed {
                Ok(command) => self.run_command(command).await,
                Err(e) => {
                    self.display.notify(NotifyLevel::Warning, e.to_string());
                    Ok(())
                }
            };
        }

        // The composer is disabled while a turn is in flight
        if self.display.is_busy() {
            return Ok(());
        }
        if self.input_buffer.trim().is_empty() && self.attachment.is_none() {
            return Ok(());
        }

        let content = std::mem::take(&mut self.input_buffer);
        let image = self.attachment.take();
        self.scroll_offset = 0;
        self.conductor.send_message(content, image).await
    }

    fn finish_attach_prompt(&mut self) {
        let path = std::mem::take(&mut self.attach_buffer);
        let path = path.trim();
        if !path.is_empty() {
            self.attachment = Some(expand_home(path));
        }
        self.mode = InputMode::Message;
    }

    async fn run_command(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Attach(path) => self.attachment = Some(path),
            Command::Detach => self.attachment = None,
            Command::Clear => {
                self.scroll_offset = 0;
                self.conductor.clear_conversation().await?;
            }
            Command::Recenter => self.conductor.recenter_map().await?,
            Command::Pick(n) => {
                let suggestion = self.display.latest_suggestions().get(n - 1).cloned();
                match suggestion {
                    Some(suggestion) => self.conductor.select_suggestion(suggestion).await?,
                    None => self.display.notify(NotifyLevel::Info, format!("No suggestion {n}")),
                }
            }
            Command::Help => self.show_help = !self.show_help,
            Command::Quit => self.quit().await?,
        }
        Ok(())
    }

    async fn quit(&mut self) -> anyhow::Result<()> {
        self.conductor.request_quit().await?;
        self.process_conductor_messages();
        self.conductor.disconnect("user quit").await?;
        self.running = false;
        Ok(())
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the UI
    pub fn draw(&mut self, frame: &mut Frame) {
        let [main, status] = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
        let [conversation, map] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(main);
        let [messages, composer] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(INPUT_HEIGHT)]).areas(conversation);

        self.render_conversation(frame, messages);
        self.render_composer(frame, composer);
        frame.render_widget(MapPanel::new(&self.display.map), map);
        self.render_status(frame, status);

        if self.show_help {
            render_help(frame, main);
        }
    }

    /// Render conversation pane
    fn render_conversation(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DIM_GRAY))
            .title(" Conversation ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = inner.width as usize;
        let height = inner.height as usize;
        self.viewport_height = height;
        if width < 10 || height < 1 {
            return;
        }

        let all_lines = conversation_lines(&self.display.messages, width);
        self.total_lines = all_lines.len();

        // Clamp scroll offset
        let max_scroll = self.total_lines.saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);

        let visible_end = self.total_lines - self.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);
        let has_content_above = visible_start > 0;
        let has_content_below = self.scroll_offset > 0;
        let last_row = (visible_end - visible_start).saturating_sub(1);

        let lines: Vec<Line> = all_lines[visible_start..visible_end]
            .iter()
            .enumerate()
            .map(|(i, (text, style))| {
                let faded = (has_content_above && i == 0) || (has_content_below && i == last_row);
                let style = if faded { Style::default().fg(FADE_GRAY) } else { *style };
                Line::from(Span::styled(text.clone(), style))
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Render composer
    fn render_composer(&self, frame: &mut Frame, area: Rect) {
        let busy = self.display.is_busy();
        let (title, text, style) = match self.mode {
            InputMode::AttachPath => (
                " Image path (Enter to attach, Esc to cancel) ",
                format!("{}_", self.attach_buffer),
                Style::default().fg(ATTACHMENT_MAGENTA),
            ),
            InputMode::Message if busy => (
                " Waiting for the reply... ",
                self.input_buffer.clone(),
                Style::default().fg(DIM_GRAY),
            ),
            InputMode::Message => (
                " Message (Enter to send, F1 for help) ",
                format!("{}_", self.input_buffer),
                Style::default().fg(USER_GREEN),
            ),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DIM_GRAY))
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = inner.width as usize;
        if width < 5 || inner.height == 0 {
            return;
        }

        let mut rows = inner.height as usize;
        let mut lines = Vec::new();
        if let Some(path) = &self.attachment {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            lines.push(Line::from(Span::styled(
                truncate_to_width(&format!("[image: {name}]  Ctrl+X to remove"), width),
                Style::default().fg(ATTACHMENT_MAGENTA).add_modifier(Modifier::BOLD),
            )));
            rows = rows.saturating_sub(1);
        }

        // Keep the tail of long input visible
        let wrapped = textwrap::wrap(&text, width);
        let skip = wrapped.len().saturating_sub(rows);
        lines.extend(
            wrapped
                .iter()
                .skip(skip)
                .map(|line| Line::from(Span::styled(line.to_string(), style))),
        );

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Render status bar
    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let width = area.width as usize;

        let (text, style) = match &self.display.notification {
            Some(notification) => {
                let color = match notification.level {
                    NotifyLevel::Info => DIM_GRAY,
                    NotifyLevel::Warning => WARNING_YELLOW,
                    NotifyLevel::Error => ERROR_RED,
                };
                let text = match &notification.title {
                    Some(title) => format!(" {title}: {}", notification.message),
                    None => format!(" {}", notification.message),
                };
                (text, Style::default().fg(color))
            }
            None => {
                let scroll_info = if self.scroll_offset > 0 {
                    format!(" | ^{} lines, PgDn to scroll", self.scroll_offset)
                } else {
                    String::new()
                };
                let text = format!(
                    " {} | {} | Esc quit | F1 help{}",
                    self.display.conductor_state.description(),
                    self.display.session_model,
                    scroll_info
                );
                (text, Style::default().fg(DIM_GRAY))
            }
        };

        frame.render_widget(
            Paragraph::new(Span::styled(truncate_to_width(&text, width), style)),
            area,
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Current composer mode
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Message being composed
    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    /// Pending attachment
    pub fn attachment(&self) -> Option<&PathBuf> {
        self.attachment.as_ref()
    }

    /// Whether the help overlay is visible
    pub fn help_visible(&self) -> bool {
        self.show_help
    }

    /// Whether this surface is still connected to the Conductor
    pub fn is_connected(&self) -> bool {
        self.conductor.is_connected()
    }

    /// Whether the event loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get the goodbye message for display after TUI closes
    pub fn goodbye(&self) -> Option<&str> {
        self.goodbye_message.as_deref()
    }
}

/// Wrapped, styled lines for the conversation pane
pub fn conversation_lines(messages: &[DisplayMessage], width: usize) -> Vec<(String, Style)> {
    let mut lines = Vec::new();

    for msg in messages {
        let style = match msg.role {
            _ if msg.is_failed() => Style::default().fg(ERROR_RED),
            DisplayRole::User => Style::default().fg(USER_GREEN),
            DisplayRole::Assistant => Style::default().fg(ASSISTANT_AMBER),
        };

        let cursor = if msg.is_streaming() { "_" } else { "" };
        let content = format!("{}{}{}", msg.role.prefix(), msg.content, cursor);
        for line in textwrap::wrap(&content, width) {
            lines.push((line.into_owned(), style));
        }

        if let Some(name) = &msg.image_name {
            lines.push((format!("  [image: {name}]"), Style::default().fg(ATTACHMENT_MAGENTA)));
        }

        let indent = textwrap::Options::new(width)
            .initial_indent("  ")
            .subsequent_indent("      ");
        for (i, citation) in msg.citations.iter().enumerate() {
            let entry = format!("[{}] {} ({}) {}", i + 1, citation.title, citation.kind.label(), citation.uri);
            for line in textwrap::wrap(&entry, &indent) {
                lines.push((line.into_owned(), Style::default().fg(CITATION_BLUE)));
            }
        }

        for (i, suggestion) in msg.suggestions.iter().enumerate() {
            let entry = format!("Alt+{}  {suggestion}", i + 1);
            for line in textwrap::wrap(&entry, &indent) {
                lines.push((line.into_owned(), Style::default().fg(SUGGESTION_CYAN)));
            }
        }

        lines.push((String::new(), Style::default()));
    }

    lines
}

/// Cut `text` to at most `width` terminal columns
fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

fn render_help(frame: &mut Frame, area: Rect) {
    let height = (HELP_TEXT.lines().count() as u16 + 2).min(area.height);
    let width = 64.min(area.width);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(HELP_TEXT).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (Esc to close) "),
        ),
        popup,
    );
}
