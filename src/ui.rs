use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::{io, path::PathBuf, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use educhat::{
    models::{Message, MessageStatus, Theme, UserStatus},
    persistence::PersistedState,
    ChatSession,
};

// Export types needed by main module
pub use ratatui::Terminal;
pub use ratatui::backend::CrosstermBackend;

const VOICE_COMMAND: &str = "/voice ";

/// What the user asked for on this tick
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Send(String),
    SendVoice(PathBuf),
    ToggleTheme,
    CancelPending,
    Quit,
}

pub struct ChatUI {
    input: Input,
    notice: Option<(String, chrono::DateTime<chrono::Utc>)>, // Transient one-line notice
}

struct Palette {
    base: Style,
    muted: Style,
    accent: Color,
    code: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                base: Style::default().fg(Color::Black).bg(Color::White),
                muted: Style::default().fg(Color::DarkGray).bg(Color::White),
                accent: Color::Blue,
                code: Color::Magenta,
            },
            Theme::Dark => Palette {
                base: Style::default().fg(Color::White).bg(Color::Black),
                muted: Style::default().fg(Color::Gray).bg(Color::Black),
                accent: Color::Cyan,
                code: Color::Yellow,
            },
        }
    }
}

impl ChatUI {
    pub fn new() -> Self {
        ChatUI {
            input: Input::default(),
            notice: None,
        }
    }

    pub fn show_notice(&mut self, text: &str) {
        self.notice = Some((text.to_string(), chrono::Utc::now()));
    }

    // Drop the notice once it has been visible for `timeout_secs`
    pub fn clean_notice(&mut self, timeout_secs: i64) {
        if let Some((_, shown_at)) = &self.notice {
            if (chrono::Utc::now() - *shown_at).num_seconds() > timeout_secs {
                self.notice = None;
            }
        }
    }

    /// Poll the keyboard once. `input_enabled` is false while a reply is
    /// pending; Enter is ignored then but the line can still be edited.
    pub fn handle_input(&mut self, input_enabled: bool) -> Result<Option<UiAction>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }

        let event = event::read()?;
        let Event::Key(key) = event else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Ok(Some(UiAction::Quit)),
            KeyCode::Char('t') if ctrl => Ok(Some(UiAction::ToggleTheme)),
            KeyCode::Char('x') if ctrl => Ok(Some(UiAction::CancelPending)),
            KeyCode::Enter => {
                if !input_enabled {
                    debug!("Enter ignored while a reply is pending");
                    return Ok(None);
                }
                let value = self.input.value().to_string();
                self.input.reset();

                if let Some(path) = value.strip_prefix(VOICE_COMMAND) {
                    let path = path.trim();
                    if path.is_empty() {
                        self.show_notice("Usage: /voice <audio file>");
                        return Ok(None);
                    }
                    return Ok(Some(UiAction::SendVoice(PathBuf::from(path))));
                }
                Ok(Some(UiAction::Send(value)))
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                Ok(None)
            }
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, session: &ChatSession) {
        let state = session.snapshot();
        let palette = Palette::for_theme(state.theme);
        let size = frame.size();

        frame.render_widget(Block::default().style(palette.base), size);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),       // Header
                Constraint::Min(5),          // Messages area
                Constraint::Length(3),       // Input box
                Constraint::Length(1),       // Help line
            ])
            .split(size);

        draw_header(frame, &state, &palette, chunks[0]);
        draw_messages(frame, &state, session, &palette, chunks[1]);

        let input_title = if session.is_sending() {
            "Message (waiting for reply...)"
        } else {
            "Message"
        };
        let input_widget = Paragraph::new(self.input.value())
            .style(palette.base)
            .block(
                Block::default()
                    .title(input_title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent)),
            );
        frame.render_widget(input_widget, chunks[2]);

        let help = match &self.notice {
            Some((text, _)) => Paragraph::new(text.as_str()).style(palette.base.fg(Color::Red)),
            None => Paragraph::new(
                "Enter send | /voice <file> voice message | Ctrl+T theme | Ctrl+X cancel pending | Esc quit",
            )
            .style(palette.muted),
        };
        frame.render_widget(help, chunks[3]);

        frame.set_cursor(
            input_cursor_x(chunks[2], self.input.cursor()),
            // Put cursor at the start of the input line
            chunks[2].y + 1,
        );
    }
}

// Column just past the typed text, kept inside the input box borders
fn input_cursor_x(area: Rect, cursor: usize) -> u16 {
    let offset = u16::try_from(cursor).unwrap_or(u16::MAX);
    let last_inner = area.right().saturating_sub(2).max(area.x);
    area.x.saturating_add(1).saturating_add(offset).min(last_inner)
}

fn draw_header<B: Backend>(f: &mut Frame<B>, state: &PersistedState, palette: &Palette, area: Rect) {
    let peer = state
        .users
        .iter()
        .find(|u| u.id != state.current_user.id);

    let presence = if state.active_chat.typing {
        format!("{} is typing...", peer.map(|u| u.name.as_str()).unwrap_or("Assistant"))
    } else {
        match peer.map(|u| u.status) {
            Some(UserStatus::Online) => "online".to_string(),
            Some(UserStatus::Typing) => "typing...".to_string(),
            Some(UserStatus::Offline) | None => "offline".to_string(),
        }
    };

    let line = Line::from(vec![
        Span::styled(
            state.active_chat.name.clone(),
            palette.base.add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", presence), palette.muted),
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent)),
    );
    f.render_widget(header, area);
}

fn draw_messages<B: Backend>(
    f: &mut Frame<B>,
    state: &PersistedState,
    session: &ChatSession,
    palette: &Palette,
    area: Rect,
) {
    let wrap_width = area.width.saturating_sub(2).max(1) as usize; // Account for borders
    let visible_rows = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in &state.messages {
        let is_own = message.user_id == state.current_user.id;
        let sender = state
            .users
            .iter()
            .find(|u| u.id == message.user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| message.user_id.clone());
        let time = message
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string();

        let mut header = vec![Span::styled(
            format!("[{}] {}", time, sender),
            palette.base.fg(palette.accent).add_modifier(Modifier::BOLD),
        )];
        if is_own {
            header.push(status_span(message.status, palette));
        }
        lines.push(Line::from(header));

        if message.is_voice() {
            lines.push(voice_line(message, session, palette));
        } else {
            lines.extend(markup_lines(message.display_text(), palette));
        }
        lines.push(Line::from(""));
    }

    if state.active_chat.typing {
        lines.push(Line::from(Span::styled("...", palette.muted)));
    }

    // Estimate wrapped height so the newest message stays in view
    let total_rows: usize = lines
        .iter()
        .map(|line| {
            let plain: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
            wrap(&plain, wrap_width).len().max(1)
        })
        .sum();
    let scroll = total_rows.saturating_sub(visible_rows) as u16;

    let messages = Paragraph::new(Text::from(lines))
        .style(palette.base)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("Messages"));
    f.render_widget(messages, area);
}

fn status_span(status: MessageStatus, palette: &Palette) -> Span<'static> {
    match status {
        MessageStatus::Sending => Span::styled(" Sending", palette.muted),
        MessageStatus::Sent => Span::styled(" ✓", palette.muted),
        MessageStatus::Delivered => Span::styled(" ✓✓", palette.muted),
        MessageStatus::Read => Span::styled(" ✓✓", palette.base.fg(palette.accent)),
        MessageStatus::Failed => Span::styled(" Failed", palette.base.fg(Color::Red)),
    }
}

fn voice_line(message: &Message, session: &ChatSession, palette: &Palette) -> Line<'static> {
    let detail = message
        .audio_url
        .as_deref()
        .and_then(|handle| session.audio().resolve(handle))
        .map(|clip| format!(" ({} bytes, {})", clip.data.len(), clip.mime_type))
        .unwrap_or_else(|| " (audio unavailable)".to_string());

    Line::from(vec![
        Span::styled(message.text.clone(), palette.base),
        Span::styled(detail, palette.muted),
    ])
}

/// Turn formatter output into styled terminal lines. Only the tags the
/// formatter emits are understood; anything else is shown as text.
fn markup_lines(markup: &str, palette: &Palette) -> Vec<Line<'static>> {
    markup
        .split("<br />")
        .map(|segment| Line::from(markup_spans(segment, palette)))
        .collect()
}

fn markup_spans(segment: &str, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut state = MarkupState::default();
    let mut rest = segment;

    while let Some(pos) = rest.find('<') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match parse_tag(tail) {
            Some((len, kind, open)) => {
                if !text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut text), state.style(palette)));
                }
                state.set(kind, open);
                rest = &tail[len..];
            }
            None => {
                text.push('<');
                rest = &tail[1..];
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        spans.push(Span::styled(text, state.style(palette)));
    }
    spans
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Markup {
    Bold,
    Italic,
    Code,
    Link,
}

const SIMPLE_TAGS: [(&str, Markup, bool); 7] = [
    ("<strong>", Markup::Bold, true),
    ("</strong>", Markup::Bold, false),
    ("<em>", Markup::Italic, true),
    ("</em>", Markup::Italic, false),
    ("<code>", Markup::Code, true),
    ("</code>", Markup::Code, false),
    ("</a>", Markup::Link, false),
];

// Length of the tag at the start of `tail`, which markup it toggles and whether it opens
fn parse_tag(tail: &str) -> Option<(usize, Markup, bool)> {
    for (tag, kind, open) in SIMPLE_TAGS {
        if tail.starts_with(tag) {
            return Some((tag.len(), kind, open));
        }
    }
    if tail.starts_with("<a ") {
        let end = tail.find('>')?;
        return Some((end + 1, Markup::Link, true));
    }
    None
}

#[derive(Debug, Clone, Copy, Default)]
struct MarkupState {
    bold: bool,
    italic: bool,
    code: bool,
    link: bool,
}

impl MarkupState {
    fn set(&mut self, kind: Markup, on: bool) {
        match kind {
            Markup::Bold => self.bold = on,
            Markup::Italic => self.italic = on,
            Markup::Code => self.code = on,
            Markup::Link => self.link = on,
        }
    }

    fn style(&self, palette: &Palette) -> Style {
        let mut style = palette.base;
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.code {
            style = style.fg(palette.code);
        }
        if self.link {
            style = style.fg(palette.accent).add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}
