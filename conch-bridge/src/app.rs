//! The host application: a deck of shell consoles above a tool-output pane,
//! driven by a crossterm event loop on the main thread.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use conch_core::buffer::ConsoleBuffer;
use conch_core::editor::EditOutcome;
use conch_core::theme::Theme;
use conch_core::tool::Tool;
use conch_core::{ConsoleDeck, ToolConsole};
use crossterm::event::{self, EnableBracketedPaste, Event};
use crossterm::terminal::{self, EnterAlternateScreen};
use crossterm::{cursor, execute, queue};
use tracing::{debug, info, warn};

use crate::keyboard::{self, Action, Focus};
use crate::renderer::{self, Area};
use crate::util;

const POLL_INTERVAL: Duration = Duration::from_millis(30);
const SCROLL_STEP: usize = 10;

pub struct App {
    deck: ConsoleDeck,
    tools: ToolConsole,
    tool_list: Vec<Tool>,
    theme: Theme,
    focus: Focus,
    scroll: usize,
    status: Option<String>,
    bell: bool,
    quit: bool,
}

impl App {
    pub fn new(deck: ConsoleDeck, tools: ToolConsole, tool_list: Vec<Tool>, theme: Theme) -> Self {
        Self {
            deck,
            tools,
            tool_list,
            theme,
            focus: Focus::default(),
            scroll: 0,
            status: None,
            bell: false,
            quit: false,
        }
    }

    pub fn deck(&self) -> &ConsoleDeck {
        &self.deck
    }

    pub fn tools(&self) -> &ToolConsole {
        &self.tools
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// True once after a rejected gesture or command.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    // ────────────────────────────────────────────────────────────────
    // Dispatch
    // ────────────────────────────────────────────────────────────────

    pub fn handle(&mut self, action: Action) {
        self.status = None;
        match action {
            Action::Edit(gesture) => {
                if self.focus == Focus::Tools {
                    return;
                }
                match self.deck.gesture(gesture) {
                    Some(EditOutcome::Rejected(reason)) => {
                        debug!(?reason, "gesture rejected");
                        self.bell = true;
                    }
                    Some(_) => self.scroll = 0,
                    None => {}
                }
            }
            Action::SwitchShell => {
                let index = self.deck.switch();
                self.scroll = 0;
                debug!(index, "primary console switched");
            }
            Action::ToggleFocus => self.focus = self.focus.toggled(),
            Action::ToggleTheme => {
                self.theme.set_name(self.theme.name().toggled());
                self.deck.apply_theme(&self.theme);
                self.tools.apply_theme(self.theme.clone());
                info!(theme = self.theme.name().label(), "theme changed");
            }
            Action::Stop => {
                let stopped = match self.focus {
                    Focus::Shells => self.deck.primary_mut().is_some_and(|c| c.stop()),
                    Focus::Tools => self.tools.stop(),
                };
                if !stopped {
                    self.bell = true;
                }
            }
            Action::Clear => match self.deck.primary_mut() {
                Some(console) if self.focus == Focus::Shells => {
                    console.clear();
                    self.scroll = 0;
                }
                _ => self.bell = true,
            },
            Action::ClearAll => {
                self.deck.clear_all();
                self.scroll = 0;
            }
            Action::RunTool(index) => self.run_tool(index),
            Action::ScrollUp => self.scroll += SCROLL_STEP,
            Action::ScrollDown => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            Action::Quit => self.quit = true,
        }
    }

    fn run_tool(&mut self, index: usize) {
        let Some(tool) = self.tool_list.get(index) else {
            self.status = Some(format!("No tool bound to {}", index + 1));
            self.bell = true;
            return;
        };
        match self.tools.run_tool(tool) {
            Ok(job) => info!(tool = %tool.name, %job, "tool started"),
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "tool rejected");
                self.status = Some(format!("Cannot run {}: {e}", tool.name));
                self.bell = true;
            }
        }
    }

    /// Drains every console's queue. Returns how many jobs finished.
    pub fn pump(&mut self) -> usize {
        self.deck.pump_all() + self.tools.pump()
    }

    // ────────────────────────────────────────────────────────────────
    // Presentation
    // ────────────────────────────────────────────────────────────────

    pub fn status_line(&self) -> String {
        let tabs = renderer::tab_strip(&self.deck.names(), self.deck.primary_index());
        let hint = match self.focus {
            Focus::Shells => "F2 switch  F3 tools  F4 theme  Ctrl+C stop  Ctrl+Q quit",
            Focus::Tools => "1-9 run tool  Esc back  Ctrl+C stop  Ctrl+Q quit",
        };
        match &self.status {
            Some(message) => format!("{tabs} | {message}"),
            None => format!("{tabs} | {hint}"),
        }
    }

    pub fn tool_title(&self) -> String {
        let marker = if self.focus == Focus::Tools { "*" } else { " " };
        format!("{marker} {}", self.tools.title())
    }

    /// Lines shown in an idle, empty tool pane.
    pub fn tool_menu(&self) -> Vec<String> {
        if self.tool_list.is_empty() {
            return vec!["No tools configured.".to_string()];
        }
        self.tool_list
            .iter()
            .take(9)
            .enumerate()
            .map(|(i, tool)| {
                if tool.description.is_empty() {
                    format!("{}  {}", i + 1, tool.name)
                } else {
                    format!("{}  {} - {}", i + 1, tool.name, tool.description)
                }
            })
            .collect()
    }

    /// Fingerprint of everything on screen. Buffer text is hashed in full:
    /// a same-length history recall or a trim at the line cap keeps every
    /// count unchanged.
    pub fn frame_signature(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.deck.primary_index().hash(&mut h);
        if let Some(primary) = self.deck.primary() {
            let console = primary.console();
            hash_buffer(console.buffer(), &mut h);
            console.editor().selection().hash(&mut h);
        }
        hash_buffer(self.tools.console().buffer(), &mut h);
        self.tools.title().hash(&mut h);
        self.status.hash(&mut h);
        self.focus.hash(&mut h);
        self.scroll.hash(&mut h);
        self.theme.name().label().hash(&mut h);
        h.finish()
    }

    fn draw<W: Write>(&self, out: &mut W, width: u16, height: u16) -> Result<()> {
        // Shell pane, tool title bar, tool pane, status bar.
        let tool_height = (height / 3).max(3).min(height.saturating_sub(4));
        let shell_height = height.saturating_sub(tool_height + 2);

        let mut caret = None;
        if let Some(primary) = self.deck.primary() {
            let console = primary.console();
            let editor = console.editor();
            let layout = renderer::layout(
                console.buffer(),
                width as usize,
                Some(editor.caret()),
                Some(editor.selection()),
            );
            let area = Area {
                top: 0,
                height: shell_height,
                width,
            };
            caret = renderer::draw_layout(out, &layout, area, self.scroll)?;
        }

        renderer::draw_bar(out, shell_height, width, &self.tool_title())?;
        let tool_area = Area {
            top: shell_height + 1,
            height: tool_height,
            width,
        };
        let tool_buffer = self.tools.console().buffer();
        if tool_buffer.is_empty() && !self.tools.is_running() {
            let menu = self.tool_menu();
            for line in 0..tool_height {
                let text = menu.get(line as usize).map(String::as_str).unwrap_or("");
                queue!(out, cursor::MoveTo(0, tool_area.top + line))?;
                write!(out, "{}", renderer::fit(text, width as usize))?;
            }
        } else {
            let layout = renderer::layout(tool_buffer, width as usize, None, None);
            renderer::draw_layout(out, &layout, tool_area, 0)?;
        }

        renderer::draw_bar(out, height.saturating_sub(1), width, &self.status_line())?;

        match (self.focus, caret) {
            (Focus::Shells, Some((col, row))) => queue!(out, cursor::MoveTo(col, row), cursor::Show)?,
            _ => queue!(out, cursor::Hide)?,
        }
        out.flush()?;
        Ok(())
    }
}

fn hash_buffer(buffer: &ConsoleBuffer, h: &mut DefaultHasher) {
    buffer.runs().len().hash(h);
    for run in buffer.runs() {
        run.text().hash(h);
        run.style().tag.hash(h);
    }
}

// ════════════════════════════════════════════════════════════════════
// Event loop
// ════════════════════════════════════════════════════════════════════

/// Takes over the terminal until the user quits.
pub fn run(mut app: App) -> Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode().context("enabling raw mode")?;
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("entering the alternate screen")?;

    let result = event_loop(&mut app, &mut stdout);
    util::restore_terminal();
    result
}

fn event_loop<W: Write>(app: &mut App, out: &mut W) -> Result<()> {
    let mut last_frame = None;
    let mut resized = true;

    while !app.should_quit() {
        if event::poll(POLL_INTERVAL).context("polling terminal events")? {
            match event::read().context("reading terminal event")? {
                Event::Key(key) => {
                    if let Some(action) = keyboard::map_key(key, app.focus()) {
                        app.handle(action);
                    }
                }
                Event::Paste(text) => app.handle(keyboard::paste_action(&text)),
                Event::Resize(..) => resized = true,
                _ => {}
            }
        }

        let finished = app.pump();
        if finished > 0 {
            debug!(finished, "jobs retired");
        }

        if app.take_bell() {
            write!(out, "\x07")?;
        }

        let signature = app.frame_signature();
        if resized || last_frame != Some(signature) {
            let (width, height) = terminal::size().context("querying terminal size")?;
            app.draw(out, width, height)?;
            last_frame = Some(signature);
            resized = false;
        }
    }

    info!("conch exiting");
    Ok(())
}
