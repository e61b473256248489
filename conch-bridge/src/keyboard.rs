//! Keyboard dispatch.
//!
//! Ctrl+C stops the focused console's job; it is never forwarded as a
//! character. F-keys drive the deck, digits run tools while the tool pane
//! has focus.

use conch_core::editor::Gesture;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Focus {
    #[default]
    Shells,
    Tools,
}

impl Focus {
    pub fn toggled(self) -> Focus {
        match self {
            Focus::Shells => Focus::Tools,
            Focus::Tools => Focus::Shells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forwarded to the primary console.
    Edit(Gesture),
    SwitchShell,
    ToggleFocus,
    ToggleTheme,
    Stop,
    Clear,
    ClearAll,
    /// Zero-based index into the configured tools.
    RunTool(usize),
    ScrollUp,
    ScrollDown,
    Quit,
}

// ────────────────────────────────────────────────────────────────
// Key → Action
// ────────────────────────────────────────────────────────────────

pub fn map_key(event: KeyEvent, focus: Focus) -> Option<Action> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let shift = event.modifiers.contains(KeyModifiers::SHIFT);

    // ── Global keys ──
    match event.code {
        KeyCode::Char('q') | KeyCode::Char('Q') if ctrl => return Some(Action::Quit),
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => return Some(Action::Stop),
        KeyCode::Char('l') | KeyCode::Char('L') if ctrl => return Some(Action::Clear),
        KeyCode::F(2) => return Some(Action::SwitchShell),
        KeyCode::F(3) => return Some(Action::ToggleFocus),
        KeyCode::F(4) => return Some(Action::ToggleTheme),
        KeyCode::F(5) => return Some(Action::ClearAll),
        KeyCode::PageUp => return Some(Action::ScrollUp),
        KeyCode::PageDown => return Some(Action::ScrollDown),
        _ => {}
    }

    match focus {
        Focus::Tools => tool_key(event.code),
        Focus::Shells => shell_key(event.code, ctrl, alt, shift),
    }
}

fn tool_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .map(|digit| Action::RunTool(digit as usize - 1)),
        KeyCode::Esc => Some(Action::ToggleFocus),
        _ => None,
    }
}

fn shell_key(code: KeyCode, ctrl: bool, alt: bool, shift: bool) -> Option<Action> {
    let gesture = match code {
        KeyCode::Enter => Gesture::Submit,
        // Terminals report Ctrl+Backspace as Ctrl+H or Ctrl+W depending on
        // the emulator.
        KeyCode::Backspace if ctrl || alt => Gesture::DeletePreviousWord,
        KeyCode::Char('h') | KeyCode::Char('w') if ctrl => Gesture::DeletePreviousWord,
        KeyCode::Backspace => Gesture::Backspace,
        KeyCode::Delete => Gesture::Delete,
        KeyCode::Home if shift => Gesture::ShiftHome,
        KeyCode::Home => Gesture::Home,
        KeyCode::End => Gesture::End,
        KeyCode::Left => Gesture::Left,
        KeyCode::Right => Gesture::Right,
        KeyCode::Up => Gesture::HistoryPrevious,
        KeyCode::Down => Gesture::HistoryNext,
        KeyCode::Tab => Gesture::Complete,
        KeyCode::Char('a') | KeyCode::Char('A') if ctrl => Gesture::SelectAll,
        KeyCode::Char(_) if ctrl || alt => return None,
        KeyCode::Char(c) => Gesture::Insert(c.to_string()),
        _ => return None,
    };
    Some(Action::Edit(gesture))
}

/// Bracketed paste becomes a single insert with normalized line endings.
pub fn paste_action(text: &str) -> Action {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    Action::Edit(Gesture::Insert(normalized))
}
