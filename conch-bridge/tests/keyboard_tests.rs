// conch-bridge/tests/keyboard_tests.rs
//
// Key dispatch: crossterm key events to console gestures and app actions.

use conch_bridge::keyboard::{Action, Focus, map_key, paste_action};
use conch_core::editor::Gesture;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent::new(code, modifiers)
}

fn shell(event: KeyEvent) -> Option<Action> {
    map_key(event, Focus::Shells)
}

fn edit(gesture: Gesture) -> Option<Action> {
    Some(Action::Edit(gesture))
}

// ============================================================================
// Editing Keys
// ============================================================================

#[test]
fn test_printable_characters_insert() {
    assert_eq!(shell(key(KeyCode::Char('x'))), edit(Gesture::Insert("x".into())));
    assert_eq!(
        shell(with(KeyCode::Char('X'), KeyModifiers::SHIFT)),
        edit(Gesture::Insert("X".into()))
    );
}

#[test]
fn test_enter_submits() {
    assert_eq!(shell(key(KeyCode::Enter)), edit(Gesture::Submit));
}

#[test]
fn test_deletion_keys() {
    assert_eq!(shell(key(KeyCode::Backspace)), edit(Gesture::Backspace));
    assert_eq!(shell(key(KeyCode::Delete)), edit(Gesture::Delete));
    assert_eq!(
        shell(with(KeyCode::Backspace, KeyModifiers::CONTROL)),
        edit(Gesture::DeletePreviousWord)
    );
    assert_eq!(
        shell(with(KeyCode::Char('w'), KeyModifiers::CONTROL)),
        edit(Gesture::DeletePreviousWord)
    );
    assert_eq!(
        shell(with(KeyCode::Char('h'), KeyModifiers::CONTROL)),
        edit(Gesture::DeletePreviousWord)
    );
}

#[test]
fn test_navigation_keys() {
    assert_eq!(shell(key(KeyCode::Home)), edit(Gesture::Home));
    assert_eq!(
        shell(with(KeyCode::Home, KeyModifiers::SHIFT)),
        edit(Gesture::ShiftHome)
    );
    assert_eq!(shell(key(KeyCode::End)), edit(Gesture::End));
    assert_eq!(shell(key(KeyCode::Left)), edit(Gesture::Left));
    assert_eq!(shell(key(KeyCode::Right)), edit(Gesture::Right));
    assert_eq!(
        shell(with(KeyCode::Char('a'), KeyModifiers::CONTROL)),
        edit(Gesture::SelectAll)
    );
}

#[test]
fn test_history_and_completion_keys() {
    assert_eq!(shell(key(KeyCode::Up)), edit(Gesture::HistoryPrevious));
    assert_eq!(shell(key(KeyCode::Down)), edit(Gesture::HistoryNext));
    assert_eq!(shell(key(KeyCode::Tab)), edit(Gesture::Complete));
}

#[test]
fn test_unbound_control_chords_are_ignored() {
    assert_eq!(shell(with(KeyCode::Char('z'), KeyModifiers::CONTROL)), None);
    assert_eq!(shell(with(KeyCode::Char('x'), KeyModifiers::ALT)), None);
    assert_eq!(shell(key(KeyCode::Insert)), None);
}

#[test]
fn test_key_release_is_ignored() {
    let mut event = key(KeyCode::Char('x'));
    event.kind = KeyEventKind::Release;
    assert_eq!(shell(event), None);
}

// ============================================================================
// Global Keys
// ============================================================================

#[test]
fn test_ctrl_c_stops_instead_of_inserting() {
    assert_eq!(
        shell(with(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        Some(Action::Stop)
    );
    assert_eq!(
        map_key(with(KeyCode::Char('c'), KeyModifiers::CONTROL), Focus::Tools),
        Some(Action::Stop)
    );
}

#[test]
fn test_function_keys() {
    assert_eq!(shell(key(KeyCode::F(2))), Some(Action::SwitchShell));
    assert_eq!(shell(key(KeyCode::F(3))), Some(Action::ToggleFocus));
    assert_eq!(shell(key(KeyCode::F(4))), Some(Action::ToggleTheme));
    assert_eq!(shell(key(KeyCode::F(5))), Some(Action::ClearAll));
}

#[test]
fn test_clear_quit_and_scroll() {
    assert_eq!(
        shell(with(KeyCode::Char('l'), KeyModifiers::CONTROL)),
        Some(Action::Clear)
    );
    assert_eq!(
        shell(with(KeyCode::Char('q'), KeyModifiers::CONTROL)),
        Some(Action::Quit)
    );
    assert_eq!(shell(key(KeyCode::PageUp)), Some(Action::ScrollUp));
    assert_eq!(shell(key(KeyCode::PageDown)), Some(Action::ScrollDown));
}

// ============================================================================
// Tool Pane Keys
// ============================================================================

#[test]
fn test_digits_run_tools_when_tool_pane_focused() {
    assert_eq!(
        map_key(key(KeyCode::Char('1')), Focus::Tools),
        Some(Action::RunTool(0))
    );
    assert_eq!(
        map_key(key(KeyCode::Char('9')), Focus::Tools),
        Some(Action::RunTool(8))
    );
    assert_eq!(map_key(key(KeyCode::Char('0')), Focus::Tools), None);
    assert_eq!(shell(key(KeyCode::Char('1'))), edit(Gesture::Insert("1".into())));
}

#[test]
fn test_escape_leaves_tool_pane() {
    assert_eq!(
        map_key(key(KeyCode::Esc), Focus::Tools),
        Some(Action::ToggleFocus)
    );
    assert_eq!(map_key(key(KeyCode::Enter), Focus::Tools), None);
    assert_eq!(Focus::Tools.toggled(), Focus::Shells);
}

// ============================================================================
// Paste
// ============================================================================

#[test]
fn test_paste_normalizes_line_endings() {
    assert_eq!(
        paste_action("a\r\nb\rc"),
        Action::Edit(Gesture::Insert("a\nb\nc".into()))
    );
}
