// conch-bridge/tests/app_tests.rs
//
// Action dispatch against a real deck (Lua + system shell) and tool pane.

use std::rc::Rc;

use conch_bridge::app::App;
use conch_bridge::keyboard::{Action, Focus};
use conch_core::backend::ProcessBackend;
use conch_core::config::ConsoleConfig;
use conch_core::console::Console;
use conch_core::editor::Gesture;
use conch_core::host::{DetachedHost, HostContext};
use conch_core::shell::{ScriptShell, SystemShell};
use conch_core::theme::ThemeName;
use conch_core::tool::Tool;
use conch_core::{ConsoleDeck, ToolConsole};
use conch_script::{InterpreterProvider, InterpreterRegistry};

struct Fixture {
    _runtime: tokio::runtime::Runtime,
    _dir: tempfile::TempDir,
    app: App,
}

fn fixture(tools: Vec<Tool>) -> Fixture {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = ConsoleConfig::default();
    let host: Rc<dyn HostContext> = Rc::new(DetachedHost::new("Conch", "1.0"));
    let provider: Rc<dyn InterpreterProvider> = Rc::new(InterpreterRegistry::with_defaults());

    let mut deck = ConsoleDeck::new();
    deck.push(ScriptShell::console(
        Console::new(&config),
        provider,
        "lua",
        host.clone(),
    ));
    deck.push(SystemShell::console(
        Console::new(&config),
        ProcessBackend::new(runtime.handle().clone()),
        host.clone(),
        Some(dir.path()),
    ));
    let tool_console = ToolConsole::new(
        &config,
        ProcessBackend::new(runtime.handle().clone()),
        host,
    );
    let app = App::new(deck, tool_console, tools, config.theme());
    Fixture {
        _runtime: runtime,
        _dir: dir,
        app,
    }
}

fn type_line(app: &mut App, text: &str) {
    app.handle(Action::Edit(Gesture::Insert(text.to_string())));
    app.handle(Action::Edit(Gesture::Submit));
}

fn primary_text(app: &App) -> String {
    app.deck().primary().unwrap().console().buffer().text()
}

// ============================================================================
// Editing
// ============================================================================

#[test]
fn test_typed_line_is_evaluated() {
    let mut f = fixture(Vec::new());
    type_line(&mut f.app, "1 + 2");
    assert!(primary_text(&f.app).ends_with("3\nLUA> "));
    assert!(!f.app.take_bell());
}

#[test]
fn test_rejected_gesture_rings_bell_once() {
    let mut f = fixture(Vec::new());
    f.app.handle(Action::Edit(Gesture::Backspace));
    assert!(f.app.take_bell());
    assert!(!f.app.take_bell());
}

#[test]
fn test_edits_ignored_while_tool_pane_focused() {
    let mut f = fixture(Vec::new());
    f.app.handle(Action::ToggleFocus);
    assert_eq!(f.app.focus(), Focus::Tools);

    f.app.handle(Action::Edit(Gesture::Insert("x".into())));
    assert_eq!(
        f.app.deck().primary().unwrap().console().current_input(),
        Some(String::new())
    );
}

#[test]
fn test_frame_signature_tracks_input() {
    let mut f = fixture(Vec::new());
    let before = f.app.frame_signature();
    f.app.handle(Action::Edit(Gesture::Insert("x".into())));
    assert_ne!(f.app.frame_signature(), before);
}

#[test]
fn test_frame_signature_tracks_same_length_history_recall() {
    let mut f = fixture(Vec::new());
    type_line(&mut f.app, "a1");
    type_line(&mut f.app, "b2");

    f.app.handle(Action::Edit(Gesture::HistoryPrevious));
    let newest = f.app.frame_signature();
    f.app.handle(Action::Edit(Gesture::HistoryPrevious));

    let console = f.app.deck().primary().unwrap().console();
    assert_eq!(console.current_input(), Some("a1".to_string()));
    assert_ne!(f.app.frame_signature(), newest);
}

// ============================================================================
// Deck Commands
// ============================================================================

#[test]
fn test_switch_shell_changes_status_tabs() {
    let mut f = fixture(Vec::new());
    assert!(f.app.status_line().starts_with("[Lua]"));
    f.app.handle(Action::SwitchShell);
    assert_eq!(f.app.deck().primary_index(), 1);
    assert!(f.app.status_line().starts_with(" Lua  [System]"));
}

#[test]
fn test_toggle_theme_reaches_every_console() {
    let mut f = fixture(Vec::new());
    assert_eq!(f.app.theme().name(), ThemeName::Dark);
    f.app.handle(Action::ToggleTheme);

    assert_eq!(f.app.theme().name(), ThemeName::Light);
    for i in 0..f.app.deck().len() {
        assert_eq!(
            f.app.deck().get(i).unwrap().console().theme().name(),
            ThemeName::Light
        );
    }
    assert_eq!(f.app.tools().console().theme().name(), ThemeName::Light);
}

#[test]
fn test_clear_regreets_primary() {
    let mut f = fixture(Vec::new());
    type_line(&mut f.app, "x = 1");
    f.app.handle(Action::Clear);
    let text = primary_text(&f.app);
    assert!(text.starts_with("Lua shell."));
    assert!(!text.contains("x = 1"));
}

#[test]
fn test_stop_with_nothing_running_rings_bell() {
    let mut f = fixture(Vec::new());
    f.app.handle(Action::Stop);
    assert!(f.app.take_bell());
}

#[test]
fn test_scroll_clamps_at_bottom() {
    let mut f = fixture(Vec::new());
    f.app.handle(Action::ScrollUp);
    assert!(f.app.scroll() > 0);
    f.app.handle(Action::ScrollDown);
    f.app.handle(Action::ScrollDown);
    assert_eq!(f.app.scroll(), 0);
}

#[test]
fn test_quit() {
    let mut f = fixture(Vec::new());
    assert!(!f.app.should_quit());
    f.app.handle(Action::Quit);
    assert!(f.app.should_quit());
}

// ============================================================================
// Tool Pane
// ============================================================================

#[test]
fn test_tool_menu_lists_configured_tools() {
    let tools = vec![
        Tool::new("build", "cargo"),
        Tool {
            description: "Format the file".into(),
            ..Tool::new("fmt", "rustfmt")
        },
    ];
    let f = fixture(tools);
    assert_eq!(
        f.app.tool_menu(),
        vec!["1  build".to_string(), "2  fmt - Format the file".to_string()]
    );
    assert_eq!(f.app.tool_title(), "  Tool Output");
}

#[test]
fn test_empty_tool_menu() {
    let f = fixture(Vec::new());
    assert_eq!(f.app.tool_menu(), vec!["No tools configured.".to_string()]);
}

#[test]
fn test_unbound_tool_number_sets_status() {
    let mut f = fixture(Vec::new());
    f.app.handle(Action::RunTool(2));
    assert_eq!(f.app.status(), Some("No tool bound to 3"));
    assert!(f.app.take_bell());
    assert!(f.app.status_line().ends_with("No tool bound to 3"));
}

#[test]
fn test_rejected_tool_reports_reason() {
    let mut f = fixture(vec![Tool::new("ghost", "/no/such/program")]);
    f.app.handle(Action::RunTool(0));
    let status = f.app.status().unwrap().to_string();
    assert!(status.starts_with("Cannot run ghost: "));
    assert!(!f.app.tools().is_running());
    assert!(f.app.take_bell());

    f.app.handle(Action::ToggleFocus);
    assert_eq!(f.app.status(), None);
}

#[cfg(unix)]
#[test]
fn test_tool_runs_and_finishes() {
    use std::time::Duration;

    let tool = Tool::new("greet", "/bin/sh").with_args(["-c", "echo hi"]);
    let mut f = fixture(vec![tool]);
    f.app.handle(Action::RunTool(0));
    assert!(f.app.tools().title().starts_with("Running greet"));

    let mut finished = 0;
    for _ in 0..500 {
        finished += f.app.pump();
        if finished > 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(finished, 1);
    assert!(f.app.tools().title().starts_with("greet completed with exit code 0"));
    assert_eq!(f.app.tools().console().buffer().text(), "hi\n");
}
