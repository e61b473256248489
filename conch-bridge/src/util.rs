use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crossterm::event::DisableBracketedPaste;
use crossterm::execute;
use crossterm::terminal::{self, LeaveAlternateScreen};
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

pub const LOG_FILENAME: &str = "conch.log";

/// `<cache dir>/conch/conch.log`, or `None` without a home directory.
pub fn log_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "conch").map(|dirs| dirs.cache_dir().join(LOG_FILENAME))
}

/// Logs go to a file: the terminal belongs to the UI.
pub fn init_tracing() -> Option<PathBuf> {
    // RUST_LOG=conch_core=debug,conch_bridge=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let path = log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = File::create(&path).ok()?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .compact()
        .try_init();
    Some(path)
}

/// Leaves raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
}

pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();

        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());

        tracing::error!(%location, %payload, "panic");
        default_hook(info);
    }));
}
