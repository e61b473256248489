use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use conch_bridge::app::{self, App};
use conch_bridge::util;
use conch_core::backend::ProcessBackend;
use conch_core::config::ConsoleConfig;
use conch_core::console::Console;
use conch_core::host::{DetachedHost, DocumentInfo, HostContext};
use conch_core::shell::{ScriptShell, SystemShell};
use conch_core::{ConsoleDeck, ToolConsole};
use conch_script::{InterpreterProvider, InterpreterRegistry};
use tracing::info;

/// `conch [FILE]`: FILE becomes the active document for `document` bindings
/// and tool variables.
fn main() -> Result<()> {
    let log = util::init_tracing();
    util::install_panic_hook();

    let config = ConsoleConfig::load().context("loading console configuration")?;
    info!(log = ?log, language = %config.script_language, tools = config.tools.len(), "conch starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("conch-io")
        .enable_all()
        .build()
        .context("building the tokio runtime")?;

    let host = Rc::new(DetachedHost::new("Conch", env!("CARGO_PKG_VERSION")));
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        host.set_document(Some(load_document(&path)?));
    }
    let host: Rc<dyn HostContext> = host;
    let provider: Rc<dyn InterpreterProvider> = Rc::new(InterpreterRegistry::with_defaults());

    let mut deck = ConsoleDeck::new();
    deck.push(ScriptShell::console(
        Console::new(&config),
        provider,
        &config.script_language,
        host.clone(),
    ));
    deck.push(SystemShell::console(
        Console::new(&config),
        ProcessBackend::new(runtime.handle().clone()),
        host.clone(),
        config.start_directory.as_deref(),
    ));

    let tools = ToolConsole::new(&config, ProcessBackend::new(runtime.handle().clone()), host);
    let app = App::new(deck, tools, config.tools.clone(), config.theme());
    app::run(app)
}

fn load_document(path: &Path) -> Result<DocumentInfo> {
    let path = path
        .canonicalize()
        .with_context(|| format!("resolving {}", path.display()))?;
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(DocumentInfo {
        path,
        text,
        caret: 0,
    })
}
