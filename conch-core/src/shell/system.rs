//! System shell: a line-oriented shell with a few in-process built-ins.
//! Everything that isn't a built-in runs through `sh -c` (`cmd.exe /c` on
//! Windows) in the shell's working directory.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::complete::{complete_path, is_path_char};
use super::{Shell, ShellConsole};
use crate::backend::{LaunchSpec, ProcessBackend};
use crate::console::Console;
use crate::editor::{EditOutcome, Rejection};
use crate::host::HostContext;
use crate::job::JobOutcome;
use crate::style::StyleTag;

pub const PROCESS_TERMINATED: &str = "Process forcibly terminated";

const BUILTINS: &[(&str, &str)] = &[
    ("cd <dir>", "Change directory (`-` previous, `~` home, `/` root)"),
    ("pwd", "Print the working directory"),
    ("cls, clear", "Clear the console"),
    ("open <file>, edit <file>", "Open a file in the editor"),
    ("$list", "List these built-in commands"),
];

// ════════════════════════════════════════════════════════════════════
// Command parsing
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `cd` with its single argument, quotes stripped. `None` on wrong arity.
    Cd(Option<String>),
    Clear,
    Open { verb: String, target: Option<String> },
    ListBuiltins,
    /// `true` when `pwd` was given extra arguments.
    Pwd { extra_args: bool },
    External(String),
}

impl ShellCommand {
    pub fn parse(input: &str) -> ShellCommand {
        let text = rewrite_windows_shortcuts(input.trim());
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text.as_str(), ""),
        };

        match head {
            "cd" => ShellCommand::Cd(single_argument(rest)),
            "cls" | "clear" => ShellCommand::Clear,
            "open" | "edit" => ShellCommand::Open {
                verb: head.to_string(),
                target: single_argument(rest),
            },
            "$list" => ShellCommand::ListBuiltins,
            "pwd" => ShellCommand::Pwd {
                extra_args: !rest.is_empty(),
            },
            _ => ShellCommand::External(text),
        }
    }
}

/// One bare word or one double-quoted string.
fn single_argument(rest: &str) -> Option<String> {
    if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
        return Some(rest[1..rest.len() - 1].to_string());
    }
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return None;
    }
    Some(rest.to_string())
}

/// `cd\dir` → `cd \dir` and a bare drive letter `D:` → `cd D:\`.
fn rewrite_windows_shortcuts(text: &str) -> String {
    if !cfg!(windows) {
        return text.to_string();
    }
    if let Some(rest) = text.strip_prefix("cd\\") {
        return format!("cd \\{rest}");
    }
    let bytes = text.as_bytes();
    let is_drive = (bytes.len() == 2 || (bytes.len() == 3 && bytes[2] == b'\\'))
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':';
    if is_drive {
        return format!("cd {}:\\", &text[..1]);
    }
    text.to_string()
}

// ════════════════════════════════════════════════════════════════════
// Shell
// ════════════════════════════════════════════════════════════════════

pub struct SystemShell {
    backend: ProcessBackend,
    host: Rc<dyn HostContext>,
    cwd: PathBuf,
    previous_dir: PathBuf,
}

impl std::fmt::Debug for SystemShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemShell")
            .field("cwd", &self.cwd)
            .field("previous_dir", &self.previous_dir)
            .finish_non_exhaustive()
    }
}

impl SystemShell {
    /// Starts in `start_dir`, falling back to the user's home.
    pub fn new(backend: ProcessBackend, host: Rc<dyn HostContext>, start_dir: Option<&Path>) -> Self {
        let cwd = start_dir
            .filter(|dir| dir.is_dir())
            .map(Path::to_path_buf)
            .or_else(home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            backend,
            host,
            previous_dir: cwd.clone(),
            cwd,
        }
    }

    pub fn console(
        console: Console,
        backend: ProcessBackend,
        host: Rc<dyn HostContext>,
        start_dir: Option<&Path>,
    ) -> ShellConsole {
        ShellConsole::new(console, Box::new(SystemShell::new(backend, host, start_dir)))
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn resolve(&self, target: &str) -> PathBuf {
        let path = Path::new(target);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    fn change_dir(&mut self, console: &mut Console, target: Option<String>) {
        let Some(target) = target else {
            console.append("cd: expected exactly one directory", StyleTag::Stderr);
            return;
        };

        let dir = match target.as_str() {
            "-" => self.previous_dir.clone(),
            "~" => match home_dir() {
                Some(home) => home,
                None => {
                    console.append("cd: cannot determine home directory", StyleTag::Stderr);
                    return;
                }
            },
            "/" | "\\" => root_dir(&self.cwd),
            other => self.resolve(&expand_tilde(other)),
        };

        if dir.is_dir() {
            match dir.canonicalize() {
                Ok(canonical) => {
                    self.previous_dir = std::mem::replace(&mut self.cwd, canonical);
                    tracing::debug!(cwd = %self.cwd.display(), "changed directory");
                }
                Err(e) => console.append(&format!("cd: {e}"), StyleTag::Exception),
            }
        } else if dir.exists() {
            console.append(&format!("cd: {target}: not a directory"), StyleTag::Stderr);
        } else {
            console.append(&format!("cd: {target}: no such directory"), StyleTag::Stderr);
        }
    }

    fn open(&self, console: &mut Console, verb: &str, target: Option<String>) {
        let Some(target) = target else {
            console.append(&format!("{verb}: expected exactly one file"), StyleTag::Stderr);
            return;
        };
        let path = self.resolve(&target);
        if path.is_file() {
            if let Err(e) = self.host.open_file(&path) {
                console.append(&format!("{verb}: {e:#}"), StyleTag::Stderr);
            }
        } else if path.exists() {
            console.append(&format!("{verb}: {target}: not a file"), StyleTag::Stderr);
        } else {
            console.append(&format!("{verb}: {target}: no such file"), StyleTag::Stderr);
        }
    }

    fn run_external(&mut self, console: &mut Console, text: &str) -> bool {
        if !self.cwd.is_dir() {
            console.append(
                &format!("Current directory no longer exists: {}", self.cwd.display()),
                StyleTag::Stderr,
            );
            return false;
        }
        let (program, flag) = if cfg!(windows) {
            ("cmd.exe", "/c")
        } else {
            ("/bin/sh", "-c")
        };
        let spec = LaunchSpec::new(program)
            .args([flag, text])
            .current_dir(&self.cwd);
        match console.start(&mut self.backend, spec) {
            Ok(_) => true,
            Err(e) => {
                console.append(&e.to_string(), StyleTag::Exception);
                false
            }
        }
    }
}

impl Shell for SystemShell {
    fn name(&self) -> String {
        "System".to_string()
    }

    fn language(&self) -> Option<&str> {
        Some("shell")
    }

    fn prompt(&self) -> String {
        let name = self
            .cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.cwd.display().to_string());
        let suffix = if cfg!(windows) { "> " } else { "$ " };
        format!("{name}{suffix}")
    }

    fn usage_note(&self) -> Option<String> {
        Some("System shell. Type $list for built-in commands; anything else runs in the OS shell.".to_string())
    }

    fn submit(&mut self, console: &mut Console, text: &str) {
        match ShellCommand::parse(text) {
            ShellCommand::Cd(target) => self.change_dir(console, target),
            ShellCommand::Clear => {
                console.clear();
                self.greet(console);
                return;
            }
            ShellCommand::Open { verb, target } => self.open(console, &verb, target),
            ShellCommand::ListBuiltins => {
                let listing: Vec<String> = BUILTINS
                    .iter()
                    .map(|(usage, help)| format!("  {usage:<26} {help}"))
                    .collect();
                console.append(&listing.join("\n"), StyleTag::Stdout);
            }
            ShellCommand::Pwd { extra_args: true } => {
                console.append("pwd: takes no arguments", StyleTag::Stderr);
            }
            ShellCommand::Pwd { extra_args: false } => {
                console.append(&self.cwd.display().to_string(), StyleTag::Stdout);
            }
            ShellCommand::External(command) => {
                if self.run_external(console, &command) {
                    return;
                }
            }
        }
        self.show_prompt(console);
    }

    fn finished(&mut self, console: &mut Console, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed { exit_code, .. } => {
                tracing::debug!(?exit_code, "shell command finished");
            }
            JobOutcome::Interrupted => console.append(PROCESS_TERMINATED, StyleTag::Exception),
            JobOutcome::Failed(e) => console.append(&e.to_string(), StyleTag::Exception),
        }
        self.show_prompt(console);
    }

    fn complete(&mut self, console: &mut Console) -> EditOutcome {
        let (editor, buffer) = console.editor_mut();
        let Some((offset, fragment)) = editor.fragment_before_caret(buffer, is_path_char) else {
            return EditOutcome::Rejected(Rejection::Protected);
        };
        let fragment = expand_tilde(&fragment);
        let Some(completion) = complete_path(&fragment, &self.cwd) else {
            return EditOutcome::Rejected(Rejection::NoMatches);
        };

        if let [only] = completion.candidates.as_slice() {
            let caret = editor.caret();
            let name_start = caret - completion.name_part.chars().count();
            let mut name = only.name.clone();
            if only.is_dir {
                name.push(std::path::MAIN_SEPARATOR);
            }
            let outcome = editor.replace_input_range(buffer, name_start.max(offset)..caret, &name);
            console.refresh_input_styles();
            return outcome;
        }

        let input = console.current_input().unwrap_or_default();
        let names: Vec<&str> = completion.candidates.iter().map(|c| c.name.as_str()).collect();
        console.append(&format!("\n{}", names.join(", ")), StyleTag::Stdout);
        self.show_prompt(console);
        console.append_raw(&input, StyleTag::Stdin);
        EditOutcome::Applied
    }
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Replaces a leading `~/` with the home directory.
fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

fn root_dir(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .last()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(std::path::MAIN_SEPARATOR_STR))
}
