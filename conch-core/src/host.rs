//! The editor-side context a console runs in.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use conch_script::Binding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub name: String,
    pub version: String,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub text: String,
    pub caret: usize,
}

impl DocumentInfo {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What consoles consume from the surrounding application.
pub trait HostContext {
    fn application(&self) -> HostInfo;

    fn active_document(&self) -> Option<DocumentInfo>;

    /// Opens `path` in the host's editor.
    fn open_file(&self, path: &Path) -> Result<()>;
}

impl From<&HostInfo> for Binding {
    fn from(info: &HostInfo) -> Self {
        Binding::table([
            ("name", Binding::from(info.name.as_str())),
            ("version", Binding::from(info.version.as_str())),
            (
                "working_dir",
                Binding::from(info.working_dir.to_string_lossy().into_owned()),
            ),
        ])
    }
}

impl From<&DocumentInfo> for Binding {
    fn from(doc: &DocumentInfo) -> Self {
        Binding::table([
            ("path", Binding::from(doc.path.to_string_lossy().into_owned())),
            ("file_name", Binding::from(doc.file_name())),
            ("text", Binding::from(doc.text.as_str())),
            ("caret", Binding::from(doc.caret)),
        ])
    }
}

/// A host with no editor attached: fixed application info, an optional
/// document set by the embedder, and an open log instead of an editor.
#[derive(Debug)]
pub struct DetachedHost {
    info: HostInfo,
    document: RefCell<Option<DocumentInfo>>,
    opened: RefCell<Vec<PathBuf>>,
}

impl DetachedHost {
    pub fn new(name: &str, version: &str) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            info: HostInfo {
                name: name.to_string(),
                version: version.to_string(),
                working_dir,
            },
            document: RefCell::new(None),
            opened: RefCell::new(Vec::new()),
        }
    }

    pub fn set_document(&self, document: Option<DocumentInfo>) {
        *self.document.borrow_mut() = document;
    }

    /// Files passed to `open_file`, oldest first.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl HostContext for DetachedHost {
    fn application(&self) -> HostInfo {
        self.info.clone()
    }

    fn active_document(&self) -> Option<DocumentInfo> {
        self.document.borrow().clone()
    }

    fn open_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            bail!("{} is not a file", path.display());
        }
        tracing::info!(path = %path.display(), "open requested");
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
