//! External tool definitions run by the tool-output console.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::backend::LaunchSpec;
use crate::host::DocumentInfo;

/// A configured external program. String fields may reference the active
/// document through `${file_name}`, `${file_name_no_ext}`, `${file_dir}` and
/// `${file_full_path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_append_env")]
    pub append_env: bool,
}

fn default_append_env() -> bool {
    true
}

impl Tool {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: BTreeMap::new(),
            append_env: true,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Launch parameters with document variables substituted. Without an
    /// active document every variable expands to an empty string.
    pub fn launch_spec(&self, document: Option<&DocumentInfo>) -> LaunchSpec {
        let vars = FileVariables::new(document);
        let mut spec = LaunchSpec::new(vars.expand(&self.program))
            .args(self.args.iter().map(|a| vars.expand(a)))
            .append_env(self.append_env);
        if let Some(dir) = &self.dir {
            spec = spec.current_dir(PathBuf::from(vars.expand(dir)));
        }
        for (key, value) in &self.env {
            spec = spec.env(key.clone(), vars.expand(value));
        }
        spec
    }
}

#[derive(Debug, Default)]
struct FileVariables {
    name: String,
    stem: String,
    dir: String,
    full_path: String,
}

static VARIABLE_REGEX: OnceLock<Regex> = OnceLock::new();

fn variable_regex() -> &'static Regex {
    VARIABLE_REGEX.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("Invalid variable regex"))
}

impl FileVariables {
    fn new(document: Option<&DocumentInfo>) -> Self {
        let Some(doc) = document else {
            return Self::default();
        };
        let path = &doc.path;
        Self {
            name: doc.file_name(),
            stem: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            dir: path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            full_path: path.to_string_lossy().into_owned(),
        }
    }

    fn lookup(&self, var: &str) -> Option<&str> {
        match var {
            "file_name" => Some(&self.name),
            "file_name_no_ext" => Some(&self.stem),
            "file_dir" => Some(&self.dir),
            "file_full_path" => Some(&self.full_path),
            _ => None,
        }
    }

    /// Unknown variables are left as written.
    fn expand(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        variable_regex()
            .replace_all(text, |caps: &Captures| {
                self.lookup(&caps[1])
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
