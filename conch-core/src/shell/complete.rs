//! File name completion for the system shell.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The part of the fragment after its last separator; this is what a
    /// single match replaces.
    pub name_part: String,
    pub candidates: Vec<Candidate>,
}

/// Characters that may appear in a completable path fragment.
pub fn is_path_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(c, '-' | '_' | '/' | '.' | '~')
        || (cfg!(windows) && matches!(c, '\\' | ':'))
}

fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

/// Lists entries of the fragment's directory whose names start with the
/// fragment's last component. Hidden entries are skipped unless the
/// component itself starts with a dot.
pub fn complete_path(fragment: &str, cwd: &Path) -> Option<Completion> {
    let (dir_part, name_part) = match fragment.rfind(is_separator) {
        Some(i) => (&fragment[..=i], &fragment[i + 1..]),
        None => ("", fragment),
    };

    let search_dir: PathBuf = if dir_part.is_empty() {
        cwd.to_path_buf()
    } else {
        let dir = Path::new(dir_part);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            cwd.join(dir)
        }
    };

    let entries = std::fs::read_dir(&search_dir).ok()?;
    let fold = |s: &str| {
        if cfg!(windows) {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    };
    let wanted = fold(name_part);

    let mut candidates: Vec<Candidate> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && !name_part.starts_with('.') {
                return None;
            }
            if !fold(&name).starts_with(&wanted) {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some(Candidate { name, is_dir })
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    Some(Completion {
        name_part: name_part.to_string(),
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src").join("main.rs"), "").unwrap();
        std::fs::write(dir.path().join("src").join("lib.rs"), "").unwrap();

        let completion = complete_path("src/ma", dir.path()).unwrap();
        assert_eq!(completion.name_part, "ma");
        assert_eq!(completion.candidates.len(), 1);
        assert_eq!(completion.candidates[0].name, "main.rs");
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::write(dir.path().join("visible"), "").unwrap();

        let completion = complete_path("", dir.path()).unwrap();
        let names: Vec<_> = completion.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["visible"]);
    }

    #[test]
    fn test_no_match() {
        let dir = tempfile::tempdir().unwrap();
        assert!(complete_path("zzz", dir.path()).is_none());
    }
}
