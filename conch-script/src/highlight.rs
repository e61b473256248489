//! Input syntax highlighting.
//!
//! Highlighters tokenize the live input line only, so a single combined
//! regex per language is enough. Spans are reported in char offsets
//! relative to the start of the highlighted text.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    String,
    Number,
    Comment,
    Operator,
    Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub len: usize,
    pub kind: TokenKind,
}

pub trait Highlighter {
    fn language(&self) -> &str;

    /// Tokens in order of appearance. Gaps between spans are plain text.
    fn highlight(&self, text: &str) -> Vec<TokenSpan>;
}

/// Looks up the highlighter for a language id (`"lua"`, `"shell"`).
pub fn highlighter_for(language: &str) -> Option<Box<dyn Highlighter>> {
    let lowered = language.to_lowercase();
    let (keywords, comment, strings): (&[&str], &str, &str) = match lowered.as_str() {
        "lua" => (LUA_KEYWORDS, r"--.*$", r#""(?:[^"\\]|\\.)*"?|'(?:[^'\\]|\\.)*'?|\[\[.*?(?:\]\]|$)"#),
        "shell" | "sh" => (SHELL_KEYWORDS, r"#.*$", r#""(?:[^"\\]|\\.)*"?|'[^']*'?"#),
        _ => return None,
    };
    RegexHighlighter::build(&lowered, keywords, comment, strings)
        .map(|h| Box::new(h) as Box<dyn Highlighter>)
}

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

const SHELL_KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "in", "function", "export", "cd", "pwd", "clear", "cls", "open", "edit",
];

struct RegexHighlighter {
    language: String,
    pattern: Regex,
    keywords: &'static [&'static str],
}

impl RegexHighlighter {
    fn build(
        language: &str,
        keywords: &'static [&'static str],
        comment: &str,
        strings: &str,
    ) -> Option<Self> {
        let source = format!(
            r"(?m)(?P<comment>{comment})|(?P<string>{strings})|(?P<number>\b(?:0[xX][0-9a-fA-F]+|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\b)|(?P<ident>[A-Za-z_$][A-Za-z0-9_]*)|(?P<op>[-+*/%^#=<>~&|;:.,(){{}}\[\]]+)"
        );
        match Regex::new(&source) {
            Ok(pattern) => Some(Self {
                language: language.to_string(),
                pattern,
                keywords,
            }),
            Err(e) => {
                tracing::error!(%language, error = %e, "highlighter pattern rejected");
                None
            }
        }
    }
}

impl Highlighter for RegexHighlighter {
    fn language(&self) -> &str {
        &self.language
    }

    fn highlight(&self, text: &str) -> Vec<TokenSpan> {
        let mut spans = Vec::new();
        // Byte offsets from the regex are converted incrementally.
        let mut byte_cursor = 0;
        let mut char_cursor = 0;

        for caps in self.pattern.captures_iter(text) {
            let (m, kind) = if let Some(m) = caps.name("comment") {
                (m, TokenKind::Comment)
            } else if let Some(m) = caps.name("string") {
                (m, TokenKind::String)
            } else if let Some(m) = caps.name("number") {
                (m, TokenKind::Number)
            } else if let Some(m) = caps.name("ident") {
                let kind = if self.keywords.contains(&m.as_str()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                (m, kind)
            } else if let Some(m) = caps.name("op") {
                (m, TokenKind::Operator)
            } else {
                continue;
            };

            char_cursor += text[byte_cursor..m.start()].chars().count();
            let len = m.as_str().chars().count();
            spans.push(TokenSpan {
                start: char_cursor,
                len,
                kind,
            });
            char_cursor += len;
            byte_cursor = m.end();
        }

        spans
    }
}
