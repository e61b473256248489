//! Semantic output channels and the concrete style a run is drawn with.

use conch_script::TokenKind;
use serde::{Deserialize, Serialize};

/// The semantic channel a piece of console text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
    Prompt,
    Stdin,
    Stdout,
    Stderr,
    Result,
    Exception,
}

impl StyleTag {
    pub fn all() -> &'static [StyleTag] {
        &[
            StyleTag::Prompt,
            StyleTag::Stdin,
            StyleTag::Stdout,
            StyleTag::Stderr,
            StyleTag::Result,
            StyleTag::Exception,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StyleTag::Prompt => "prompt",
            StyleTag::Stdin => "stdin",
            StyleTag::Stdout => "stdout",
            StyleTag::Stderr => "stderr",
            StyleTag::Result => "result",
            StyleTag::Exception => "exception",
        }
    }

    pub fn from_name(s: &str) -> Option<StyleTag> {
        StyleTag::all()
            .iter()
            .copied()
            .find(|tag| tag.name().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the `#` is optional).
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Emphasis {
    pub const NONE: Emphasis = Emphasis {
        bold: false,
        italic: false,
        underline: false,
    };
    pub const BOLD: Emphasis = Emphasis {
        bold: true,
        italic: false,
        underline: false,
    };
    pub const ITALIC: Emphasis = Emphasis {
        bold: false,
        italic: true,
        underline: false,
    };
}

/// The full style of one run in the buffer.
///
/// `color` is derived: the theme recomputes it from `(tag, token)` whenever
/// the theme changes, so two runs compare equal only when they would render
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub tag: StyleTag,
    pub token: Option<TokenKind>,
    pub color: Option<Rgb>,
    pub emphasis: Emphasis,
}

impl TextStyle {
    pub const fn new(tag: StyleTag) -> Self {
        Self {
            tag,
            token: None,
            color: None,
            emphasis: Emphasis::NONE,
        }
    }

    /// A highlighted piece of live input.
    pub const fn token(kind: TokenKind) -> Self {
        Self {
            tag: StyleTag::Stdin,
            token: Some(kind),
            color: None,
            emphasis: Emphasis::NONE,
        }
    }

    pub fn is_input(&self) -> bool {
        self.tag == StyleTag::Stdin
    }
}

impl From<StyleTag> for TextStyle {
    fn from(tag: StyleTag) -> Self {
        TextStyle::new(tag)
    }
}
