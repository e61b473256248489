//! Theme system: maps style tags and highlight tokens to colors.

use std::collections::BTreeMap;

use conch_script::TokenKind;
use serde::{Deserialize, Serialize};

use crate::style::{Emphasis, Rgb, StyleTag, TextStyle};

// ════════════════════════════════════════════════════════════════════
// Theme names
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    Light,
    #[default]
    Dark,
}

impl ThemeName {
    pub fn all() -> &'static [ThemeName] {
        &[ThemeName::Light, ThemeName::Dark]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThemeName::Light => "Light",
            ThemeName::Dark => "Dark",
        }
    }

    pub fn from_name(s: &str) -> Option<ThemeName> {
        match s.trim().to_lowercase().as_str() {
            "light" | "default" => Some(ThemeName::Light),
            "dark" => Some(ThemeName::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> ThemeName {
        match self {
            ThemeName::Light => ThemeName::Dark,
            ThemeName::Dark => ThemeName::Light,
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Provider contract
// ════════════════════════════════════════════════════════════════════

/// Supplies colors for console styles. `None` means "host default
/// foreground".
pub trait ThemeProvider {
    fn color_for(&self, tag: StyleTag) -> Option<Rgb>;

    fn token_color(&self, token: TokenKind) -> Option<Rgb>;

    fn token_emphasis(&self, token: TokenKind) -> Emphasis {
        match token {
            TokenKind::Keyword => Emphasis::BOLD,
            TokenKind::Comment => Emphasis::ITALIC,
            _ => Emphasis::NONE,
        }
    }

    /// Recomputes the derived parts of `style` for this theme.
    fn resolve(&self, style: TextStyle) -> TextStyle {
        match style.token {
            Some(token) => TextStyle {
                color: self.token_color(token).or_else(|| self.color_for(style.tag)),
                emphasis: self.token_emphasis(token),
                ..style
            },
            None => TextStyle {
                color: self.color_for(style.tag),
                ..style
            },
        }
    }
}

struct Palette {
    prompt: Rgb,
    stdout: Rgb,
    stderr: Rgb,
    exception: Rgb,
    keyword: Rgb,
    string: Rgb,
    number: Rgb,
    comment: Rgb,
}

fn palette_for(name: ThemeName) -> Palette {
    match name {
        ThemeName::Light => Palette {
            prompt: Rgb::new(0, 192, 0),
            stdout: Rgb::new(0, 0, 255),
            stderr: Rgb::new(255, 0, 0),
            exception: Rgb::new(111, 49, 152),
            keyword: Rgb::new(0, 0, 160),
            string: Rgb::new(163, 21, 21),
            number: Rgb::new(9, 134, 88),
            comment: Rgb::new(0, 128, 0),
        },
        ThemeName::Dark => Palette {
            prompt: Rgb::new(0x30, 0xff, 0x2f),
            stdout: Rgb::new(0, 255, 255),
            stderr: Rgb::new(0xff, 0x80, 0x80),
            exception: Rgb::new(0xa0, 0x64, 0x9a),
            keyword: Rgb::new(86, 156, 214),
            string: Rgb::new(206, 145, 120),
            number: Rgb::new(181, 206, 168),
            comment: Rgb::new(106, 153, 85),
        },
    }
}

/// A named palette plus per-tag user overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Theme {
    name: ThemeName,
    overrides: BTreeMap<StyleTag, Rgb>,
}

impl Theme {
    pub fn new(name: ThemeName) -> Self {
        Self {
            name,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_overrides(name: ThemeName, overrides: BTreeMap<StyleTag, Rgb>) -> Self {
        Self { name, overrides }
    }

    pub fn name(&self) -> ThemeName {
        self.name
    }

    pub fn set_name(&mut self, name: ThemeName) {
        self.name = name;
    }

    pub fn set_override(&mut self, tag: StyleTag, color: Rgb) {
        self.overrides.insert(tag, color);
    }

    pub fn overrides(&self) -> &BTreeMap<StyleTag, Rgb> {
        &self.overrides
    }
}

impl ThemeProvider for Theme {
    fn color_for(&self, tag: StyleTag) -> Option<Rgb> {
        if let Some(color) = self.overrides.get(&tag) {
            return Some(*color);
        }
        let p = palette_for(self.name);
        match tag {
            StyleTag::Prompt => Some(p.prompt),
            StyleTag::Stdin => None,
            StyleTag::Stdout => Some(p.stdout),
            // Results share the stdout color unless overridden.
            StyleTag::Result => Some(self.overrides.get(&StyleTag::Stdout).copied().unwrap_or(p.stdout)),
            StyleTag::Stderr => Some(p.stderr),
            StyleTag::Exception => Some(p.exception),
        }
    }

    fn token_color(&self, token: TokenKind) -> Option<Rgb> {
        let p = palette_for(self.name);
        match token {
            TokenKind::Keyword => Some(p.keyword),
            TokenKind::String => Some(p.string),
            TokenKind::Number => Some(p.number),
            TokenKind::Comment => Some(p.comment),
            TokenKind::Operator | TokenKind::Identifier => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_follows_stdout_override() {
        let mut theme = Theme::new(ThemeName::Light);
        theme.set_override(StyleTag::Stdout, Rgb::new(1, 2, 3));
        assert_eq!(theme.color_for(StyleTag::Result), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn test_resolve_token_gets_emphasis() {
        let theme = Theme::new(ThemeName::Dark);
        let style = theme.resolve(TextStyle::token(TokenKind::Keyword));
        assert!(style.emphasis.bold);
        assert_eq!(style.color, Some(Rgb::new(86, 156, 214)));
    }
}
