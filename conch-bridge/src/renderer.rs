//! Console renderer: lays a buffer's styled runs out into terminal rows and
//! draws them with crossterm.
//!
//! Layout is a pure function of the buffer, the pane width, the caret and
//! the selection, so it can be tested without a terminal.

use std::io::{self, Write};
use std::ops::Range;

use conch_core::buffer::ConsoleBuffer;
use conch_core::editor::Selection;
use conch_core::style::{Rgb, TextStyle};
use crossterm::style::{Attribute, Color, ContentStyle, PrintStyledContent, StyledContent};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};

// ════════════════════════════════════════════════════════════════════
// Color conversion
// ════════════════════════════════════════════════════════════════════

pub fn rgb_to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// A run without a color keeps the terminal's default foreground.
pub fn content_style(style: &TextStyle, selected: bool) -> ContentStyle {
    let mut out = ContentStyle::new();
    out.foreground_color = style.color.map(rgb_to_color);
    if style.emphasis.bold {
        out.attributes.set(Attribute::Bold);
    }
    if style.emphasis.italic {
        out.attributes.set(Attribute::Italic);
    }
    if style.emphasis.underline {
        out.attributes.set(Attribute::Underlined);
    }
    if selected {
        out.attributes.set(Attribute::Reverse);
    }
    out
}

// ════════════════════════════════════════════════════════════════════
// Layout
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: TextStyle,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub rows: Vec<Vec<Span>>,
    /// `(row, column)` of the caret when one was requested.
    pub caret: Option<(usize, usize)>,
}

impl Layout {
    /// The plain text of one row.
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|spans| spans.iter().map(|s| s.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Wraps the buffer at `width` columns. Adjacent characters with the same
/// style and selection state are coalesced into one span; tabs render as a
/// single space.
pub fn layout(
    buffer: &ConsoleBuffer,
    width: usize,
    caret: Option<usize>,
    selection: Option<Selection>,
) -> Layout {
    let width = width.max(1);
    let selected_range = selection
        .filter(|s| !s.is_empty())
        .map(|s| s.start()..s.end());

    let mut rows: Vec<Vec<Span>> = vec![Vec::new()];
    let mut caret_at = None;
    let mut col = 0;
    let mut offset = 0;

    for run in buffer.runs() {
        for ch in run.text().chars() {
            if ch != '\n' && col == width {
                rows.push(Vec::new());
                col = 0;
            }
            if caret == Some(offset) {
                caret_at = Some((rows.len() - 1, col));
            }
            let selected = selected_range
                .as_ref()
                .is_some_and(|range| range.contains(&offset));
            offset += 1;

            if ch == '\n' {
                rows.push(Vec::new());
                col = 0;
                continue;
            }
            let shown = if ch == '\t' || ch.is_control() { ' ' } else { ch };
            if let Some(row) = rows.last_mut() {
                push_char(row, shown, run.style(), selected);
            }
            col += 1;
        }
    }

    if caret == Some(offset) {
        if col == width {
            rows.push(Vec::new());
            col = 0;
        }
        caret_at = Some((rows.len() - 1, col));
    }

    Layout {
        rows,
        caret: caret_at,
    }
}

fn push_char(row: &mut Vec<Span>, ch: char, style: &TextStyle, selected: bool) {
    match row.last_mut() {
        Some(span) if span.style == *style && span.selected == selected => span.text.push(ch),
        _ => row.push(Span {
            text: ch.to_string(),
            style: *style,
            selected,
        }),
    }
}

/// Rows shown in a pane of `height` rows, `scroll` rows up from the bottom.
/// Scrolling stops at the first row.
pub fn viewport(total: usize, height: usize, scroll: usize) -> Range<usize> {
    let end = total.saturating_sub(scroll).max(height.min(total));
    end.saturating_sub(height)..end
}

/// Pads or truncates `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

/// `[Lua]  System ` with the primary console bracketed.
pub fn tab_strip(names: &[String], primary: usize) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == primary {
                format!("[{name}]")
            } else {
                format!(" {name} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ════════════════════════════════════════════════════════════════════
// Drawing
// ════════════════════════════════════════════════════════════════════

/// A full-width horizontal band of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub top: u16,
    pub height: u16,
    pub width: u16,
}

/// Draws the visible rows of `layout` into `area`. Returns the on-screen
/// caret position when the caret row is visible.
pub fn draw_layout<W: Write>(
    out: &mut W,
    layout: &Layout,
    area: Area,
    scroll: usize,
) -> io::Result<Option<(u16, u16)>> {
    let visible = viewport(layout.rows.len(), area.height as usize, scroll);
    for (line, row) in visible.clone().enumerate() {
        queue!(
            out,
            cursor::MoveTo(0, area.top + line as u16),
            Clear(ClearType::CurrentLine)
        )?;
        for span in &layout.rows[row] {
            queue!(
                out,
                PrintStyledContent(StyledContent::new(
                    content_style(&span.style, span.selected),
                    span.text.as_str()
                ))
            )?;
        }
    }
    for line in visible.len()..area.height as usize {
        queue!(
            out,
            cursor::MoveTo(0, area.top + line as u16),
            Clear(ClearType::CurrentLine)
        )?;
    }

    Ok(layout
        .caret
        .filter(|(row, _)| visible.contains(row))
        .map(|(row, col)| (col as u16, area.top + (row - visible.start) as u16)))
}

/// One reverse-video line across the full width.
pub fn draw_bar<W: Write>(out: &mut W, row: u16, width: u16, text: &str) -> io::Result<()> {
    let mut style = ContentStyle::new();
    style.attributes.set(Attribute::Reverse);
    queue!(
        out,
        cursor::MoveTo(0, row),
        PrintStyledContent(StyledContent::new(style, fit(text, width as usize)))
    )
}
