// conch-bridge/tests/renderer_tests.rs
//
// Layout and styling of console buffers for the terminal:
//   content_style(): colors and emphasis to crossterm attributes
//   layout()       : wrapping, span coalescing, caret and selection
//   viewport()     : scrollback window
//   fit() / tab_strip(): status bar text

use conch_bridge::renderer::{Area, content_style, draw_layout, fit, layout, rgb_to_color, tab_strip, viewport};
use conch_core::buffer::ConsoleBuffer;
use conch_core::editor::Selection;
use conch_core::style::{Emphasis, Rgb, StyleTag, TextStyle};
use crossterm::style::{Attribute, Color};

fn buffer_with(lines: &[(&str, StyleTag)]) -> ConsoleBuffer {
    let mut buffer = ConsoleBuffer::new(100);
    for (text, tag) in lines {
        buffer.append_raw(text, TextStyle::new(*tag));
    }
    buffer
}

// ════════════════════════════════════════════════════════════════════
// Styles
// ════════════════════════════════════════════════════════════════════

#[test]
fn test_rgb_maps_to_true_color() {
    assert_eq!(
        rgb_to_color(Rgb::new(1, 2, 3)),
        Color::Rgb { r: 1, g: 2, b: 3 }
    );
}

#[test]
fn test_uncolored_style_keeps_default_foreground() {
    let style = content_style(&TextStyle::new(StyleTag::Stdin), false);
    assert_eq!(style.foreground_color, None);
    assert!(!style.attributes.has(Attribute::Reverse));
}

#[test]
fn test_emphasis_and_selection_attributes() {
    let style = TextStyle {
        color: Some(Rgb::new(0, 192, 0)),
        emphasis: Emphasis::BOLD,
        ..TextStyle::new(StyleTag::Prompt)
    };
    let out = content_style(&style, true);
    assert_eq!(out.foreground_color, Some(Color::Rgb { r: 0, g: 192, b: 0 }));
    assert!(out.attributes.has(Attribute::Bold));
    assert!(!out.attributes.has(Attribute::Italic));
    assert!(out.attributes.has(Attribute::Reverse));

    let italic = TextStyle {
        emphasis: Emphasis::ITALIC,
        ..TextStyle::new(StyleTag::Stdin)
    };
    assert!(content_style(&italic, false).attributes.has(Attribute::Italic));
}

// ════════════════════════════════════════════════════════════════════
// Layout
// ════════════════════════════════════════════════════════════════════

#[test]
fn test_layout_splits_lines_and_keeps_styles() {
    let buffer = buffer_with(&[
        ("hello\n", StyleTag::Stdout),
        ("oops\n", StyleTag::Stderr),
        ("> ", StyleTag::Prompt),
    ]);
    let out = layout(&buffer, 80, None, None);

    assert_eq!(out.rows.len(), 3);
    assert_eq!(out.row_text(0), "hello");
    assert_eq!(out.row_text(1), "oops");
    assert_eq!(out.row_text(2), "> ");
    assert_eq!(out.rows[1][0].style.tag, StyleTag::Stderr);
    assert_eq!(out.caret, None);
}

#[test]
fn test_layout_coalesces_same_style() {
    let buffer = buffer_with(&[("> ", StyleTag::Prompt), ("ls -la", StyleTag::Stdin)]);
    let out = layout(&buffer, 80, None, None);
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rows[0].len(), 2);
    assert_eq!(out.rows[0][1].text, "ls -la");
}

#[test]
fn test_layout_wraps_at_width() {
    let buffer = buffer_with(&[("abcdefgh\n", StyleTag::Stdout)]);
    let out = layout(&buffer, 3, None, None);
    assert_eq!(out.row_text(0), "abc");
    assert_eq!(out.row_text(1), "def");
    assert_eq!(out.row_text(2), "gh");
    assert_eq!(out.row_text(3), "");
}

#[test]
fn test_tabs_render_as_one_column() {
    let buffer = buffer_with(&[("a\tb\n", StyleTag::Stdout)]);
    assert_eq!(layout(&buffer, 80, None, None).row_text(0), "a b");
}

#[test]
fn test_caret_position() {
    let buffer = buffer_with(&[("out\n", StyleTag::Stdout), ("> ", StyleTag::Prompt), ("ab", StyleTag::Stdin)]);
    let end = buffer.len();
    assert_eq!(layout(&buffer, 80, Some(end), None).caret, Some((1, 4)));
    assert_eq!(layout(&buffer, 80, Some(4), None).caret, Some((1, 0)));
    assert_eq!(layout(&buffer, 80, Some(3), None).caret, Some((0, 3)));
}

#[test]
fn test_caret_at_full_row_moves_to_next_row() {
    let buffer = buffer_with(&[("abc", StyleTag::Stdin)]);
    assert_eq!(layout(&buffer, 3, Some(3), None).caret, Some((1, 0)));
}

#[test]
fn test_empty_buffer_caret() {
    let buffer = ConsoleBuffer::new(10);
    let out = layout(&buffer, 80, Some(0), None);
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.caret, Some((0, 0)));
}

#[test]
fn test_selection_is_split_into_its_own_span() {
    let buffer = buffer_with(&[("hello world", StyleTag::Stdin)]);
    let selection = Selection { dot: 6, mark: 11 };
    let out = layout(&buffer, 80, None, Some(selection));
    let spans = &out.rows[0];
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].text, "hello ");
    assert!(!spans[0].selected);
    assert_eq!(spans[1].text, "world");
    assert!(spans[1].selected);
}

#[test]
fn test_empty_selection_highlights_nothing() {
    let buffer = buffer_with(&[("hello", StyleTag::Stdin)]);
    let out = layout(&buffer, 80, None, Some(Selection::caret(2)));
    assert!(out.rows[0].iter().all(|span| !span.selected));
}

// ════════════════════════════════════════════════════════════════════
// Viewport & text helpers
// ════════════════════════════════════════════════════════════════════

#[test]
fn test_viewport_shows_tail() {
    assert_eq!(viewport(10, 4, 0), 6..10);
    assert_eq!(viewport(2, 4, 0), 0..2);
}

#[test]
fn test_viewport_scrollback_stops_at_top() {
    assert_eq!(viewport(10, 4, 3), 3..7);
    assert_eq!(viewport(10, 4, 100), 0..4);
}

#[test]
fn test_fit_pads_and_truncates() {
    assert_eq!(fit("ab", 4), "ab  ");
    assert_eq!(fit("abcdef", 3), "abc");
    assert_eq!(fit("héllo", 2), "hé");
}

#[test]
fn test_tab_strip_brackets_primary() {
    let names = vec!["Lua".to_string(), "System".to_string()];
    assert_eq!(tab_strip(&names, 0), "[Lua]  System ");
    assert_eq!(tab_strip(&names, 1), " Lua  [System]");
}

// ════════════════════════════════════════════════════════════════════
// Drawing
// ════════════════════════════════════════════════════════════════════

#[test]
fn test_draw_layout_reports_visible_caret() {
    let buffer = buffer_with(&[("1\n2\n3\n", StyleTag::Stdout), ("> ", StyleTag::Prompt)]);
    let out = layout(&buffer, 80, Some(buffer.len()), None);
    let area = Area {
        top: 2,
        height: 2,
        width: 80,
    };

    let mut sink: Vec<u8> = Vec::new();
    let caret = draw_layout(&mut sink, &out, area, 0).unwrap();
    assert_eq!(caret, Some((2, 3)));
    let written = String::from_utf8_lossy(&sink);
    assert!(written.contains("> "));

    let scrolled = draw_layout(&mut Vec::new(), &out, area, 2).unwrap();
    assert_eq!(scrolled, None);
}
