//! The protected console buffer.
//!
//! Storage is an append-mostly log of styled runs with a `boundary` offset.
//! Everything before the boundary is history and is only ever removed by the
//! line-cap trim; everything at or after it is the live input line. The
//! buffer enforces the boundary on raw edits, but the editing *policy*
//! (what a gesture is allowed to do) lives in [`crate::editor`].
//!
//! All offsets are char offsets.

use std::ops::Range;

use crate::style::{StyleTag, TextStyle};
use crate::theme::ThemeProvider;

pub const DEFAULT_MAX_LINES: usize = 1500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("offset {offset} is before the input boundary ({boundary:?})")]
    Protected {
        offset: usize,
        boundary: Option<usize>,
    },

    #[error("range {start}..{end} is out of bounds (length {len})")]
    OutOfRange { start: usize, end: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    text: String,
    style: TextStyle,
    chars: usize,
}

impl StyledRun {
    fn new(text: String, style: TextStyle) -> Self {
        let chars = text.chars().count();
        Self { text, style, chars }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleBuffer {
    runs: Vec<StyledRun>,
    len: usize,
    boundary: Option<usize>,
    max_lines: usize,
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl ConsoleBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            runs: Vec::new(),
            len: 0,
            boundary: Some(0),
            max_lines: max_lines.max(1),
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Queries
    // ────────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the editable region. `None` once the line-cap trim has
    /// evicted part of the live input.
    pub fn boundary(&self) -> Option<usize> {
        self.boundary
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.max_lines = max_lines.max(1);
        self.trim_to_line_cap(self.max_lines);
    }

    pub fn runs(&self) -> &[StyledRun] {
        &self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Text in `range`, clamped to the buffer.
    pub fn slice(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.len);
        if range.start >= end {
            return String::new();
        }
        self.text()
            .chars()
            .skip(range.start)
            .take(end - range.start)
            .collect()
    }

    /// The live input: everything from the boundary to the end.
    pub fn current_input(&self) -> Option<String> {
        self.boundary.map(|b| self.slice(b..self.len))
    }

    pub fn line_count(&self) -> usize {
        1 + self.runs.iter().map(|r| r.text.matches('\n').count()).sum::<usize>()
    }

    /// Offset of the first char of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        let mut start = 0;
        for (i, c) in self.text().chars().enumerate() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                start = i + 1;
            }
        }
        start
    }

    // ────────────────────────────────────────────────────────────────
    // Appends
    // ────────────────────────────────────────────────────────────────

    /// Appends `text` as a full line. Non-input text moves the boundary to
    /// the new end.
    pub fn append(&mut self, text: &str, style: TextStyle) -> usize {
        if text.ends_with('\n') {
            self.append_raw(text, style)
        } else {
            self.append_raw(&format!("{text}\n"), style)
        }
    }

    /// Appends `text` verbatim. Returns the number of chars evicted by the
    /// line cap as a consequence.
    pub fn append_raw(&mut self, text: &str, style: TextStyle) -> usize {
        if !text.is_empty() {
            let run = StyledRun::new(text.to_string(), style);
            self.len += run.chars;
            self.runs.push(run);
            self.normalize();
        }
        if style.tag != StyleTag::Stdin {
            self.boundary = Some(self.len);
        }
        self.trim_to_line_cap(self.max_lines)
    }

    /// Moves the boundary to the end, freezing whatever was typed.
    pub fn commit_input(&mut self) {
        self.boundary = Some(self.len);
    }

    // ────────────────────────────────────────────────────────────────
    // Editable region
    // ────────────────────────────────────────────────────────────────

    /// Replaces everything from the boundary to the end with `text`.
    pub fn replace_editable_region(&mut self, text: &str) -> Result<(), BufferError> {
        let boundary = self.require_boundary(self.len)?;
        self.remove(boundary..self.len)?;
        self.insert(boundary, text, TextStyle::new(StyleTag::Stdin))
    }

    pub fn insert(&mut self, offset: usize, text: &str, style: TextStyle) -> Result<(), BufferError> {
        self.check_range(offset..offset)?;
        self.require_boundary(offset)?;
        if text.is_empty() {
            return Ok(());
        }
        let at = self.split_at(offset);
        let run = StyledRun::new(text.to_string(), style);
        self.len += run.chars;
        self.runs.insert(at, run);
        self.normalize();
        Ok(())
    }

    pub fn remove(&mut self, range: Range<usize>) -> Result<(), BufferError> {
        self.check_range(range.clone())?;
        self.require_boundary(range.start)?;
        if range.is_empty() {
            return Ok(());
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.runs.drain(first..last);
        self.len -= range.len();
        self.normalize();
        Ok(())
    }

    /// Re-tags a range of live input, e.g. after re-highlighting.
    pub fn restyle_range(&mut self, range: Range<usize>, style: TextStyle) -> Result<(), BufferError> {
        self.check_range(range.clone())?;
        self.require_boundary(range.start)?;
        if range.is_empty() {
            return Ok(());
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            run.style = style;
        }
        self.normalize();
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────
    // Bulk operations
    // ────────────────────────────────────────────────────────────────

    /// Evicts the oldest lines once the buffer holds more than `max_lines`.
    /// Returns the number of chars evicted.
    pub fn trim_to_line_cap(&mut self, max_lines: usize) -> usize {
        let lines = self.line_count();
        if lines <= max_lines {
            return 0;
        }
        let to_delete = lines - max_lines;

        let mut seen = 0;
        let mut evicted = self.len;
        for (i, c) in self.text().chars().enumerate() {
            if c == '\n' {
                seen += 1;
                if seen == to_delete {
                    evicted = i + 1;
                    break;
                }
            }
        }

        let cut = self.split_at(evicted);
        self.runs.drain(..cut);
        self.len -= evicted;
        self.boundary = match self.boundary {
            Some(b) if b >= evicted => Some(b - evicted),
            Some(b) => {
                tracing::debug!(boundary = b, evicted, "line cap evicted live input");
                None
            }
            None => None,
        };
        evicted
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.len = 0;
        self.boundary = Some(0);
    }

    /// Recomputes every run's color for a new theme.
    pub fn apply_theme(&mut self, theme: &dyn ThemeProvider) {
        for run in &mut self.runs {
            run.style = theme.resolve(run.style);
        }
        self.normalize();
    }

    // ────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────

    fn check_range(&self, range: Range<usize>) -> Result<(), BufferError> {
        if range.start > range.end || range.end > self.len {
            return Err(BufferError::OutOfRange {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        Ok(())
    }

    fn require_boundary(&self, offset: usize) -> Result<usize, BufferError> {
        match self.boundary {
            Some(b) if offset >= b => Ok(b),
            boundary => Err(BufferError::Protected { offset, boundary }),
        }
    }

    /// Splits runs so that one starts exactly at `offset`; returns its index
    /// (or `runs.len()` for the end of the buffer).
    fn split_at(&mut self, offset: usize) -> usize {
        let mut start = 0;
        for i in 0..self.runs.len() {
            if offset == start {
                return i;
            }
            let run_len = self.runs[i].chars;
            if offset < start + run_len {
                let head_chars = offset - start;
                let byte = self.runs[i]
                    .text
                    .char_indices()
                    .nth(head_chars)
                    .map(|(b, _)| b)
                    .unwrap_or(self.runs[i].text.len());
                let tail = self.runs[i].text.split_off(byte);
                self.runs[i].chars = head_chars;
                let style = self.runs[i].style;
                self.runs.insert(i + 1, StyledRun::new(tail, style));
                return i + 1;
            }
            start += run_len;
        }
        self.runs.len()
    }

    fn normalize(&mut self) {
        self.runs.retain(|r| !r.text.is_empty());
        let mut merged: Vec<StyledRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.style == run.style => {
                    prev.text.push_str(&run.text);
                    prev.chars += run.chars;
                }
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}
