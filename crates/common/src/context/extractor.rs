//! Context Extractor - Builds the bounded context sent with a selection
//!
//! Provides:
//! - Character-windowed surrounding excerpt
//! - Heading ancestry for the cursor line
//! - Note title fallback

use crate::config::ContextConfig;
use crate::errors::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::headings::extract_heading_path;

/// Everything the model is told about a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainContext {
    /// Exact highlighted text, never blank
    pub selected_text: String,

    /// Document excerpt around the selection
    pub surrounding_chunk: String,

    /// Heading titles, root to nearest
    pub heading_path: Vec<String>,

    /// Display name of the note
    pub note_title: String,
}

/// Editor state captured at trigger time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Full document text
    pub text: String,

    /// Selection as character offsets
    pub selection: Range<usize>,

    /// Zero-based cursor line; derived from the selection start when absent
    pub cursor_line: Option<usize>,

    /// Note title, if the host has one
    pub title: Option<String>,
}

impl DocumentSnapshot {
    /// Selection with start <= end, clipped to the document
    pub fn normalized_selection(&self) -> Range<usize> {
        normalize_range(&self.selection, self.text.chars().count())
    }

    /// Text covered by the selection
    pub fn selected_text(&self) -> String {
        let range = self.normalized_selection();
        self.text
            .chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect()
    }

    /// Whether the selection holds anything worth explaining
    pub fn has_selection(&self) -> bool {
        !self.selected_text().trim().is_empty()
    }

    /// Cursor line, falling back to the line of the selection start
    pub fn cursor_line(&self) -> usize {
        self.cursor_line
            .unwrap_or_else(|| line_of_offset(&self.text, self.normalized_selection().start))
    }
}

/// Builds `ExplainContext` values with a fixed radius and title fallback
#[derive(Debug, Clone)]
pub struct ContextExtractor {
    radius: usize,
    default_title: String,
}

impl Default for ContextExtractor {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CONTEXT_RADIUS)
    }
}

impl ContextExtractor {
    /// Create an extractor with the given radius
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            default_title: crate::DEFAULT_NOTE_TITLE.to_string(),
        }
    }

    /// Create an extractor from configuration
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            radius: config.radius,
            default_title: config.default_title.clone(),
        }
    }

    /// Characters kept on each side of the selection
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Extract context for a selection.
    ///
    /// Offsets are in characters. Out-of-range offsets are clipped and a
    /// reversed range is flipped. Blank selections are refused.
    pub fn extract(
        &self,
        document_text: &str,
        selection: Range<usize>,
        cursor_line: usize,
        title: Option<&str>,
    ) -> Result<ExplainContext> {
        let char_count = document_text.chars().count();
        let selection = normalize_range(&selection, char_count);

        let selected_text = char_slice(document_text, selection.clone());
        if selected_text.trim().is_empty() {
            return Err(ExplainError::EmptySelection);
        }

        let window = surrounding_window(&selection, char_count, self.radius);
        let surrounding_chunk = char_slice(document_text, window);

        let note_title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.default_title)
            .to_string();

        Ok(ExplainContext {
            selected_text,
            surrounding_chunk,
            heading_path: extract_heading_path(document_text, cursor_line),
            note_title,
        })
    }

    /// Extract context from an editor snapshot
    pub fn extract_snapshot(&self, snapshot: &DocumentSnapshot) -> Result<ExplainContext> {
        self.extract(
            &snapshot.text,
            snapshot.selection.clone(),
            snapshot.cursor_line(),
            snapshot.title.as_deref(),
        )
    }
}

/// Extract context with the default radius and title fallback
pub fn extract_context(
    document_text: &str,
    selection: Range<usize>,
    cursor_line: usize,
    title: Option<&str>,
) -> Result<ExplainContext> {
    ContextExtractor::default().extract(document_text, selection, cursor_line, title)
}

/// Window of `radius` characters on each side of `selection`, clipped to `[0, len]`
pub fn surrounding_window(selection: &Range<usize>, len: usize, radius: usize) -> Range<usize> {
    let start = selection.start.saturating_sub(radius);
    let end = selection.end.saturating_add(radius).min(len);
    start.min(end)..end
}

/// Zero-based line containing the character at `offset`
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    text.chars().take(offset).filter(|c| *c == '\n').count()
}

fn normalize_range(range: &Range<usize>, len: usize) -> Range<usize> {
    let (a, b) = if range.start <= range.end {
        (range.start, range.end)
    } else {
        (range.end, range.start)
    };
    a.min(len)..b.min(len)
}

fn char_slice(text: &str, range: Range<usize>) -> String {
    text.chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}
