//! Heading hierarchy - ancestor chain of markdown headings for a line

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A markdown ATX heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Number of `#` markers (1-6)
    pub level: usize,

    /// Trimmed title text
    pub title: String,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading pattern is valid")
    })
}

/// Parse a single line as a heading
pub fn parse_heading(line: &str) -> Option<Heading> {
    let caps = heading_pattern().captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str().trim();

    if title.is_empty() {
        return None;
    }

    Some(Heading {
        level,
        title: title.to_string(),
    })
}

/// Headings enclosing `cursor_line`, root first.
///
/// Lines past the end of the document are ignored. Each heading pops
/// every open heading at the same or a deeper level before it is pushed,
/// so levels along the returned chain strictly increase.
pub fn heading_chain(document_text: &str, cursor_line: usize) -> Vec<Heading> {
    let mut stack: Vec<Heading> = Vec::new();

    for line in document_text.split('\n').take(cursor_line.saturating_add(1)) {
        let Some(heading) = parse_heading(line) else {
            continue;
        };

        while stack.last().is_some_and(|top| top.level >= heading.level) {
            stack.pop();
        }
        stack.push(heading);
    }

    stack
}

/// Titles of the headings enclosing `cursor_line`, root to nearest
pub fn extract_heading_path(document_text: &str, cursor_line: usize) -> Vec<String> {
    heading_chain(document_text, cursor_line)
        .into_iter()
        .map(|h| h.title)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const DOC: &str = "# A\nsome text\n## B\nmore\n### C\nx";

    #[test]
    fn test_nested_path() {
        assert_eq!(extract_heading_path(DOC, 5), vec!["A", "B", "C"]);
        assert_eq!(extract_heading_path(DOC, 1), vec!["A"]);
    }

    #[test]
    fn test_heading_on_cursor_line_included() {
        assert_eq!(extract_heading_path(DOC, 2), vec!["A", "B"]);
        assert_eq!(extract_heading_path(DOC, 0), vec!["A"]);
    }

    #[test]
    fn test_no_preceding_heading() {
        let doc = "intro line\nanother\n# Later";
        assert!(extract_heading_path(doc, 0).is_empty());
        assert!(extract_heading_path(doc, 1).is_empty());
        assert!(extract_heading_path("", 0).is_empty());
    }

    #[test]
    fn test_sibling_replaces_sibling() {
        let doc = "# Top\n## One\ntext\n## Two\ntext";
        assert_eq!(extract_heading_path(doc, 4), vec!["Top", "Two"]);
    }

    #[test]
    fn test_shallower_heading_closes_deeper_scopes() {
        let doc = "# A\n### Deep\n## B\nbody";
        assert_eq!(extract_heading_path(doc, 3), vec!["A", "B"]);

        let doc = "## Second\n#### Fourth\n# First\nbody";
        assert_eq!(extract_heading_path(doc, 3), vec!["First"]);
    }

    #[test]
    fn test_cursor_past_end_scans_available_lines() {
        assert_eq!(extract_heading_path(DOC, 500), vec!["A", "B", "C"]);
        assert_eq!(extract_heading_path(DOC, usize::MAX), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_non_heading_lines_ignored() {
        assert_eq!(parse_heading("#tag"), None);
        assert_eq!(parse_heading("#   "), None);
        assert_eq!(parse_heading("#"), None);
        assert_eq!(parse_heading("####### seven"), None);
        assert_eq!(parse_heading(" # indented"), None);
    }

    #[test]
    fn test_title_trimmed() {
        assert_eq!(
            parse_heading("##   Spaced out   "),
            Some(Heading { level: 2, title: "Spaced out".to_string() })
        );
        assert_eq!(
            parse_heading("### Windows\r"),
            Some(Heading { level: 3, title: "Windows".to_string() })
        );
    }

    #[test]
    fn test_levels_strictly_increase_on_random_documents() {
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let line_count = rng.gen_range(0..40);
            let lines: Vec<String> = (0..line_count)
                .map(|i| match rng.gen_range(0..4) {
                    0 => format!("{} h{}", "#".repeat(rng.gen_range(1..=6)), i),
                    1 => "#".repeat(rng.gen_range(1..=8)),
                    _ => format!("plain {}", i),
                })
                .collect();
            let doc = lines.join("\n");
            let cursor = rng.gen_range(0..=line_count);

            let chain = heading_chain(&doc, cursor);
            for pair in chain.windows(2) {
                assert!(pair[0].level < pair[1].level, "chain {:?} in {:?}", chain, doc);
            }

            let has_heading_before = lines
                .iter()
                .take(cursor + 1)
                .any(|l| parse_heading(l).is_some());
            assert_eq!(chain.is_empty(), !has_heading_before);
        }
    }
}
