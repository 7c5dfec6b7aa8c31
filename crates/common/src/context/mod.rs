//! Context extraction
//!
//! Turns editor state into the bounded context sent with a selection:
//! - Heading ancestry of the cursor line
//! - Character-windowed surrounding excerpt
//! - Note title

mod extractor;
mod headings;

pub use extractor::{
    extract_context, line_of_offset, surrounding_window, ContextExtractor, DocumentSnapshot,
    ExplainContext,
};
pub use headings::{extract_heading_path, heading_chain, parse_heading, Heading};
