//! Prompt construction for explanation requests

use crate::context::ExplainContext;
use serde::{Deserialize, Serialize};

/// System instruction sent with every explanation
pub const SYSTEM_INSTRUCTION: &str = "\
You explain passages a user has selected in their notes and personal knowledge base.

GUIDELINES:
- Be concise but complete: 2-4 paragraphs at most
- Cover the core explanation and stop there
- Prefer plain language; keep technical terms only where they are needed
- Briefly clarify any concepts the passage refers to
- Define jargon and acronyms
- Format the answer in markdown: bold key terms, use bullet points when they help
- Never repeat the selected text back verbatim
- Skip preambles such as \"this text is about\" and start with the explanation
- Separate sections with a blank line";

/// Shown in place of the section path when the selection sits above every heading
pub const NO_HEADING: &str = "No heading";

/// Separator between section titles
pub const HEADING_SEPARATOR: &str = " > ";

/// A fully built request for a completion source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Fixed tone and format instruction
    pub system: String,

    /// Context and task for this selection
    pub user: String,
}

/// Build the prompt for a selection context
pub fn build_prompt(context: &ExplainContext) -> Prompt {
    let section_path = if context.heading_path.is_empty() {
        NO_HEADING.to_string()
    } else {
        context.heading_path.join(HEADING_SEPARATOR)
    };

    let user = format!(
        "CONTEXT:\n\
        - Note title: {}\n\
        - Section path: {}\n\
        - Surrounding text: {}\n\n\
        TASK: Explain the following selected text clearly and concisely.\n\n\
        Selected text: \"{}\"",
        context.note_title, section_path, context.surrounding_chunk, context.selected_text
    );

    Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(heading_path: Vec<&str>) -> ExplainContext {
        ExplainContext {
            selected_text: "ATP synthase".to_string(),
            surrounding_chunk: "the enzyme ATP synthase couples".to_string(),
            heading_path: heading_path.into_iter().map(String::from).collect(),
            note_title: "Cell Biology".to_string(),
        }
    }

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = build_prompt(&context(vec!["Energy", "Mitochondria"]));

        assert!(prompt.user.contains("- Note title: Cell Biology\n"));
        assert!(prompt.user.contains("- Section path: Energy > Mitochondria\n"));
        assert!(prompt.user.contains("- Surrounding text: the enzyme ATP synthase couples\n"));
        assert!(prompt.user.ends_with("Selected text: \"ATP synthase\""));
        assert_eq!(prompt.system, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_prompt_without_headings() {
        let prompt = build_prompt(&context(vec![]));
        assert!(prompt.user.contains("- Section path: No heading\n"));
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt(&context(vec!["A"]));
        let expected = "CONTEXT:\n\
            - Note title: Cell Biology\n\
            - Section path: A\n\
            - Surrounding text: the enzyme ATP synthase couples\n\n\
            TASK: Explain the following selected text clearly and concisely.\n\n\
            Selected text: \"ATP synthase\"";
        assert_eq!(prompt.user, expected);
    }
}
