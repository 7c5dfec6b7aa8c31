use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "smart-explain",
    version,
    about = "Explain a selection of a markdown note, streamed from Gemini"
)]
#[command(group(ArgGroup::new("selection").required(true).args(["start", "find"])))]
pub struct Args {
    /// Markdown note to read
    #[arg(long, short)]
    pub file: PathBuf,

    /// Selection start, in characters
    #[arg(long, requires = "end")]
    pub start: Option<usize>,

    /// Selection end (exclusive), in characters
    #[arg(long, requires = "start")]
    pub end: Option<usize>,

    /// Select the first occurrence of TEXT
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["start", "end"])]
    pub find: Option<String>,

    /// 0-based cursor line used for the heading path (default: selection start line)
    #[arg(long)]
    pub cursor_line: Option<usize>,

    /// Note title (default: file stem)
    #[arg(long)]
    pub title: Option<String>,

    /// Configuration file, replaces the config/ directory layering
    #[arg(long, env = "SMART_EXPLAIN_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Title given on the command line, or the note's file stem
    pub fn note_title(&self) -> Option<String> {
        self.title.clone().or_else(|| {
            self.file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }

    /// Selection as a character range over `text`, None when `--find` misses
    pub fn selection(&self, text: &str) -> Option<std::ops::Range<usize>> {
        match (&self.find, self.start, self.end) {
            (Some(needle), _, _) => {
                let byte = text.find(needle.as_str())?;
                let start = text[..byte].chars().count();
                Some(start..start + needle.chars().count())
            }
            (None, Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }
}
