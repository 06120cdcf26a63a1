//! Rendering module for turning block sequences into Markdown and back.

mod json;
mod markdown;
mod options;
pub mod reader;
mod stats;
mod text;

pub use json::{to_json, JsonFormat};
pub use markdown::{render, MarkdownRenderer};
pub use options::RenderOptions;
pub use reader::{read_markdown, ParsedMarkdown};
pub use stats::ExtractionStats;
pub use text::full_text;
