//! Turning a fetched page into a Markdown file on disk: clean the HTML,
//! pick the main content node, convert to Markdown, attach YAML
//! front-matter, and write atomically.

pub mod atomic_write;
pub mod content_extractor;
pub mod frontmatter;
pub mod markdown_converter;
pub mod markdown_writer;

pub use atomic_write::write_atomic;
pub use content_extractor::ExtractedContent;
pub use frontmatter::{reattach_front_matter, split_front_matter, FrontMatter};
pub use markdown_writer::{build_markdown_page, persist_markdown_page, write_markdown_page, BuiltPage, WrittenPage};
