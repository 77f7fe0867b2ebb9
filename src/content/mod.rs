//! Content module - discovery, front-matter and markdown rendering

pub mod data;
mod frontmatter;
mod item;
pub mod loader;
mod markdown;

pub use frontmatter::{FrontMatter, SortIndex};
pub use item::{normalize_path, ContentItem};
pub use markdown::{html_escape, MarkdownRenderer};
