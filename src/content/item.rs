//! Content item model

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

use super::frontmatter::{FrontMatter, SortIndex};

/// One discovered content file plus its front-matter.
///
/// Built once by the loader and never mutated afterwards; collections and
/// pages only hold references into the loaded set.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    /// Source path relative to the source directory, `/`-separated
    pub source: String,

    /// Full source file path
    #[serde(skip)]
    pub full_source: PathBuf,

    /// Identifier used to build the output path
    pub id: String,

    /// Display title
    pub title: String,

    /// Front-matter after directory data has been merged in
    pub data: FrontMatter,

    /// Publication date, if the front-matter has a parseable one
    pub date: Option<DateTime<Local>>,

    /// Raw markdown body
    #[serde(skip)]
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Rendered excerpt (before <!-- more -->)
    pub excerpt: Option<String>,
}

impl ContentItem {
    /// Create an item with an empty body. `id` and `title` fall back to the file stem.
    pub fn new(source: impl Into<String>, data: FrontMatter) -> Self {
        let source = source.into();
        let stem = file_stem(&source);
        let id = data
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slug::slugify(&stem));
        let title = data.title.clone().unwrap_or_else(|| stem.clone());
        let date = data.parse_date();

        Self {
            full_source: PathBuf::from(&source),
            source,
            id,
            title,
            data,
            date,
            raw: String::new(),
            content: String::new(),
            excerpt: None,
        }
    }

    /// The manually assigned ordering key
    pub fn index(&self) -> SortIndex {
        self.data.index
    }

    /// Whether the item belongs to the collection for `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.data.tags.iter().any(|t| t == tag)
    }

    /// Output URL path (relative to the site root) for an item rendered on its own.
    ///
    /// An explicit `permalink` wins; otherwise the source path without its
    /// extension becomes a directory, and `index.md` maps to its parent.
    pub fn standalone_path(&self) -> String {
        if let Some(permalink) = self.data.permalink.as_deref() {
            return normalize_path(permalink);
        }

        let without_ext = self
            .source
            .trim_end_matches(".md")
            .trim_end_matches(".markdown");
        let path = if without_ext == "index" {
            String::new()
        } else if let Some(dir) = without_ext.strip_suffix("/index") {
            format!("{}/", dir)
        } else {
            format!("{}/", without_ext)
        };
        normalize_path(&path)
    }
}

fn file_stem(source: &str) -> String {
    let name = source.rsplit('/').next().unwrap_or(source);
    name.trim_end_matches(".md")
        .trim_end_matches(".markdown")
        .to_string()
}

/// Strip leading slashes; keep a trailing slash for directory-style URLs
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') || path.ends_with(".html") || path.ends_with(".xml")
    {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, yaml: &str) -> ContentItem {
        let (fm, _) = FrontMatter::parse(&format!("---\n{}\n---\n", yaml)).unwrap();
        ContentItem::new(source, fm)
    }

    #[test]
    fn test_id_and_title_fall_back_to_stem() {
        let it = item("posts/My First Post.md", "index: 1");
        assert_eq!(it.id, "my-first-post");
        assert_eq!(it.title, "My First Post");
    }

    #[test]
    fn test_explicit_id_wins() {
        let it = item("posts/a.md", "id: custom\ntitle: A");
        assert_eq!(it.id, "custom");
        assert_eq!(it.title, "A");
    }

    #[test]
    fn test_has_tag() {
        let it = item("posts/a.md", "tags: [post, rust]");
        assert!(it.has_tag("post"));
        assert!(!it.has_tag("posts"));
    }

    #[test]
    fn test_standalone_path() {
        assert_eq!(item("resume.md", "title: R").standalone_path(), "resume/");
        assert_eq!(item("index.md", "title: H").standalone_path(), "");
        assert_eq!(item("about/index.md", "title: A").standalone_path(), "about/");
        assert_eq!(
            item("x.md", "permalink: /cv/").standalone_path(),
            "cv/"
        );
        assert_eq!(
            item("x.md", "permalink: 404.html").standalone_path(),
            "404.html"
        );
    }
}
