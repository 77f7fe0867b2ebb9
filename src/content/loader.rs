//! Content loader - discovers content items in the source directory

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::data::{relative_key, DirectoryData};
use super::{ContentItem, FrontMatter, MarkdownRenderer};
use crate::error::{Error, Result};
use crate::Site;

/// Everything discovery produces for one build
#[derive(Debug, Default)]
pub struct Discovery {
    /// Content items in discovery (file path) order
    pub items: Vec<ContentItem>,
    /// Non-markdown files to copy, as (full path, path relative to the source dir)
    pub assets: Vec<(PathBuf, String)>,
}

/// Loads content from the source directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
    include_drafts: bool,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            renderer: MarkdownRenderer::from_config(&site.config),
            include_drafts: false,
        }
    }

    /// Also load items marked `draft: true`
    pub fn with_drafts(mut self, include_drafts: bool) -> Self {
        self.include_drafts = include_drafts;
        self
    }

    /// Walk the source directory. The walk is sorted by file name so the
    /// resulting order is stable from one build to the next.
    pub fn discover(&self) -> Result<Discovery> {
        let source_dir = &self.site.source_dir;
        let mut discovery = Discovery::default();
        if !source_dir.exists() {
            tracing::warn!("Source directory {:?} does not exist", source_dir);
            return Ok(discovery);
        }

        let dir_data = DirectoryData::load(source_dir)?;
        let mut failures = Vec::new();

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let relative = path
                .strip_prefix(source_dir)
                .map(relative_key)
                .unwrap_or_else(|_| path.to_string_lossy().into_owned());

            if !is_markdown_file(path) {
                discovery.assets.push((path.to_path_buf(), relative));
                continue;
            }

            match self.load_item(path, relative, &dir_data) {
                Ok(item) if item.data.draft && !self.include_drafts => {
                    tracing::debug!("Skipping draft {}", item.source);
                }
                Ok(item) => discovery.items.push(item),
                Err(e) => {
                    tracing::warn!("Failed to load {:?}: {}", path, e);
                    failures.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(Error::Content(failures));
        }

        tracing::info!(
            "Discovered {} content items and {} assets",
            discovery.items.len(),
            discovery.assets.len()
        );
        Ok(discovery)
    }

    /// Load a single content item from a file
    fn load_item(&self, path: &Path, source: String, dir_data: &DirectoryData) -> Result<ContentItem> {
        let content = fs::read_to_string(path)?;
        let front_matter_error = |e: serde_yaml::Error| Error::FrontMatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let (own, body) = FrontMatter::split(&content).map_err(front_matter_error)?;
        let merged = dir_data.apply(&source, own);
        let fm = FrontMatter::from_mapping(merged).map_err(front_matter_error)?;

        let (excerpt_md, full_md) = MarkdownRenderer::split_excerpt(body);

        let mut item = ContentItem::new(source, fm);
        item.full_source = path.to_path_buf();
        item.raw = body.to_string();
        item.content = self.renderer.render(&full_md);
        item.excerpt = excerpt_md.map(|e| self.renderer.render(&e));

        Ok(item)
    }
}

/// Directories and files starting with `_` or `.` are not content
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('_') || s.starts_with('.'))
        .unwrap_or(false)
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}
