//! Site configuration (quire.yml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,
    pub templates_dir: String,
    pub data_dir: String,
    #[serde(default)]
    pub passthrough: Vec<String>,
    #[serde(default)]
    pub stylesheets: Vec<String>,

    // Collections
    #[serde(default)]
    pub collection: CollectionConfig,

    // Writing
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,

    // Feed
    #[serde(default)]
    pub feed: FeedConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Quire".to_string(),
            description: String::new(),
            author: "John Doe".to_string(),
            language: "en".to_string(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            source_dir: "content".to_string(),
            public_dir: "_site".to_string(),
            templates_dir: "_templates".to_string(),
            data_dir: "_data".to_string(),
            passthrough: Vec::new(),
            stylesheets: Vec::new(),

            collection: CollectionConfig::default(),

            highlight: HighlightConfig::default(),
            markdown: MarkdownConfig::default(),

            feed: FeedConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from YAML text; an empty document yields the defaults
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SiteConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.collection.page_size == 0 {
            return Err(Error::Config(
                "collection.page_size must be at least 1".to_string(),
            ));
        }
        if self.collection.tag.trim().is_empty() {
            return Err(Error::Config("collection.tag must not be empty".to_string()));
        }
        if self.collection.name.trim().is_empty() {
            return Err(Error::Config(
                "collection.name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The tagged collection that gets sorted for listing and paginated for post pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub tag: String,
    pub name: String,
    pub page_size: usize,
    pub permalink: String,
    pub strict_index: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            tag: "post".to_string(),
            name: "sortedPosts".to_string(),
            page_size: 1,
            permalink: "posts/:id/".to_string(),
            strict_index: false,
        }
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}

/// Markdown extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub callouts: bool,
    pub diagrams: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            callouts: true,
            diagrams: true,
        }
    }
}

/// Atom feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enable: bool,
    pub path: String,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "feed.xml".to_string(),
            limit: 20,
        }
    }
}
