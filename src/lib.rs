//! quire: a small static blog generator
//!
//! Markdown content with YAML front-matter is discovered from the source
//! directory, the tagged collection is ordered by its hand-assigned `index`,
//! split into pages and rendered through Tera templates into the public
//! directory.

pub mod collection;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pagination;
pub mod pipeline;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

/// Name of the configuration file at the site root
pub const CONFIG_FILE: &str = "quire.yml";

/// A site on disk: its configuration and resolved directories
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory
    pub source_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Template override directory
    pub templates_dir: PathBuf,
    /// Global data directory
    pub data_dir: PathBuf,
}

impl Site {
    /// Open the site rooted at `base_dir`, reading `quire.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        Self {
            source_dir: base_dir.join(&config.source_dir),
            public_dir: base_dir.join(&config.public_dir),
            templates_dir: base_dir.join(&config.templates_dir),
            data_dir: base_dir.join(&config.data_dir),
            config,
            base_dir,
        }
    }

    /// Path of the configuration file
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Build the site into the public directory
    pub fn build(&self, include_drafts: bool) -> Result<pipeline::BuildReport> {
        pipeline::Pipeline::new(self)
            .with_drafts(include_drafts)
            .run()
    }
}
