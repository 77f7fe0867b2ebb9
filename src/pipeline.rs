//! The build pipeline: discover, filter, sort and paginate, render, write.
//!
//! Each phase is a separate step so the intermediate results can be
//! inspected (and tested) without touching the public directory.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::collection::{duplicate_indexes, missing_index, tagged, Collections};
use crate::content::loader::{ContentLoader, Discovery};
use crate::content::ContentItem;
use crate::error::{Error, Result};
use crate::generator::{passthrough_files, Generator};
use crate::helpers::output_file;
use crate::pagination::{Page, Paginator};
use crate::Site;

/// Label used for the built-in listing in duplicate-output errors
pub const LISTING_SOURCE: &str = "<listing>";
/// Label used for the feed in duplicate-output errors
pub const FEED_SOURCE: &str = "<feed>";

/// What the pipeline decided to produce from one discovery
#[derive(Debug)]
pub struct Plan<'a> {
    pub collections: Collections<'a>,
    /// Post pages, ascending by index
    pub pages: Vec<Page<'a>>,
    /// Items rendered on their own, with their URL path
    pub standalone: Vec<(&'a ContentItem, String)>,
    /// Whether the built-in listing is written to `index.html`
    pub listing: bool,
    /// URL path (relative to the site root) of every routed item, by source
    pub urls: HashMap<String, String>,
    /// Every output file and the source that produces it
    pub outputs: IndexMap<String, String>,
}

impl<'a> Plan<'a> {
    /// URL path of an item, relative to the site root
    pub fn url_of(&self, item: &ContentItem) -> Option<&str> {
        self.urls.get(&item.source).map(String::as_str)
    }
}

/// Summary of a finished build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub items: usize,
    pub posts: usize,
    pub pages: usize,
    pub standalone: usize,
    pub files_written: usize,
    pub assets_copied: usize,
    pub elapsed: Duration,
}

/// Runs the build phases for one site
pub struct Pipeline<'a> {
    site: &'a Site,
    include_drafts: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            include_drafts: false,
        }
    }

    /// Include items marked `draft: true`
    pub fn with_drafts(mut self, include_drafts: bool) -> Self {
        self.include_drafts = include_drafts;
        self
    }

    /// Phase 1: load every content item and asset
    pub fn discover(&self) -> Result<Discovery> {
        ContentLoader::new(self.site)
            .with_drafts(self.include_drafts)
            .discover()
    }

    /// Phases 2 and 3: filter by tag, order, paginate and route every output
    pub fn plan<'d>(&self, discovery: &'d Discovery) -> Result<Plan<'d>> {
        let config = &self.site.config;
        let tag = config.collection.tag.as_str();
        let posts = tagged(&discovery.items, tag);

        self.check_indexes(&posts)?;

        let collections = Collections::build(&discovery.items, tag);
        let pages = Paginator::from_config(&config.collection).paginate(&posts);

        let mut urls = HashMap::new();
        let mut outputs = Outputs::default();

        for page in &pages {
            outputs.claim(output_file(&page.url), page_source(page))?;
            // several items share a page: link each to its own section
            let shared = page.items.len() > 1;
            for item in &page.items {
                let url = if shared {
                    format!("{}#{}", page.url, item.id)
                } else {
                    page.url.clone()
                };
                urls.insert(item.source.clone(), url);
            }
        }

        let mut standalone = Vec::new();
        for item in discovery.items.iter().filter(|i| !i.has_tag(tag)) {
            let url = item.standalone_path();
            outputs.claim(output_file(&url), item.source.clone())?;
            urls.insert(item.source.clone(), url.clone());
            standalone.push((item, url));
        }

        let listing = !outputs.contains("index.html");
        if listing {
            outputs.claim("index.html".to_string(), LISTING_SOURCE.to_string())?;
        } else {
            tracing::info!("index.html comes from content, skipping the built-in listing");
        }

        if config.feed.enable {
            outputs.claim(output_file(&config.feed.path), FEED_SOURCE.to_string())?;
        }

        for (_, relative) in &discovery.assets {
            outputs.claim(relative.clone(), relative.clone())?;
        }

        for (_, relative) in passthrough_files(self.site) {
            outputs.claim(relative.clone(), format!("passthrough {}", relative))?;
        }

        tracing::info!(
            "Planned {} post page(s), {} standalone item(s), {} output file(s)",
            pages.len(),
            standalone.len(),
            outputs.files.len()
        );

        Ok(Plan {
            collections,
            pages,
            standalone,
            listing,
            urls,
            outputs: outputs.files,
        })
    }

    /// Run every phase and write the public directory
    pub fn run(&self) -> Result<BuildReport> {
        let start = Instant::now();

        let discovery = self.discover()?;
        let plan = self.plan(&discovery)?;

        let generator = Generator::new(self.site)?;
        let rendered = generator.render(&plan)?;
        let files_written = generator.write(&rendered)?;
        let assets_copied = generator.copy_assets(&discovery)? + generator.copy_passthrough()?;

        let report = BuildReport {
            items: discovery.items.len(),
            posts: plan.pages.iter().map(|p| p.items.len()).sum(),
            pages: plan.pages.len(),
            standalone: plan.standalone.len(),
            files_written,
            assets_copied,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            "Built {} file(s) and copied {} asset(s) in {:.2}s",
            report.files_written,
            report.assets_copied,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// Warn about missing and duplicated indexes; fail on a missing one in strict mode
    fn check_indexes(&self, posts: &[&ContentItem]) -> Result<()> {
        let collection = &self.site.config.collection;

        let missing = missing_index(posts);
        if !missing.is_empty() {
            if collection.strict_index {
                return Err(Error::MissingIndex {
                    tag: collection.tag.clone(),
                    count: missing.len(),
                    sources: missing,
                });
            }
            for source in &missing {
                tracing::warn!("{} has no numeric index and is ordered last", source);
            }
        }

        for (index, sources) in duplicate_indexes(posts) {
            tracing::warn!("index {} is shared by {}", index, sources.join(", "));
        }
        Ok(())
    }
}

fn page_source(page: &Page) -> String {
    page.items
        .iter()
        .map(|i| i.source.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output files claimed so far
#[derive(Default)]
struct Outputs {
    files: IndexMap<String, String>,
}

impl Outputs {
    fn claim(&mut self, output: String, source: String) -> Result<()> {
        if let Some(first) = self.files.get(&output) {
            return Err(Error::DuplicateOutput {
                output,
                first: first.clone(),
                second: source,
            });
        }
        self.files.insert(output, source);
        Ok(())
    }

    fn contains(&self, output: &str) -> bool {
        self.files.contains_key(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn post(src: &Path, id: &str, index: &str) {
        write(
            src,
            &format!("posts/{}.md", id),
            &format!("---\ntitle: {}\nindex: {}\ntags: post\n---\nBody of {}", id, index, id),
        );
    }

    fn blog(indexes: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("content");
        for (id, index) in indexes {
            post(&src, id, index);
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    fn ids(items: &[&ContentItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_listing_descends_and_pages_ascend() {
        let (_dir, site) = blog(&[("one", "1"), ("three", "3"), ("two", "2")]);
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();
        let plan = pipeline.plan(&discovery).unwrap();

        assert_eq!(ids(&plan.collections.sorted), vec!["three", "two", "one"]);
        let page_ids: Vec<String> = plan
            .pages
            .iter()
            .map(|p| p.item().unwrap().id.clone())
            .collect();
        assert_eq!(page_ids, vec!["one", "two", "three"]);
        assert!(plan.listing);
        assert_eq!(plan.outputs["posts/two/index.html"], "posts/two.md");
    }

    #[test]
    fn test_plan_is_idempotent() {
        let (_dir, site) = blog(&[("a", "2"), ("b", "2"), ("c", "x"), ("d", "1")]);
        let pipeline = Pipeline::new(&site);
        let first = pipeline.discover().unwrap();
        let second = pipeline.discover().unwrap();
        let p1 = pipeline.plan(&first).unwrap();
        let p2 = pipeline.plan(&second).unwrap();

        assert_eq!(ids(&p1.collections.sorted), ids(&p2.collections.sorted));
        assert_eq!(
            p1.outputs.keys().collect::<Vec<_>>(),
            p2.outputs.keys().collect::<Vec<_>>()
        );
        // equal indexes both survive; the non-numeric one is last
        assert_eq!(ids(&p1.collections.sorted), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_strict_index_fails_on_missing() {
        let (dir, _) = blog(&[("a", "1"), ("b", "''")]);
        write(dir.path(), "quire.yml", "collection:\n  strict_index: true\n");
        let site = Site::new(dir.path()).unwrap();
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();

        match pipeline.plan(&discovery).unwrap_err() {
            Error::MissingIndex { count, sources, .. } => {
                assert_eq!(count, 1);
                assert_eq!(sources, vec!["posts/b.md"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_output_names_both_sources() {
        let (dir, site) = blog(&[]);
        let src = dir.path().join("content");
        write(&src, "about.md", "---\ntitle: About\n---\n");
        write(&src, "other.md", "---\npermalink: /about/\n---\n");
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();

        match pipeline.plan(&discovery).unwrap_err() {
            Error::DuplicateOutput { output, first, second } => {
                assert_eq!(output, "about/index.html");
                assert_eq!(first, "about.md");
                assert_eq!(second, "other.md");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_content_index_replaces_listing() {
        let (dir, site) = blog(&[("a", "1")]);
        write(&dir.path().join("content"), "index.md", "---\nlayout: index\n---\n");
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();
        let plan = pipeline.plan(&discovery).unwrap();

        assert!(!plan.listing);
        assert_eq!(plan.outputs["index.html"], "index.md");
    }

    #[test]
    fn test_empty_site_plans_listing_only() {
        let (_dir, site) = blog(&[]);
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();
        let plan = pipeline.plan(&discovery).unwrap();

        assert!(plan.pages.is_empty());
        assert!(plan.listing);
        let outputs: Vec<&String> = plan.outputs.keys().collect();
        assert_eq!(outputs, vec!["index.html", "feed.xml"]);
    }

    #[test]
    fn test_larger_pages_render_every_item() {
        let (dir, _) = blog(&[("a", "1"), ("b", "2"), ("c", "3")]);
        write(dir.path(), "quire.yml", "collection:\n  page_size: 2\n");
        let site = Site::new(dir.path()).unwrap();

        let report = Pipeline::new(&site).run().unwrap();
        assert_eq!(report.pages, 2);
        assert_eq!(report.posts, 3);

        let public = dir.path().join("_site");
        let first = fs::read_to_string(public.join("posts/a/index.html")).unwrap();
        assert!(first.contains("Body of a"));
        assert!(first.contains("Body of b"));
        assert!(first.contains("id=\"b\""));
        let second = fs::read_to_string(public.join("posts/c/index.html")).unwrap();
        assert!(second.contains("Body of c"));

        // the listing links b to its section on the shared page
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("href=\"/posts/a/#b\""));
    }

    #[test]
    fn test_passthrough_cannot_replace_generated_files() {
        let (dir, _) = blog(&[("a", "1")]);
        write(dir.path(), "quire.yml", "passthrough:\n  - index.html\n");
        write(dir.path(), "index.html", "STATIC");
        let site = Site::new(dir.path()).unwrap();

        match Pipeline::new(&site).run().unwrap_err() {
            Error::DuplicateOutput { output, first, second } => {
                assert_eq!(output, "index.html");
                assert_eq!(first, LISTING_SOURCE);
                assert_eq!(second, "passthrough index.html");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("_site/index.html").exists());
    }

    #[test]
    fn test_passthrough_directories_are_claimed() {
        let (dir, _) = blog(&[]);
        write(dir.path(), "quire.yml", "passthrough:\n  - static\n");
        write(dir.path(), "static/feed.xml", "<feed/>");
        let site = Site::new(dir.path()).unwrap();
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();

        // passthrough keeps its directory, so static/feed.xml does not clash with feed.xml
        let plan = pipeline.plan(&discovery).unwrap();
        assert_eq!(plan.outputs["static/feed.xml"], "passthrough static/feed.xml");
    }

    #[test]
    fn test_run_writes_site() {
        let (dir, site) = blog(&[("first", "1"), ("second", "2")]);
        let src = dir.path().join("content");
        write(&src, "resume.md", "---\ntitle: Resume\n---\n# Work");
        write(&src, "img/a.png", "png");

        let report = Pipeline::new(&site).run().unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(report.pages, 2);
        assert_eq!(report.standalone, 1);
        assert_eq!(report.assets_copied, 1);

        let public = dir.path().join("_site");
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        let second = index.find("/posts/second/").unwrap();
        let first = index.find("/posts/first/").unwrap();
        assert!(second < first);

        let page = fs::read_to_string(public.join("posts/first/index.html")).unwrap();
        assert!(page.contains("Body of first"));
        assert!(page.contains("href=\"/posts/second/\""));

        assert!(public.join("resume/index.html").exists());
        assert!(public.join("img/a.png").exists());
        assert!(public.join("feed.xml").exists());
    }
}
