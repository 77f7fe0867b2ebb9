//! Generator module - renders a build plan with Tera templates and writes it out

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::content::data::{load_global_data, relative_key};
use crate::content::loader::Discovery;
use crate::content::ContentItem;
use crate::error::Result;
use crate::helpers::{
    absolutize_urls, escape_xml, full_url_for, output_file, strip_invalid_xml_chars, url_for,
};
use crate::pagination::Page;
use crate::pipeline::Plan;
use crate::templates::{ItemData, PaginationData, SiteData, TemplateRenderer};
use crate::Site;

/// One rendered output file, relative to the public directory
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub path: String,
    pub contents: String,
}

/// Static site generator using Tera templates
pub struct Generator<'a> {
    site: &'a Site,
    renderer: TemplateRenderer,
    data: IndexMap<String, serde_json::Value>,
}

impl<'a> Generator<'a> {
    /// Create a new generator, loading template overrides and global data
    pub fn new(site: &'a Site) -> Result<Self> {
        let renderer = TemplateRenderer::with_overrides(&site.templates_dir)?;
        let data = load_global_data(&site.data_dir)?;

        Ok(Self {
            site,
            renderer,
            data,
        })
    }

    /// Render every output of the plan without touching the disk
    pub fn render(&self, plan: &Plan) -> Result<Vec<Rendered>> {
        let items = self.item_data(plan);
        let base = self.create_base_context(plan, &items);
        let mut rendered = Vec::new();

        if plan.listing {
            rendered.push(self.render_listing(&base)?);
        }

        for page in &plan.pages {
            rendered.push(self.render_post_page(&base, page, &items)?);
        }

        for (item, url) in &plan.standalone {
            rendered.push(self.render_standalone(&base, item, url, &items)?);
        }

        if self.site.config.feed.enable {
            rendered.push(self.generate_atom_feed(plan, &items));
        }

        tracing::info!("Rendered {} file(s)", rendered.len());
        Ok(rendered)
    }

    /// Write rendered files into the public directory
    pub fn write(&self, rendered: &[Rendered]) -> Result<usize> {
        fs::create_dir_all(&self.site.public_dir)?;

        for file in rendered {
            let output_path = self.site.public_dir.join(&file.path);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, &file.contents)?;
            tracing::debug!("Generated: {:?}", output_path);
        }

        Ok(rendered.len())
    }

    /// Copy non-markdown files from the source directory
    pub fn copy_assets(&self, discovery: &Discovery) -> Result<usize> {
        let mut copied = 0;
        for (path, relative) in &discovery.assets {
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            match fs::copy(path, &dest) {
                Ok(_) => copied += 1,
                Err(e) => tracing::warn!("Failed to copy asset {:?}: {}", path, e),
            }
        }
        Ok(copied)
    }

    /// Copy each `passthrough` path, relative to the site root, into the public directory
    pub fn copy_passthrough(&self) -> Result<usize> {
        let mut copied = 0;
        for (source, relative) in passthrough_files(self.site) {
            copied += copy_file(&source, &self.site.public_dir.join(&relative))?;
        }

        if copied > 0 {
            tracing::info!("Copied {} passthrough file(s)", copied);
        }
        Ok(copied)
    }

    /// Template data for every routed item, by source
    fn item_data(&self, plan: &Plan) -> HashMap<String, ItemData> {
        plan.collections
            .all
            .iter()
            .map(|item| {
                let url = url_for(&self.site.config, plan.url_of(item).unwrap_or_default());
                (item.source.clone(), ItemData::new(item, url))
            })
            .collect()
    }

    /// Context shared by every template: site, collections, data and the listing
    fn create_base_context(&self, plan: &Plan, items: &HashMap<String, ItemData>) -> Context {
        let config = &self.site.config;
        let to_data = |list: &[&ContentItem]| -> Vec<ItemData> {
            list.iter()
                .filter_map(|item| items.get(&item.source).cloned())
                .collect()
        };

        let mut collections: IndexMap<String, Vec<ItemData>> = IndexMap::new();
        collections.insert("all".to_string(), to_data(&plan.collections.all));
        let mut tags: Vec<&String> = plan.collections.by_tag.keys().collect();
        tags.sort();
        for tag in tags {
            collections.insert(tag.clone(), to_data(&plan.collections.by_tag[tag]));
        }
        let sorted = to_data(&plan.collections.sorted);
        collections.insert(config.collection.name.clone(), sorted.clone());

        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(config));
        context.insert("collections", &collections);
        context.insert("posts", &sorted);
        context.insert("data", &self.data);
        context.insert("current_year", &chrono::Local::now().format("%Y").to_string());
        context
    }

    fn page_context(&self, base: &Context, url: &str) -> Context {
        let mut context = base.clone();
        let mut page = HashMap::new();
        page.insert("url", url_for(&self.site.config, url));
        page.insert("permalink", full_url_for(&self.site.config, url));
        context.insert("page", &page);
        context
    }

    /// The listing of the sorted collection, highest index first
    fn render_listing(&self, base: &Context) -> Result<Rendered> {
        let context = self.page_context(base, "");
        let contents = self.renderer.render("index.html", &context)?;
        Ok(Rendered {
            path: "index.html".to_string(),
            contents,
        })
    }

    /// One page of the collection, rendered with `post.html`
    fn render_post_page(
        &self,
        base: &Context,
        page: &Page,
        items: &HashMap<String, ItemData>,
    ) -> Result<Rendered> {
        let page_items: Vec<ItemData> = page
            .items
            .iter()
            .filter_map(|item| items.get(&item.source).cloned())
            .collect();

        let mut context = self.page_context(base, &page.url);
        if let Some(first) = page_items.first() {
            context.insert("post", first);
        }
        let pagination = PaginationData::new(
            page,
            self.site.config.collection.page_size,
            page_items,
            |path| url_for(&self.site.config, path),
        );
        context.insert("pagination", &pagination);

        let contents = self.renderer.render("post.html", &context)?;
        Ok(Rendered {
            path: output_file(&page.url),
            contents,
        })
    }

    /// An item outside the collection, rendered with its layout or `page.html`
    fn render_standalone(
        &self,
        base: &Context,
        item: &ContentItem,
        url: &str,
        items: &HashMap<String, ItemData>,
    ) -> Result<Rendered> {
        let template = item
            .data
            .layout
            .as_deref()
            .map(|layout| format!("{}.html", layout))
            .filter(|name| self.renderer.has_template(name))
            .unwrap_or_else(|| "page.html".to_string());

        let mut context = self.page_context(base, url);
        if let Some(data) = items.get(&item.source) {
            context.insert("item", data);
        }

        let contents = self.renderer.render(&template, &context)?;
        tracing::debug!("Rendered {} with {}", item.source, template);
        Ok(Rendered {
            path: output_file(url),
            contents,
        })
    }

    /// Atom feed of the first `feed.limit` items of the sorted collection
    fn generate_atom_feed(&self, plan: &Plan, items: &HashMap<String, ItemData>) -> Rendered {
        let config = &self.site.config;
        let site_url = full_url_for(config, "");
        let base_url = config.url.trim_end_matches('/');

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, &config.feed.path)
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", site_url));
        feed.push_str(&format!(
            "  <updated>{}</updated>\n",
            chrono::Utc::now().to_rfc3339()
        ));
        feed.push_str(&format!("  <id>{}</id>\n", site_url));
        feed.push_str(&format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.author)
        ));

        for item in plan.collections.sorted.iter().take(config.feed.limit) {
            let link = full_url_for(config, plan.url_of(item).unwrap_or_default());
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&item.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            if let Some(date) = item.date {
                feed.push_str(&format!("    <published>{}</published>\n", date.to_rfc3339()));
                feed.push_str(&format!("    <updated>{}</updated>\n", date.to_rfc3339()));
            }

            let content = items
                .get(&item.source)
                .and_then(|d| d.excerpt.as_ref())
                .unwrap_or(&item.content);
            let content = strip_invalid_xml_chars(&absolutize_urls(content, base_url));
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        Rendered {
            path: output_file(&config.feed.path),
            contents: feed,
        }
    }
}

/// Every file under the `passthrough` entries, as (full path, output path)
pub fn passthrough_files(site: &Site) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();

    for entry in &site.config.passthrough {
        let relative = entry.trim_start_matches('/').trim_end_matches('/');
        let source = site.base_dir.join(relative);
        if !source.exists() {
            tracing::warn!("Passthrough path {:?} does not exist", source);
            continue;
        }

        if source.is_file() {
            files.push((source, relative.to_string()));
            continue;
        }

        for file in WalkDir::new(&source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(inner) = file.path().strip_prefix(&source) else {
                continue;
            };
            let output = format!("{}/{}", relative, relative_key(inner));
            files.push((file.path().to_path_buf(), output));
        }
    }

    files
}

fn copy_file(source: &Path, dest: &Path) -> Result<usize> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::copy(source, dest) {
        Ok(_) => Ok(1),
        Err(e) => {
            tracing::warn!("Failed to copy {:?}: {}", source, e);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn render_site(dir: &TempDir) -> Vec<Rendered> {
        let site = Site::new(dir.path()).unwrap();
        let pipeline = Pipeline::new(&site);
        let discovery = pipeline.discover().unwrap();
        let plan = pipeline.plan(&discovery).unwrap();
        Generator::new(&site).unwrap().render(&plan).unwrap()
    }

    fn find<'r>(rendered: &'r [Rendered], path: &str) -> &'r str {
        &rendered
            .iter()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("{path} not rendered"))
            .contents
    }

    #[test]
    fn test_layout_template_and_global_data() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_data/links.yml", "github: https://github.com/someone\n");
        write(
            dir.path(),
            "_templates/resume.html",
            "{{ item.title }}|{{ data.links.github }}|{{ collections.sortedPosts | length }}",
        );
        write(dir.path(), "content/resume.md", "---\ntitle: CV\nlayout: resume\n---\n");
        write(dir.path(), "content/posts/a.md", "---\ntags: post\nindex: 1\n---\n");

        let rendered = render_site(&dir);
        assert_eq!(
            find(&rendered, "resume/index.html"),
            "CV|https://github.com/someone|1"
        );
    }

    #[test]
    fn test_unknown_layout_falls_back_to_page() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/about.md", "---\ntitle: About\nlayout: nope\n---\nHi");

        let rendered = render_site(&dir);
        let html = find(&rendered, "about/index.html");
        assert!(html.contains("<h1>About</h1>"));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_feed_lists_highest_index_first() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "quire.yml",
            "url: https://blog.example\nfeed:\n  limit: 2\n",
        );
        for (id, index) in [("a", 1), ("b", 3), ("c", 2)] {
            write(
                dir.path(),
                &format!("content/posts/{}.md", id),
                &format!("---\ntitle: Post {}\ntags: post\nindex: {}\n---\n[x](/img.png)", id, index),
            );
        }

        let rendered = render_site(&dir);
        let feed = find(&rendered, "feed.xml");
        assert_eq!(feed.matches("<entry>").count(), 2);
        let b = feed.find("Post b").unwrap();
        let c = feed.find("Post c").unwrap();
        assert!(b < c);
        assert!(!feed.contains("Post a"));
        assert!(feed.contains("<link href=\"https://blog.example/posts/b/\"/>"));
        assert!(feed.contains("href=\"https://blog.example/img.png\""));
    }

    #[test]
    fn test_post_page_links_neighbours() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/posts/_dir.yml", "tags: post\n");
        write(dir.path(), "content/posts/one.md", "---\ntitle: One\nindex: 1\n---\n");
        write(dir.path(), "content/posts/two.md", "---\ntitle: Two\nindex: 2\n---\n");

        let rendered = render_site(&dir);
        let one = find(&rendered, "posts/one/index.html");
        assert!(one.contains("<h1>One</h1>"));
        assert!(one.contains("href=\"/posts/two/\""));
        assert!(!one.contains("class=\"prev\""));
    }

    #[test]
    fn test_passthrough_copies_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "quire.yml", "passthrough:\n  - css\n  - missing\n");
        write(dir.path(), "css/site.css", "body {}");
        write(dir.path(), "css/vendor/x.css", "");

        let site = Site::new(dir.path()).unwrap();
        let copied = Generator::new(&site).unwrap().copy_passthrough().unwrap();
        assert_eq!(copied, 2);
        assert!(site.public_dir.join("css/vendor/x.css").exists());
    }
}
