//! Template rendering with the Tera template engine
//!
//! The built-in templates are embedded in the binary. Any `*.html` file in
//! the site's templates directory is loaded on top and replaces a built-in
//! template of the same name.

use chrono::format::{Item, StrftimeItems};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::content::data::relative_key;
use crate::content::ContentItem;
use crate::error::Result;
use crate::helpers::url_for;
use crate::pagination::{Page, PageLink};

/// Template renderer
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer with the built-in templates only
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Content is already HTML; templates escape titles explicitly
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("base.html", include_str!("builtin/base.html")),
            ("index.html", include_str!("builtin/index.html")),
            ("post.html", include_str!("builtin/post.html")),
            ("page.html", include_str!("builtin/page.html")),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Create a renderer and load overrides from `templates_dir`, if it exists
    pub fn with_overrides(templates_dir: &Path) -> Result<Self> {
        let mut renderer = Self::new()?;
        if !templates_dir.exists() {
            return Ok(renderer);
        }

        let files: Vec<(PathBuf, Option<String>)> = WalkDir::new(templates_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("html"))
            .filter_map(|e| {
                let name = e.path().strip_prefix(templates_dir).ok().map(relative_key)?;
                Some((e.path().to_path_buf(), Some(name)))
            })
            .collect();

        if !files.is_empty() {
            tracing::info!("Loading {} template(s) from {:?}", files.len(), templates_dir);
            renderer.tera.add_template_files(files)?;
        }
        Ok(renderer)
    }

    /// Whether a template with this name is loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(crate::helpers::strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => " ...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Tera filter: reformat a `YYYY-MM-DD` date
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "YYYY-MM-DD".to_string(),
    };

    let pattern = match format.as_str() {
        "LL" => "%B %-d, %Y",
        "YYYY-MM-DD" => "%Y-%m-%d",
        other => other,
    };
    // Formatting with an invalid specifier panics inside Display
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(tera::Error::msg(format!(
            "date_format: invalid format string `{}`",
            format
        )));
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return Ok(tera::Value::String(date.format(pattern).to_string()));
    }

    Ok(tera::Value::String(s))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub collection_name: String,
    pub stylesheets: Vec<String>,
    pub feed_url: Option<String>,
    pub diagrams: bool,
    pub generator_version: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: url_for(config, ""),
            collection_name: config.collection.name.clone(),
            stylesheets: config
                .stylesheets
                .iter()
                .map(|s| url_for(config, s))
                .collect(),
            feed_url: config
                .feed
                .enable
                .then(|| url_for(config, &config.feed.path)),
            diagrams: config.markdown.diagrams,
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One content item as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct ItemData {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub index: crate::content::SortIndex,
    pub date: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub content: String,
    pub excerpt: Option<String>,
    /// Remaining front-matter keys
    pub data: indexmap::IndexMap<String, serde_yaml::Value>,
}

impl ItemData {
    pub fn new(item: &ContentItem, url: String) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            url,
            source: item.source.clone(),
            index: item.index(),
            date: item.date.map(|d| d.format("%Y-%m-%d").to_string()),
            description: item.data.description.clone(),
            tags: item.data.tags.clone(),
            content: item.content.clone(),
            excerpt: item.excerpt.clone(),
            data: item.data.extra.clone(),
        }
    }
}

/// Pagination state for one generated page
#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub size: usize,
    pub current: usize,
    pub total: usize,
    pub url: String,
    pub items: Vec<ItemData>,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
}

impl PaginationData {
    /// `url_of` maps a site-relative path to a public URL
    pub fn new(page: &Page, size: usize, items: Vec<ItemData>, url_of: impl Fn(&str) -> String) -> Self {
        let link = |l: &PageLink| PageLink {
            url: url_of(&l.url),
            ..l.clone()
        };
        Self {
            size,
            current: page.number,
            total: page.total,
            url: url_of(&page.url),
            items,
            prev: page.prev.as_ref().map(link),
            next: page.next.as_ref().map(link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let config = SiteConfig::default();
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&config));
        context.insert("current_year", "2024");
        context
    }

    #[test]
    fn test_builtin_templates_load() {
        let renderer = TemplateRenderer::new().unwrap();
        for name in ["base.html", "index.html", "post.html", "page.html"] {
            assert!(renderer.has_template(name), "{name} missing");
        }
    }

    #[test]
    fn test_render_empty_listing() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut ctx = context();
        ctx.insert("posts", &Vec::<ItemData>::new());
        let html = renderer.render("index.html", &ctx).unwrap();
        assert!(html.contains("No posts yet."));
        assert!(html.contains("<title>Quire</title>"));
    }

    #[test]
    fn test_override_replaces_builtin() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("page.html"), "custom {{ item.title }}").unwrap();
        std::fs::write(dir.path().join("resume.html"), "resume").unwrap();

        let renderer = TemplateRenderer::with_overrides(dir.path()).unwrap();
        assert!(renderer.has_template("resume.html"));

        let mut ctx = context();
        ctx.insert("item", &serde_json::json!({"title": "Hi"}));
        assert_eq!(renderer.render("page.html", &ctx).unwrap(), "custom Hi");
    }

    #[test]
    fn test_filters() {
        let args = HashMap::new();
        let v = strip_html_filter(&tera::Value::from("<p>a <b>b</b></p>"), &args).unwrap();
        assert_eq!(v, tera::Value::from("a b"));

        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let v = truncate_chars_filter(&tera::Value::from("Hello World"), &args).unwrap();
        assert_eq!(v, tera::Value::from("Hello ..."));

        let mut args = HashMap::new();
        args.insert("format".to_string(), tera::Value::from("LL"));
        let v = date_format_filter(&tera::Value::from("2023-05-03"), &args).unwrap();
        assert_eq!(v, tera::Value::from("May 3, 2023"));
    }

    #[test]
    fn test_date_format_rejects_bad_pattern() {
        let mut args = HashMap::new();
        args.insert("format".to_string(), tera::Value::from("%Q"));
        let err = date_format_filter(&tera::Value::from("2024-01-02"), &args).unwrap_err();
        assert!(err.to_string().contains("invalid format string"));

        args.insert("format".to_string(), tera::Value::from("%d/%m/%Y"));
        let v = date_format_filter(&tera::Value::from("2024-01-02"), &args).unwrap();
        assert_eq!(v, tera::Value::from("02/01/2024"));
    }

    #[test]
    fn test_bad_date_format_in_template_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("page.html"),
            r#"{{ "2024-01-02" | date_format(format="%Q") }}"#,
        )
        .unwrap();

        let renderer = TemplateRenderer::with_overrides(dir.path()).unwrap();
        assert!(renderer.render("page.html", &context()).is_err());
    }
}
