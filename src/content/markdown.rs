//! Markdown rendering with syntax highlighting, callouts and diagram blocks

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::{HighlightConfig, MarkdownConfig, SiteConfig};

lazy_static! {
    /// `> [!note] Optional title`, with an optional fold marker after the type
    static ref CALLOUT_START: Regex =
        Regex::new(r"^ {0,3}> ?\[!([A-Za-z][A-Za-z0-9_-]*)\][+-]?[ \t]*(.*)$").unwrap();
}

const MORE_MARKER: &str = "<!-- more -->";

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
    highlight: bool,
    line_numbers: bool,
    callouts: bool,
    diagrams: bool,
}

/// A callout lifted out of the source before parsing
struct Callout {
    kind: String,
    title: String,
    body: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer with default settings
    pub fn new() -> Self {
        Self::with_options(&HighlightConfig::default(), &MarkdownConfig::default())
    }

    /// Create a renderer for a site
    pub fn from_config(config: &SiteConfig) -> Self {
        Self::with_options(&config.highlight, &config.markdown)
    }

    /// Create with custom settings
    pub fn with_options(highlight: &HighlightConfig, markdown: &MarkdownConfig) -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(&highlight.theme).or_else(|| {
            tracing::warn!(
                "Unknown highlight theme '{}', using the first bundled theme",
                highlight.theme
            );
            theme_set.themes.into_values().next()
        });

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            highlight: highlight.enable,
            line_numbers: highlight.line_number,
            callouts: markdown.callouts,
            diagrams: markdown.diagrams,
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let (markdown, callouts) = if self.callouts {
            extract_callouts(markdown)
        } else {
            (markdown.to_string(), Vec::new())
        };

        let mut html_output = self.render_events(&markdown);

        for (i, callout) in callouts.iter().enumerate() {
            let placeholder = format!("<p>{}</p>\n", placeholder(i));
            html_output = html_output.replacen(&placeholder, &self.render_callout(callout), 1);
        }

        html_output
    }

    fn render_events(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_DEFINITION_LIST;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                    in_code_block = true;
                }
                Event::End(TagEnd::CodeBlock) => {
                    let block = self.code_block(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(block)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                _ if in_code_block => {}
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    fn render_callout(&self, callout: &Callout) -> String {
        format!(
            "<div class=\"callout callout-{kind}\" data-callout=\"{kind}\"><p class=\"callout-title\">{title}</p><div class=\"callout-body\">\n{body}</div></div>\n",
            kind = callout.kind,
            title = html_escape(&callout.title),
            body = self.render(&callout.body),
        )
    }

    /// Render one fenced or indented code block
    fn code_block(&self, code: &str, lang: Option<&str>) -> String {
        if self.diagrams && lang == Some("mermaid") {
            return format!("<pre class=\"mermaid\">{}</pre>\n", html_escape(code));
        }

        let lang = lang.unwrap_or("text");
        let plain = || {
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                lang,
                html_escape(code)
            )
        };

        let Some(theme) = self.theme.as_ref().filter(|_| self.highlight) else {
            return plain();
        };

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) if self.line_numbers => add_line_numbers(&highlighted, code, lang),
            Ok(highlighted) => format!(
                "<figure class=\"highlight {}\">{}</figure>\n",
                lang, highlighted
            ),
            Err(e) => {
                tracing::debug!("Highlighting {} failed: {}", lang, e);
                plain()
            }
        }
    }

    /// Parse excerpt from content (split by <!-- more -->)
    pub fn split_excerpt(content: &str) -> (Option<String>, String) {
        if let Some(pos) = content.find(MORE_MARKER) {
            let excerpt = content[..pos].trim().to_string();
            let remaining = content[pos + MORE_MARKER.len()..].trim().to_string();
            let full = format!("{}\n\n{}", excerpt, remaining);
            (Some(excerpt), full)
        } else {
            (None, content.to_string())
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder(i: usize) -> String {
    format!("QUIRECALLOUT{}END", i)
}

/// Replace every callout blockquote with a placeholder paragraph.
/// Fenced code is copied through untouched.
fn extract_callouts(markdown: &str) -> (String, Vec<Callout>) {
    let mut output = String::with_capacity(markdown.len());
    let mut callouts = Vec::new();
    let mut fence: Option<&str> = None;
    let mut lines = markdown.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            output.push_str(line);
            output.push('\n');
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            output.push_str(line);
            output.push('\n');
            continue;
        }

        let Some(caps) = CALLOUT_START.captures(line) else {
            output.push_str(line);
            output.push('\n');
            continue;
        };

        let kind = caps[1].to_lowercase();
        let title = match caps[2].trim() {
            "" => capitalize(&kind),
            t => t.to_string(),
        };

        let mut body = String::new();
        while let Some(next) = lines.peek() {
            let Some(quoted) = next.trim_start().strip_prefix('>') else {
                break;
            };
            body.push_str(quoted.strip_prefix(' ').unwrap_or(quoted));
            body.push('\n');
            lines.next();
        }

        output.push('\n');
        output.push_str(&placeholder(callouts.len()));
        output.push_str("\n\n");
        callouts.push(Callout { kind, title, body });
    }

    (output, callouts)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Add a line-number gutter next to highlighted code
fn add_line_numbers(highlighted: &str, code: &str, lang: &str) -> String {
    let gutter = (1..=code.lines().count().max(1))
        .map(|n| format!("<span class=\"line-number\">{}</span>", n))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<figure class=\"highlight {}\"><table><tr><td class=\"gutter\"><pre>{}</pre></td><td class=\"code\">{}</td></tr></table></figure>\n",
        lang, gutter, highlighted
    )
}

/// Simple HTML escaping
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("<figure class=\"highlight rust\">"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_code_block_without_highlighting() {
        let highlight = HighlightConfig {
            enable: false,
            ..Default::default()
        };
        let renderer = MarkdownRenderer::with_options(&highlight, &MarkdownConfig::default());
        let html = renderer.render("```js\nlet a = 1 < 2;\n```");
        assert!(html.contains("<pre><code class=\"language-js\">let a = 1 &lt; 2;"));
    }

    #[test]
    fn test_line_numbers() {
        let highlight = HighlightConfig {
            line_number: true,
            ..Default::default()
        };
        let renderer = MarkdownRenderer::with_options(&highlight, &MarkdownConfig::default());
        let html = renderer.render("```python\na = 1\nb = 2\n```");
        assert!(html.contains("<span class=\"line-number\">2</span>"));
        assert!(!html.contains("<span class=\"line-number\">3</span>"));
    }

    #[test]
    fn test_mermaid_block_is_not_highlighted() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```mermaid\ngraph TD\n  A-->B\n```");
        assert!(html.contains("<pre class=\"mermaid\">graph TD\n  A--&gt;B\n</pre>"));
        assert!(!html.contains("highlight"));
    }

    #[test]
    fn test_callout_with_title() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("Intro\n\n> [!WARNING] Mind the gap\n> Body *text*\n\nAfter");
        assert!(html.contains("<div class=\"callout callout-warning\""));
        assert!(html.contains("<p class=\"callout-title\">Mind the gap</p>"));
        assert!(html.contains("<em>text</em>"));
        assert!(html.contains("<p>After</p>"));
        assert!(!html.contains("QUIRECALLOUT"));
        assert!(!html.contains("<blockquote>"));
    }

    #[test]
    fn test_callout_default_title() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("> [!tip]\n> Use the defaults.");
        assert!(html.contains("<p class=\"callout-title\">Tip</p>"));
        assert!(html.contains("Use the defaults."));
    }

    #[test]
    fn test_plain_blockquote_untouched() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("> just a quote");
        assert!(html.contains("<blockquote>"));
        assert!(!html.contains("callout"));
    }

    #[test]
    fn test_callout_inside_fence_untouched() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```markdown\n> [!note]\n> text\n```");
        assert!(!html.contains("callout-note"));
    }

    #[test]
    fn test_callouts_disabled() {
        let markdown = MarkdownConfig {
            callouts: false,
            ..Default::default()
        };
        let renderer = MarkdownRenderer::with_options(&HighlightConfig::default(), &markdown);
        let html = renderer.render("> [!note] Title\n> text");
        assert!(html.contains("<blockquote>"));
        assert!(!html.contains("callout-note"));
    }

    #[test]
    fn test_split_excerpt() {
        let content = "This is excerpt.\n<!-- more -->\nThis is more content.";
        let (excerpt, full) = MarkdownRenderer::split_excerpt(content);
        assert_eq!(excerpt, Some("This is excerpt.".to_string()));
        assert!(full.contains("This is excerpt."));
        assert!(full.contains("This is more content."));
    }
}
