//! List site content

use anyhow::Result;
use std::fmt::Write;

use crate::pipeline::Pipeline;
use crate::Site;

/// Print site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    print!("{}", render(site, content_type)?);
    Ok(())
}

/// List site content by type: `posts` in listing order, `pages`, or `tags`
pub fn render(site: &Site, content_type: &str) -> Result<String> {
    let pipeline = Pipeline::new(site);
    let discovery = pipeline.discover()?;
    let plan = pipeline.plan(&discovery)?;
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts = &plan.collections.sorted;
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in posts {
                let index = post
                    .index()
                    .as_f64()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(out, "  {:>4}  {} [{}]", index, post.title, post.source)?;
            }
        }
        "page" | "pages" => {
            writeln!(out, "Pages ({}):", plan.standalone.len())?;
            for (page, url) in &plan.standalone {
                writeln!(out, "  {} -> /{} [{}]", page.title, url, page.source)?;
            }
        }
        "tag" | "tags" => {
            let mut tags: Vec<(&String, usize)> = plan
                .collections
                .by_tag
                .iter()
                .map(|(tag, items)| (tag, items.len()))
                .collect();
            tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

            writeln!(out, "Tags ({}):", tags.len())?;
            for (tag, count) in tags {
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: posts, pages, tags",
                content_type
            );
        }
    }

    Ok(out)
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

    fn site() -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("content");
        write(&src, "posts/a.md", "---\ntitle: A\nindex: 1\ntags: [post, rust]\n---\n");
        write(&src, "posts/b.md", "---\ntitle: B\nindex: 2\ntags: post\n---\n");
        write(&src, "posts/c.md", "---\ntitle: C\ntags: post\n---\n");
        write(&src, "resume.md", "---\ntitle: Resume\n---\n");
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_list_posts_in_listing_order() {
        let (_dir, site) = site();
        let out = render(&site, "posts").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Posts (3):");
        assert!(lines[1].contains("2  B [posts/b.md]"));
        assert!(lines[2].contains("1  A [posts/a.md]"));
        assert!(lines[3].contains("-  C [posts/c.md]"));
    }

    #[test]
    fn test_list_pages_and_tags() {
        let (_dir, site) = site();
        let pages = render(&site, "pages").unwrap();
        assert!(pages.contains("Resume -> /resume/ [resume.md]"));

        let tags = render(&site, "tags").unwrap();
        assert_eq!(tags, "Tags (2):\n  post (3)\n  rust (1)\n");
    }

    #[test]
    fn test_unknown_type() {
        let (_dir, site) = site();
        assert!(render(&site, "routes").is_err());
    }
}
