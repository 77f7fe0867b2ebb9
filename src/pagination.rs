//! Pagination of the tagged collection into generated pages

use serde::Serialize;

use crate::collection::sorted_ascending;
use crate::config::CollectionConfig;
use crate::content::{normalize_path, ContentItem};

/// Link to a neighbouring page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLink {
    pub number: usize,
    pub url: String,
    pub title: String,
}

/// One generated page and the items it carries
#[derive(Debug, Clone)]
pub struct Page<'a> {
    /// 1-based page number
    pub number: usize,
    /// Total number of pages
    pub total: usize,
    pub items: Vec<&'a ContentItem>,
    /// Output URL path relative to the site root
    pub url: String,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
}

impl<'a> Page<'a> {
    /// The page's item; with a page size of 1 this is the only one
    pub fn item(&self) -> Option<&'a ContentItem> {
        self.items.first().copied()
    }

    fn link(&self) -> PageLink {
        PageLink {
            number: self.number,
            url: self.url.clone(),
            title: self.item().map(|i| i.title.clone()).unwrap_or_default(),
        }
    }
}

/// Splits a collection into pages in ascending `index` order
#[derive(Debug, Clone)]
pub struct Paginator {
    size: usize,
    permalink: String,
}

impl Paginator {
    /// `permalink` may use `:id` (id of the page's first item) and `:page`
    pub fn new(size: usize, permalink: impl Into<String>) -> Self {
        Self {
            size: size.max(1),
            permalink: permalink.into(),
        }
    }

    pub fn from_config(config: &CollectionConfig) -> Self {
        Self::new(config.page_size, config.permalink.clone())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Order `items` ascending by index and cut them into pages
    pub fn paginate<'a>(&self, items: &[&'a ContentItem]) -> Vec<Page<'a>> {
        let ordered = sorted_ascending(items);
        let total = ordered.len().div_ceil(self.size);

        let mut pages: Vec<Page<'a>> = ordered
            .chunks(self.size)
            .enumerate()
            .map(|(i, chunk)| {
                let number = i + 1;
                Page {
                    number,
                    total,
                    url: self.page_url(number, chunk[0]),
                    items: chunk.to_vec(),
                    prev: None,
                    next: None,
                }
            })
            .collect();

        let links: Vec<PageLink> = pages.iter().map(Page::link).collect();
        for (i, page) in pages.iter_mut().enumerate() {
            page.prev = i.checked_sub(1).map(|p| links[p].clone());
            page.next = links.get(i + 1).cloned();
        }

        tracing::debug!("Paginated {} items into {} pages", ordered.len(), total);
        pages
    }

    /// Output URL for page `number` whose first item is `first`
    pub fn page_url(&self, number: usize, first: &ContentItem) -> String {
        let url = self
            .permalink
            .replace(":id", &first.id)
            .replace(":page", &number.to_string());
        normalize_path(&url)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::from_config(&CollectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tagged;
    use crate::content::{FrontMatter, SortIndex};

    fn post(id: &str, index: SortIndex) -> ContentItem {
        let fm = FrontMatter {
            id: Some(id.to_string()),
            title: Some(id.to_uppercase()),
            index,
            tags: vec!["post".to_string()],
            ..Default::default()
        };
        ContentItem::new(format!("posts/{}.md", id), fm)
    }

    #[test]
    fn test_one_page_per_item_ascending() {
        let items = vec![
            post("one", SortIndex::Number(1.0)),
            post("three", SortIndex::Number(3.0)),
            post("two", SortIndex::Number(2.0)),
        ];
        let posts = tagged(&items, "post");
        let pages = Paginator::default().paginate(&posts);

        assert_eq!(pages.len(), 3);
        let ids: Vec<&str> = pages.iter().map(|p| p.item().unwrap().id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two", "three"]);
        assert!(pages.iter().all(|p| p.items.len() == 1 && p.total == 3));
        assert_eq!(pages[1].url, "posts/two/");
        assert_eq!(pages[1].number, 2);
    }

    #[test]
    fn test_ascending_is_strict_for_distinct_indexes() {
        let items: Vec<ContentItem> = [9.0, 4.0, 6.5, -1.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, n)| post(&format!("p{}", i), SortIndex::Number(*n)))
            .collect();
        let posts = tagged(&items, "post");
        let pages = Paginator::default().paginate(&posts);

        assert_eq!(pages.len(), items.len());
        for pair in pages.windows(2) {
            let a = pair[0].item().unwrap().index().as_f64();
            let b = pair[1].item().unwrap().index().as_f64();
            assert!(a < b);
        }
    }

    #[test]
    fn test_prev_next_links() {
        let items = vec![
            post("a", SortIndex::Number(1.0)),
            post("b", SortIndex::Number(2.0)),
            post("c", SortIndex::Number(3.0)),
        ];
        let posts = tagged(&items, "post");
        let pages = Paginator::default().paginate(&posts);

        assert!(pages[0].prev.is_none());
        assert_eq!(pages[0].next.as_ref().unwrap().url, "posts/b/");
        assert_eq!(pages[1].prev.as_ref().unwrap().title, "A");
        assert_eq!(pages[1].next.as_ref().unwrap().title, "C");
        assert!(pages[2].next.is_none());
    }

    #[test]
    fn test_larger_pages() {
        let items: Vec<ContentItem> = (1..=5)
            .map(|n| post(&format!("p{}", n), SortIndex::Number(n as f64)))
            .collect();
        let posts = tagged(&items, "post");
        let pages = Paginator::new(2, "archive/:page/").paginate(&posts);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].items.len(), 2);
        assert_eq!(pages[2].items.len(), 1);
        assert_eq!(pages[2].url, "archive/3/");
        assert_eq!(pages[0].next.as_ref().unwrap().number, 2);
    }

    #[test]
    fn test_empty_collection_has_no_pages() {
        let pages = Paginator::default().paginate(&[]);
        assert!(pages.is_empty());
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(Paginator::new(0, "posts/:id/").size(), 1);
    }

    #[test]
    fn test_missing_index_paginates_without_error() {
        let items = vec![
            post("x", SortIndex::Missing),
            post("y", SortIndex::Number(1.0)),
        ];
        let posts = tagged(&items, "post");
        let first = Paginator::default().paginate(&posts);
        let second = Paginator::default().paginate(&posts);

        let ids = |pages: &[Page]| -> Vec<String> {
            pages.iter().map(|p| p.item().unwrap().id.clone()).collect()
        };
        assert_eq!(ids(&first), vec!["y", "x"]);
        assert_eq!(ids(&first), ids(&second));
    }
}
