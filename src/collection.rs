//! Collections: tag filtering and index ordering.
//!
//! Both orderings are stable sorts over borrowed items, so the loaded set is
//! never reordered and ties keep discovery order. Items without a numeric
//! `index` always sort after numbered ones, in either direction.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::content::{ContentItem, SortIndex};

/// Sort direction for [`sort_by_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Items carrying `tag`, in discovery order
pub fn tagged<'a>(items: &'a [ContentItem], tag: &str) -> Vec<&'a ContentItem> {
    items.iter().filter(|item| item.has_tag(tag)).collect()
}

/// Compare two indexes. Missing indexes go last regardless of direction.
pub fn compare_index(a: SortIndex, b: SortIndex, direction: Direction) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A new view of `items` ordered by `index`
pub fn sort_by_index<'a>(items: &[&'a ContentItem], direction: Direction) -> Vec<&'a ContentItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| compare_index(a.index(), b.index(), direction));
    sorted
}

/// The listing order: highest index first
pub fn sorted_descending<'a>(items: &[&'a ContentItem]) -> Vec<&'a ContentItem> {
    sort_by_index(items, Direction::Descending)
}

/// The page generation order: lowest index first
pub fn sorted_ascending<'a>(items: &[&'a ContentItem]) -> Vec<&'a ContentItem> {
    sort_by_index(items, Direction::Ascending)
}

/// Sources of items whose `index` is missing or not numeric
pub fn missing_index(items: &[&ContentItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.index().is_missing())
        .map(|item| item.source.clone())
        .collect()
}

/// Index values shared by more than one item, with the sources sharing them
pub fn duplicate_indexes(items: &[&ContentItem]) -> Vec<(f64, Vec<String>)> {
    let mut seen: IndexMap<u64, (f64, Vec<String>)> = IndexMap::new();
    for item in items {
        if let Some(n) = item.index().as_f64() {
            // +0.0 and -0.0 compare equal, so key them together
            let key = if n == 0.0 { 0.0f64.to_bits() } else { n.to_bits() };
            seen.entry(key)
                .or_insert_with(|| (n, Vec::new()))
                .1
                .push(item.source.clone());
        }
    }
    seen.into_values()
        .filter(|(_, sources)| sources.len() > 1)
        .collect()
}

/// Named views over the loaded items, as exposed to templates
#[derive(Debug, Default)]
pub struct Collections<'a> {
    /// Every item, in discovery order
    pub all: Vec<&'a ContentItem>,
    /// One collection per tag, in discovery order
    pub by_tag: HashMap<String, Vec<&'a ContentItem>>,
    /// The configured tag collection, highest index first
    pub sorted: Vec<&'a ContentItem>,
}

impl<'a> Collections<'a> {
    /// Derive all collections for `tag` from the loaded set
    pub fn build(items: &'a [ContentItem], tag: &str) -> Self {
        let mut by_tag: HashMap<String, Vec<&'a ContentItem>> = HashMap::new();
        for item in items {
            for t in &item.data.tags {
                by_tag.entry(t.clone()).or_default().push(item);
            }
        }

        let sorted = sorted_descending(&tagged(items, tag));

        Self {
            all: items.iter().collect(),
            by_tag,
            sorted,
        }
    }
}
