//! Create a new post

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::PathBuf;

use crate::collection::tagged;
use crate::content::loader::ContentLoader;
use crate::Site;

/// Create `posts/<id>.md` with the next free index. Returns the new file's path.
pub fn create_post(site: &Site, title: &str, id: Option<&str>) -> Result<PathBuf> {
    let id = id
        .map(|s| s.to_string())
        .unwrap_or_else(|| slug::slugify(title));
    if id.is_empty() {
        anyhow::bail!("cannot derive an id from title {:?}; pass --id", title);
    }

    let target_dir = site.source_dir.join("posts");
    let file_path = target_dir.join(format!("{}.md", id));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let index = next_index(site)?;

    let mut front_matter = Mapping::new();
    front_matter.insert("title".into(), title.into());
    front_matter.insert("id".into(), id.as_str().into());
    front_matter.insert("index".into(), Value::Number(index.into()));
    front_matter.insert(
        "date".into(),
        chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .into(),
    );
    front_matter.insert("tags".into(), site.config.collection.tag.as_str().into());

    let content = format!("---\n{}---\n", serde_yaml::to_string(&front_matter)?);

    fs::create_dir_all(&target_dir)?;
    fs::write(&file_path, content).with_context(|| format!("failed to write {:?}", file_path))?;

    tracing::info!("Created {:?} with index {}", file_path, index);
    Ok(file_path)
}

/// One more than the highest numeric index in the collection, drafts included
pub fn next_index(site: &Site) -> Result<i64> {
    let discovery = ContentLoader::new(site).with_drafts(true).discover()?;
    let posts = tagged(&discovery.items, &site.config.collection.tag);
    let max = posts
        .iter()
        .filter_map(|p| p.index().as_f64())
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))));

    let Some(max) = max else {
        return Ok(1);
    };
    // `as` saturates, so anything at or above 2^63 has no successor
    if max.floor() >= i64::MAX as f64 {
        anyhow::bail!(
            "the highest index ({}) leaves no room for a next one; pass an index by hand",
            max
        );
    }
    Ok(max.floor() as i64 + 1)
}
