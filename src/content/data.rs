//! Data files: per-directory front-matter defaults and global template data

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::frontmatter::scalar_string;
use crate::error::{Error, Result};

/// File names recognised as directory data
const DIR_DATA_FILES: [&str; 2] = ["_dir.yml", "_dir.yaml"];

/// Front-matter defaults declared by `_dir.yml` files, keyed by directory
/// (relative to the source dir, `/`-separated, "" for the root)
#[derive(Debug, Default, Clone)]
pub struct DirectoryData {
    layers: HashMap<String, Mapping>,
}

impl DirectoryData {
    /// Collect every `_dir.yml` under `source_dir`
    pub fn load(source_dir: &Path) -> Result<Self> {
        let mut layers = HashMap::new();
        if !source_dir.exists() {
            return Ok(Self { layers });
        }

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_dir_data = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| DIR_DATA_FILES.contains(&n))
                .unwrap_or(false);
            if !is_dir_data || !path.is_file() {
                continue;
            }

            let content = fs::read_to_string(path)?;
            let mapping = match serde_yaml::from_str::<Value>(&content) {
                Ok(Value::Mapping(map)) => map,
                Ok(Value::Null) => Mapping::new(),
                Ok(_) => {
                    return Err(Error::FrontMatter {
                        path: path.to_path_buf(),
                        message: "directory data must be a mapping".to_string(),
                    })
                }
                Err(e) => {
                    return Err(Error::FrontMatter {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })
                }
            };

            let dir = path
                .parent()
                .and_then(|p| p.strip_prefix(source_dir).ok())
                .map(relative_key)
                .unwrap_or_default();
            tracing::debug!("Loaded directory data for '{}'", dir);
            layers.insert(dir, mapping);
        }

        Ok(Self { layers })
    }

    /// Build from already-parsed layers
    pub fn from_layers(layers: HashMap<String, Mapping>) -> Self {
        Self { layers }
    }

    /// Merge every layer that applies to `source`, farthest first, then the
    /// item's own front-matter on top
    pub fn apply(&self, source: &str, own: Mapping) -> Mapping {
        let mut merged = Mapping::new();

        let mut dir = String::new();
        let mut dirs = vec![String::new()];
        let components: Vec<&str> = source.split('/').collect();
        for component in &components[..components.len().saturating_sub(1)] {
            if !dir.is_empty() {
                dir.push('/');
            }
            dir.push_str(component);
            dirs.push(dir.clone());
        }

        for dir in &dirs {
            if let Some(layer) = self.layers.get(dir) {
                merged = merge_mapping(merged, layer.clone());
            }
        }
        merge_mapping(merged, own)
    }
}

/// Overlay `top` on `base`. Keys in `top` win, except `tags`, which accumulate.
pub fn merge_mapping(mut base: Mapping, top: Mapping) -> Mapping {
    for (key, value) in top {
        if key.as_str() == Some("tags") {
            let mut tags = base.get(&key).map(tag_list).unwrap_or_default();
            for tag in tag_list(&value) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            base.insert(
                key,
                Value::Sequence(tags.into_iter().map(Value::String).collect()),
            );
        } else {
            base.insert(key, value);
        }
    }
    base
}

fn tag_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(seq) => seq.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

/// Load `*.yml`, `*.yaml` and `*.json` files from the data directory, keyed by file stem
pub fn load_global_data(data_dir: &Path) -> Result<IndexMap<String, serde_json::Value>> {
    let mut data = IndexMap::new();
    if !data_dir.exists() {
        return Ok(data);
    }

    for entry in WalkDir::new(data_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let content = fs::read_to_string(path)?;
        let value = match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => {
                let yaml: Value = serde_yaml::from_str(&content)?;
                serde_json::to_value(yaml)?
            }
            Some("json") => serde_json::from_str(&content)?,
            _ => continue,
        };

        tracing::debug!("Loaded global data '{}'", stem);
        data.insert(stem.to_string(), value);
    }

    Ok(data)
}

/// `/`-separated key for a relative path
pub fn relative_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
