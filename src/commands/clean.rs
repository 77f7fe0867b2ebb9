//! Clean the public directory

use anyhow::{Context, Result};
use std::fs;

use crate::Site;

/// Remove the public directory. Returns whether anything was deleted.
pub fn run(site: &Site) -> Result<bool> {
    if !site.public_dir.exists() {
        tracing::info!("Nothing to clean at {:?}", site.public_dir);
        return Ok(false);
    }

    fs::remove_dir_all(&site.public_dir)
        .with_context(|| format!("failed to remove {:?}", site.public_dir))?;
    tracing::info!("Deleted: {:?}", site.public_dir);
    Ok(true)
}
