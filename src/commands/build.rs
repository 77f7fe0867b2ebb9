//! Build the static site

use anyhow::{Context, Result};

use crate::pipeline::BuildReport;
use crate::Site;

/// Build the site into its public directory
pub fn run(site: &Site, include_drafts: bool) -> Result<BuildReport> {
    tracing::info!("Building {:?} into {:?}", site.source_dir, site.public_dir);
    let report = site
        .build(include_drafts)
        .with_context(|| format!("failed to build site at {:?}", site.base_dir))?;

    tracing::info!(
        "{} item(s): {} post(s) on {} page(s), {} standalone",
        report.items,
        report.posts,
        report.pages,
        report.standalone
    );
    Ok(report)
}
