//! Configuration module

mod site;

pub use site::CollectionConfig;
pub use site::FeedConfig;
pub use site::HighlightConfig;
pub use site::MarkdownConfig;
pub use site::SiteConfig;
