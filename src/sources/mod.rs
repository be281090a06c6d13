pub mod rss;

pub use rss::RssSource;

use crate::types::Result;
use async_trait::async_trait;

/// One raw entry from a source: the (title, link, published-label) tuple the
/// aggregator consumes. Everything else about the source format is opaque.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub published: Option<String>,
}

/// An independent external content source. Implementations own their fetch
/// and parse mechanics; a failure is theirs alone to report.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Display name, also the first component of every item key this source
    /// produces.
    fn name(&self) -> &str;

    /// Fetches the source's current items, newest first as the source
    /// publishes them.
    async fn fetch_items(&self) -> Result<Vec<FeedItem>>;
}
