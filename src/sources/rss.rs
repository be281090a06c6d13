use crate::fetcher::Fetcher;
use crate::sources::{FeedItem, FeedSource};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use feed_rs::parser;
use std::sync::Arc;
use tracing::info;

/// RSS/Atom source over a shared fetcher.
pub struct RssSource {
    name: String,
    url: String,
    fetcher: Arc<Fetcher>,
}

impl RssSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, fetcher: Arc<Fetcher>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl FeedSource for RssSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_items(&self) -> Result<Vec<FeedItem>> {
        let body = self.fetcher.fetch_text(&self.url).await?;
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| AppError::Parse(format!("failed to parse feed {}: {}", self.url, e)))?;

        let items: Vec<FeedItem> = feed
            .entries
            .into_iter()
            .map(|entry| FeedItem {
                title: entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string()),
                link: entry.links.first().map(|l| l.href.clone()),
                published: entry.published.map(|d| d.to_rfc2822()),
            })
            .collect();

        info!("RSS source {} yielded {} items", self.name, items.len());
        Ok(items)
    }
}
