use crate::sources::FeedSource;
use crate::types::{item_key, ContentItem};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound on any single source's fetch, over and above the HTTP
    /// client timeout, so one unresponsive source cannot stall the batch.
    pub source_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(60),
        }
    }
}

/// A source that did not contribute to a batch, and why.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Result of one aggregation pass: unique items in source-enumeration order,
/// plus the failures that were skipped over.
#[derive(Debug)]
pub struct Aggregation {
    pub items: Vec<ContentItem>,
    pub failures: Vec<SourceFailure>,
}

/// Fetches every configured source independently, truncates each to a
/// per-source cap and deduplicates across the batch by item key.
pub struct ContentAggregator {
    sources: Vec<Box<dyn FeedSource>>,
    config: AggregatorConfig,
}

impl ContentAggregator {
    pub fn new(sources: Vec<Box<dyn FeedSource>>) -> Self {
        Self {
            sources,
            config: AggregatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// One aggregation pass. A fetch or parse failure on one source is
    /// recorded and skipped; it never aborts the others. When keys collide,
    /// within or across sources, the first occurrence wins.
    pub async fn collect(&self, per_source_cap: usize) -> Aggregation {
        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();
        let mut failures = Vec::new();

        for source in &self.sources {
            let fetched =
                match tokio::time::timeout(self.config.source_timeout, source.fetch_items()).await
                {
                    Ok(Ok(fetched)) => fetched,
                    Ok(Err(e)) => {
                        warn!("Source {} failed: {}", source.name(), e);
                        failures.push(SourceFailure {
                            source: source.name().to_string(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                    Err(_) => {
                        warn!(
                            "Source {} timed out after {:?}",
                            source.name(),
                            self.config.source_timeout
                        );
                        failures.push(SourceFailure {
                            source: source.name().to_string(),
                            error: format!("timed out after {:?}", self.config.source_timeout),
                        });
                        continue;
                    }
                };

            let mut kept = 0usize;
            for raw in fetched.into_iter().take(per_source_cap) {
                let key = item_key(source.name(), &raw.title);
                if !seen.insert(key.clone()) {
                    debug!("Skipping duplicate item {}", key);
                    continue;
                }
                items.push(ContentItem {
                    source: source.name().to_string(),
                    title: raw.title,
                    published: raw.published,
                    url: raw.link,
                    item_key: key,
                });
                kept += 1;
            }
            info!("Source {} contributed {} items", source.name(), kept);
        }

        info!(
            "Aggregated {} unique items from {} sources ({} failed)",
            items.len(),
            self.sources.len(),
            failures.len()
        );
        Aggregation { items, failures }
    }
}
