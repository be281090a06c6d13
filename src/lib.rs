pub mod aggregator;
pub mod audit;
pub mod auth;
pub mod directory;
pub mod fetcher;
pub mod ordering;
pub mod sources;
pub mod store;
pub mod types;

pub use aggregator::{Aggregation, AggregatorConfig, ContentAggregator, SourceFailure};
pub use audit::{AuditLog, AuditQuery, AuditRow};
pub use auth::{hash_password, verify_password, AuthEngine, HashConfig, LoginRequest, SignupRequest};
pub use directory::AccountDirectory;
pub use fetcher::Fetcher;
pub use ordering::OrderReconciler;
pub use sources::{FeedItem, FeedSource, RssSource};
pub use store::{AccountLocks, Store};
pub use types::*;
