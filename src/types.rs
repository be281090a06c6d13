use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Member,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Administrator => "administrator",
        }
    }

    /// Unrecognized values fall back to Member so a future role added by a
    /// newer schema never locks older builds out of reading the row.
    pub fn parse(s: &str) -> Self {
        match s {
            "administrator" => Role::Administrator,
            _ => Role::Member,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    pub session_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub account_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub online: bool,
    pub note: Option<String>,
}

/// One normalized item from a content source. Ephemeral: never persisted,
/// only its `item_key` is (through the order entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub source: String,
    pub title: String,
    pub published: Option<String>,
    pub url: Option<String>,
    pub item_key: String,
}

/// Deterministic ordering identity for an item: same source + title always
/// yields the same key, within and across refreshes.
pub fn item_key(source: &str, title: &str) -> String {
    format!("{}|{}", source, title)
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "newsdesk/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 5,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("credential hash error: {0}")]
    Hash(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
