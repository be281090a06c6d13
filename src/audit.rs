use crate::store::Store;
use crate::types::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Filter for the audit trail. Time bounds are half-open: `[from, to)`.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub account_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    /// The administrative dashboard default: the trailing seven days.
    pub fn last_week() -> Self {
        let now = Utc::now();
        Self {
            account_id: None,
            from: Some(now - Duration::days(7)),
            to: Some(now),
        }
    }

    pub fn for_account(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            ..Default::default()
        }
    }
}

/// One session transition, joined with the account email for the report
/// renderer downstream. Rows come back newest-first.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub account_email: String,
    pub timestamp: DateTime<Utc>,
    pub online: bool,
    pub note: Option<String>,
}

/// Read side of the append-only audit trail. Writes happen inside the auth
/// engine's transactions; access control (administrators only) is the
/// caller's policy, not enforced here.
pub struct AuditLog {
    pool: SqlitePool,
}

impl AuditLog {
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRow>> {
        let mut sql = String::from(
            "SELECT a.email, e.timestamp, e.online, e.note \
             FROM audit_events e JOIN accounts a ON a.id = e.account_id",
        );
        let mut conditions = Vec::new();
        if query.account_id.is_some() {
            conditions.push("e.account_id = ?");
        }
        if query.from.is_some() {
            conditions.push("e.timestamp >= ?");
        }
        if query.to.is_some() {
            conditions.push("e.timestamp < ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY e.timestamp DESC");

        let mut stmt = sqlx::query(&sql);
        if let Some(account_id) = query.account_id {
            stmt = stmt.bind(account_id);
        }
        if let Some(from) = query.from {
            stmt = stmt.bind(from);
        }
        if let Some(to) = query.to {
            stmt = stmt.bind(to);
        }

        let rows = stmt.fetch_all(&self.pool).await?;
        debug!("Audit query returned {} rows", rows.len());

        rows.iter()
            .map(|row| {
                Ok(AuditRow {
                    account_email: row.try_get("email")?,
                    timestamp: row.try_get("timestamp")?,
                    online: row.try_get("online")?,
                    note: row.try_get("note")?,
                })
            })
            .collect()
    }
}
