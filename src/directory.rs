use crate::store::Store;
use crate::types::{Account, AppError, Result, Role};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// Persisted account records keyed by normalized email.
pub struct AccountDirectory {
    pool: SqlitePool,
}

impl AccountDirectory {
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Canonical form used everywhere an email identifies an account:
    /// surrounding whitespace stripped, lowercased.
    pub fn normalize_email(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Inserts a new account. A uniqueness violation on the email column is
    /// surfaced as a conflict, not a storage failure, so a lookup/insert race
    /// still resolves to exactly one account.
    pub async fn insert(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, email, first_name, last_name, password_hash, role, last_login_at, session_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.last_login_at)
        .bind(account.session_active)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("Stored account {} with id {}", account.email, account.id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "email already registered: {}",
                account.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(&self, normalized_email: &str) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE email = $1")
            .bind(normalized_email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| account_from_row(&r)).transpose()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| account_from_row(&r)).transpose()
    }

    /// All accounts ordered by email, for administrative views.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY email")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(account_from_row).collect()
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    let role: String = row.try_get("role")?;
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::parse(&role),
        last_login_at: row.try_get::<Option<DateTime<Utc>>, _>("last_login_at")?,
        session_active: row.try_get("session_active")?,
    })
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}
