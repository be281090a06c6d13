use crate::directory::AccountDirectory;
use crate::store::{AccountLocks, Store};
use crate::types::{Account, AppError, Result, Role};
use chrono::Utc;
use scrypt::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use scrypt::Scrypt;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Work-factor parameters for credential hashing. The defaults are the
/// scrypt recommended parameters; deployments can dial them up or down.
#[derive(Debug, Clone, Copy)]
pub struct HashConfig {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        let params = scrypt::Params::recommended();
        Self {
            log_n: params.log_n(),
            r: params.r(),
            p: params.p(),
        }
    }
}

impl HashConfig {
    fn params(&self) -> Result<scrypt::Params> {
        scrypt::Params::new(self.log_n, self.r, self.p, 32)
            .map_err(|e| AppError::Hash(e.to_string()))
    }
}

pub fn hash_password(plain: &str, config: &HashConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, config.params()?, &salt)
        .map_err(|e| AppError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Verification never errors: an unparseable stored hash simply fails to
/// verify, which the caller reports the same as a wrong password.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed).is_ok()
}

/// Signup, login and logout against the account directory, emitting one audit
/// event per session transition.
pub struct AuthEngine {
    pool: SqlitePool,
    directory: AccountDirectory,
    locks: AccountLocks,
    hash_config: HashConfig,
}

impl AuthEngine {
    pub fn new(store: &Store, locks: AccountLocks, hash_config: HashConfig) -> Self {
        Self {
            pool: store.pool().clone(),
            directory: AccountDirectory::new(store),
            locks,
            hash_config,
        }
    }

    /// Creates a new account. Passwords must match; the email must not be
    /// registered (case-insensitive). The plaintext password is never stored.
    pub async fn signup(&self, request: SignupRequest) -> Result<Uuid> {
        if request.password != request.confirm_password {
            warn!("Signup password mismatch for {}", request.email);
            return Err(AppError::Validation("passwords do not match".to_string()));
        }

        let email = AccountDirectory::normalize_email(&request.email);
        if self.directory.find_by_email(&email).await?.is_some() {
            warn!("Signup attempt with existing email {}", email);
            return Err(AppError::Conflict(format!(
                "email already registered: {}",
                email
            )));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            password_hash: hash_password(&request.password, &self.hash_config)?,
            role: Role::Member,
            last_login_at: None,
            session_active: false,
        };
        // The existence check above is advisory; the unique index is the
        // authority, and a losing race maps to Conflict inside insert.
        self.directory.insert(&account).await?;

        info!("Account signed up {} with id {}", account.email, account.id);
        Ok(account.id)
    }

    /// Returns the account id on success, `None` for unknown email and wrong
    /// password alike. The two cases are indistinguishable to the caller;
    /// only the logs tell them apart.
    pub async fn login(&self, request: LoginRequest) -> Result<Option<Uuid>> {
        let email = AccountDirectory::normalize_email(&request.email);
        let account = match self.directory.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Login failed for non-existent account {}", email);
                return Ok(None);
            }
        };

        let _guard = self.locks.acquire(account.id).await;

        if !verify_password(&account.password_hash, &request.password) {
            warn!("Login failed (bad password) for {}", email);
            return Ok(None);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE accounts SET session_active = $1, last_login_at = $2 WHERE id = $3")
            .bind(true)
            .bind(now)
            .bind(account.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO audit_events (id, account_id, timestamp, online, note) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(account.id)
        .bind(now)
        .bind(true)
        .bind(Option::<String>::None)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Account logged in {} ({})", email, account.id);
        Ok(Some(account.id))
    }

    /// Marks the account offline and records the transition. Unknown ids are
    /// a silent no-op, not an error.
    pub async fn logout(&self, account_id: Uuid) -> Result<()> {
        let _guard = self.locks.acquire(account_id).await;

        let account = match self.directory.find_by_id(account_id).await? {
            Some(account) => account,
            None => {
                warn!("Logout for unknown account {}", account_id);
                return Ok(());
            }
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE accounts SET session_active = $1 WHERE id = $2")
            .bind(false)
            .bind(account.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO audit_events (id, account_id, timestamp, online, note) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(account.id)
        .bind(now)
        .bind(false)
        .bind(Option::<String>::None)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Account logged out {} ({})", account.email, account.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HashConfig {
        HashConfig { log_n: 6, r: 8, p: 1 }
    }

    #[test]
    fn hash_differs_from_plaintext_and_verifies() {
        let hash = hash_password("P@ssw0rd", &fast_config()).unwrap();
        assert_ne!(hash, "P@ssw0rd");
        assert!(verify_password(&hash, "P@ssw0rd"));
        assert!(!verify_password(&hash, "p@ssw0rd"));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("not-a-phc-string", "whatever"));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("same", &fast_config()).unwrap();
        let b = hash_password("same", &fast_config()).unwrap();
        assert_ne!(a, b);
    }
}
