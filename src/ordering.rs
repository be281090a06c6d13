use crate::store::{AccountLocks, Store};
use crate::types::Result;
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-account persisted rank over the evolving item-key set.
///
/// The stored map only grows: a key that drops out of the live feed keeps its
/// rank and reclaims it if the key reappears. The last reconciled visible
/// list per account is cached in memory as the basis for `reorder`, standing
/// in for the list the presentation layer displays.
pub struct OrderReconciler {
    pool: SqlitePool,
    locks: AccountLocks,
    visible: Arc<RwLock<HashMap<Uuid, Vec<String>>>>,
}

impl OrderReconciler {
    pub fn new(store: &Store, locks: AccountLocks) -> Self {
        Self {
            pool: store.pool().clone(),
            locks,
            visible: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Merges newly observed keys into the account's stored order and returns
    /// the visible keys (stored AND live) ascending by stored order.
    ///
    /// New keys get `current_max + 1` onward in the order supplied; existing
    /// keys are never reassigned, and stored keys absent from `live_keys` are
    /// omitted from the result but left untouched. Idempotent.
    pub async fn reconcile(&self, account_id: Uuid, live_keys: &[String]) -> Result<Vec<String>> {
        let _guard = self.locks.acquire(account_id).await;

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query("SELECT item_key, sort_order FROM order_entries WHERE account_id = $1")
            .bind(account_id)
            .fetch_all(&mut *tx)
            .await?;

        let mut stored: HashMap<String, i64> = HashMap::with_capacity(rows.len());
        for row in &rows {
            stored.insert(row.try_get("item_key")?, row.try_get("sort_order")?);
        }

        let mut max_order = stored.values().copied().max().unwrap_or(-1);
        let mut assigned = 0usize;
        for key in live_keys {
            if stored.contains_key(key) {
                continue;
            }
            max_order += 1;
            sqlx::query(
                "INSERT INTO order_entries (account_id, item_key, sort_order) VALUES ($1, $2, $3)",
            )
            .bind(account_id)
            .bind(key)
            .bind(max_order)
            .execute(&mut *tx)
            .await?;
            stored.insert(key.clone(), max_order);
            assigned += 1;
        }
        tx.commit().await?;

        if assigned > 0 {
            info!("Assigned order to {} new keys for account {}", assigned, account_id);
        }

        let mut visible: Vec<(String, i64)> = Vec::with_capacity(live_keys.len());
        let mut listed: HashSet<&str> = HashSet::new();
        for key in live_keys {
            if !listed.insert(key.as_str()) {
                continue;
            }
            if let Some(order) = stored.get(key) {
                visible.push((key.clone(), *order));
            }
        }
        visible.sort_by_key(|(_, order)| *order);
        let ordered: Vec<String> = visible.into_iter().map(|(key, _)| key).collect();

        self.visible
            .write()
            .await
            .insert(account_id, ordered.clone());
        Ok(ordered)
    }

    /// Moves `source_key` to the index `target_key` currently occupies in the
    /// visible list, then renumbers the whole visible list contiguously from
    /// zero, writing every row in one transaction.
    ///
    /// No-op when the keys are equal, when either key is not visible, or when
    /// the account has never reconciled. Keys outside the visible list keep
    /// their prior stored order; if such a key becomes visible again its
    /// stale rank may interleave oddly with the renumbered ones — preserved
    /// behavior, not corrected.
    pub async fn reorder(&self, account_id: Uuid, source_key: &str, target_key: &str) -> Result<()> {
        if source_key == target_key {
            return Ok(());
        }

        let _guard = self.locks.acquire(account_id).await;

        let mut list = match self.visible.read().await.get(&account_id) {
            Some(list) => list.clone(),
            None => {
                debug!("Reorder for account {} with no visible list", account_id);
                return Ok(());
            }
        };

        let from = match list.iter().position(|k| k == source_key) {
            Some(index) => index,
            None => {
                debug!("Reorder source key not visible: {}", source_key);
                return Ok(());
            }
        };
        let to = match list.iter().position(|k| k == target_key) {
            Some(index) => index,
            None => {
                debug!("Reorder target key not visible: {}", target_key);
                return Ok(());
            }
        };

        let moved = list.remove(from);
        list.insert(to, moved);

        let mut tx = self.pool.begin().await?;
        for (index, key) in list.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_entries (account_id, item_key, sort_order) VALUES ($1, $2, $3) \
                 ON CONFLICT (account_id, item_key) DO UPDATE SET sort_order = excluded.sort_order",
            )
            .bind(account_id)
            .bind(key)
            .bind(index as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.visible.write().await.insert(account_id, list);
        info!(
            "Reordered items for account {}. From {} to {}",
            account_id, from, to
        );
        Ok(())
    }

    /// The last reconciled visible list, if any. Presentation pulls this on
    /// demand rather than holding live query results.
    pub async fn visible_keys(&self, account_id: Uuid) -> Option<Vec<String>> {
        self.visible.read().await.get(&account_id).cloned()
    }
}
