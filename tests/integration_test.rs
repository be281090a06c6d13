use async_trait::async_trait;
use newsdesk::sources::{FeedItem, FeedSource};
use newsdesk::{
    AccountLocks, AuthEngine, ContentAggregator, HashConfig, LoginRequest, OrderReconciler,
    SignupRequest, Store,
};
use sqlx::Row;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

struct StaticSource {
    name: String,
    titles: Vec<String>,
}

impl StaticSource {
    fn boxed(name: &str, titles: &[&str]) -> Box<dyn FeedSource> {
        Box::new(Self {
            name: name.to_string(),
            titles: titles.iter().map(|t| t.to_string()).collect(),
        })
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_items(&self) -> newsdesk::Result<Vec<FeedItem>> {
        Ok(self
            .titles
            .iter()
            .map(|title| FeedItem {
                title: title.clone(),
                link: None,
                published: None,
            })
            .collect())
    }
}

/// Full walk through the user path: signup, login, aggregate two sources
/// with a duplicate, reconcile, reorder on a later refresh, logout.
#[tokio::test]
async fn signup_aggregate_reconcile_end_to_end() {
    init_tracing();
    let store = Store::open_in_memory().await.unwrap();
    let locks = AccountLocks::new();
    let auth = AuthEngine::new(&store, locks.clone(), HashConfig { log_n: 6, r: 8, p: 1 });
    let reconciler = OrderReconciler::new(&store, locks);

    auth.signup(SignupRequest {
        first_name: "A".to_string(),
        last_name: "X".to_string(),
        email: "a@x.com".to_string(),
        password: "Secret!1".to_string(),
        confirm_password: "Secret!1".to_string(),
    })
    .await
    .unwrap();
    let account_id = auth
        .login(LoginRequest {
            email: "a@x.com".to_string(),
            password: "Secret!1".to_string(),
        })
        .await
        .unwrap()
        .expect("valid credentials");

    // Two sources, one intra-source duplicate.
    let aggregator = ContentAggregator::new(vec![
        StaticSource::boxed("S1", &["Foo", "Foo"]),
        StaticSource::boxed("S2", &["Bar"]),
    ]);
    let aggregation = aggregator.collect(100).await;
    assert_eq!(aggregation.items.len(), 2);

    let keys: Vec<String> = aggregation.items.iter().map(|i| i.item_key.clone()).collect();
    let ordered = reconciler.reconcile(account_id, &keys).await.unwrap();
    assert_eq!(ordered, vec!["S1|Foo".to_string(), "S2|Bar".to_string()]);

    let rows = sqlx::query(
        "SELECT item_key, sort_order FROM order_entries WHERE account_id = $1 ORDER BY sort_order",
    )
    .bind(account_id)
    .fetch_all(store.pool())
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<String, _>("item_key"), "S1|Foo");
    assert_eq!(rows[0].get::<i64, _>("sort_order"), 0);
    assert_eq!(rows[1].get::<String, _>("item_key"), "S2|Bar");
    assert_eq!(rows[1].get::<i64, _>("sort_order"), 1);

    // A later refresh sees the same feed; the user drags Bar above Foo.
    reconciler.reorder(account_id, "S2|Bar", "S1|Foo").await.unwrap();
    let ordered = reconciler.reconcile(account_id, &keys).await.unwrap();
    assert_eq!(ordered, vec!["S2|Bar".to_string(), "S1|Foo".to_string()]);

    auth.logout(account_id).await.unwrap();
    store.close().await;
}
