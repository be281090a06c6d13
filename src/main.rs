use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use newsdesk::{
    AccountDirectory, AuditLog, AuditQuery, AuthEngine, ContentAggregator, FetchConfig, Fetcher,
    HashConfig, LoginRequest, OrderReconciler, RssSource, SignupRequest, Store,
};
use newsdesk::sources::FeedSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Command-line shell over the newsdesk core. Stands in for the desktop
/// window layer: every subcommand maps to one user action.
#[derive(Parser)]
#[command(name = "newsdesk", version, about = "Personal news ordering desk")]
struct Cli {
    /// SQLite database location
    #[arg(long, default_value = "sqlite://newsdesk.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        first_name: String,
        last_name: String,
        email: String,
        password: String,
        confirm_password: String,
    },
    /// Authenticate and mark the session active
    Login { email: String, password: String },
    /// Mark the session inactive
    Logout { account_id: Uuid },
    /// Fetch all sources, merge into the stored order and print the list
    Refresh {
        account_id: Uuid,
        /// Per-source item cap
        #[arg(long, default_value_t = 100)]
        cap: usize,
        /// Extra source as NAME=URL, repeatable; defaults apply when omitted
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<(String, String)>,
    },
    /// Move one item to the position another currently occupies
    Reorder {
        account_id: Uuid,
        source_key: String,
        target_key: String,
        #[arg(long, default_value_t = 100)]
        cap: usize,
    },
    /// Query the session audit trail, newest first
    Audit {
        /// Restrict to one account by email
        #[arg(long)]
        email: Option<String>,
        /// Inclusive lower bound (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Exclusive upper bound (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Shortcut for the trailing seven days
        #[arg(long)]
        last_week: bool,
    },
}

fn parse_source(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .ok_or_else(|| format!("expected NAME=URL, got {raw}"))
}

fn default_sources() -> Vec<(String, String)> {
    vec![
        ("Hespress".to_string(), "https://www.hespress.com/feed".to_string()),
        ("Media24".to_string(), "https://www.medias24.com/feed/".to_string()),
    ]
}

fn build_aggregator(specs: Vec<(String, String)>) -> Result<ContentAggregator> {
    let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
    let sources: Vec<Box<dyn FeedSource>> = specs
        .into_iter()
        .map(|(name, url)| Box::new(RssSource::new(name, url, fetcher.clone())) as Box<dyn FeedSource>)
        .collect();
    Ok(ContentAggregator::new(sources))
}

async fn refresh(
    reconciler: &OrderReconciler,
    account_id: Uuid,
    specs: Vec<(String, String)>,
    cap: usize,
) -> Result<HashMap<String, newsdesk::ContentItem>> {
    let aggregator = build_aggregator(specs)?;
    let aggregation = aggregator.collect(cap).await;
    for failure in &aggregation.failures {
        eprintln!("source {} skipped: {}", failure.source, failure.error);
    }
    let keys: Vec<String> = aggregation.items.iter().map(|i| i.item_key.clone()).collect();
    reconciler.reconcile(account_id, &keys).await?;
    Ok(aggregation
        .items
        .into_iter()
        .map(|item| (item.item_key.clone(), item))
        .collect())
}

async fn print_visible(
    reconciler: &OrderReconciler,
    account_id: Uuid,
    by_key: &HashMap<String, newsdesk::ContentItem>,
) {
    let Some(keys) = reconciler.visible_keys(account_id).await else {
        return;
    };
    for (index, key) in keys.iter().enumerate() {
        match by_key.get(key) {
            Some(item) => println!(
                "{:3}  [{}] {}  {}",
                index,
                item.source,
                item.title,
                item.published.as_deref().unwrap_or("-")
            ),
            None => println!("{:3}  {}", index, key),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let store = Store::open(&cli.database).await?;
    let locks = newsdesk::AccountLocks::new();
    let auth = AuthEngine::new(&store, locks.clone(), HashConfig::default());
    let reconciler = OrderReconciler::new(&store, locks);
    let directory = AccountDirectory::new(&store);
    let audit = AuditLog::new(&store);

    match cli.command {
        Command::Signup {
            first_name,
            last_name,
            email,
            password,
            confirm_password,
        } => {
            let id = auth
                .signup(SignupRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    confirm_password,
                })
                .await?;
            println!("{id}");
        }
        Command::Login { email, password } => {
            match auth.login(LoginRequest { email, password }).await? {
                Some(id) => println!("{id}"),
                None => {
                    eprintln!("invalid credentials");
                    std::process::exit(1);
                }
            }
        }
        Command::Logout { account_id } => {
            auth.logout(account_id).await?;
        }
        Command::Refresh { account_id, cap, sources } => {
            let specs = if sources.is_empty() { default_sources() } else { sources };
            let by_key = refresh(&reconciler, account_id, specs, cap).await?;
            print_visible(&reconciler, account_id, &by_key).await;
        }
        Command::Reorder {
            account_id,
            source_key,
            target_key,
            cap,
        } => {
            // Reorder acts on the visible list, so load it first the way the
            // window does before a drag.
            let by_key = refresh(&reconciler, account_id, default_sources(), cap).await?;
            reconciler.reorder(account_id, &source_key, &target_key).await?;
            print_visible(&reconciler, account_id, &by_key).await;
        }
        Command::Audit {
            email,
            from,
            to,
            last_week,
        } => {
            let mut query = if last_week {
                AuditQuery::last_week()
            } else {
                AuditQuery { account_id: None, from, to }
            };
            if let Some(email) = email {
                let normalized = AccountDirectory::normalize_email(&email);
                match directory.find_by_email(&normalized).await? {
                    Some(account) => query.account_id = Some(account.id),
                    None => {
                        eprintln!("no account for {normalized}");
                        std::process::exit(1);
                    }
                }
            }
            for row in audit.query(&query).await? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
    }

    info!("Done");
    store.close().await;
    Ok(())
}
