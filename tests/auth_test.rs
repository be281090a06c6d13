use newsdesk::{
    verify_password, AccountDirectory, AccountLocks, AppError, AuditLog, AuditQuery, AuthEngine,
    HashConfig, LoginRequest, SignupRequest, Store,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

// Low work factor so the suite stays fast; the parameters are configurable
// for exactly this reason.
fn fast_hash_config() -> HashConfig {
    HashConfig { log_n: 6, r: 8, p: 1 }
}

async fn setup() -> (Store, AuthEngine) {
    init_tracing();
    let store = Store::open_in_memory().await.unwrap();
    let auth = AuthEngine::new(&store, AccountLocks::new(), fast_hash_config());
    (store, auth)
}

fn signup_request(email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

#[tokio::test]
async fn signup_creates_account_and_hashes_password() {
    let (store, auth) = setup().await;
    let id = auth.signup(signup_request("john@example.com", "P@ssw0rd")).await.unwrap();

    let directory = AccountDirectory::new(&store);
    let account = directory.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(account.email, "john@example.com");
    assert!(!account.session_active);
    assert!(account.last_login_at.is_none());
    assert_ne!(account.password_hash, "P@ssw0rd");
    assert!(verify_password(&account.password_hash, "P@ssw0rd"));
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords_without_writing() {
    let (store, auth) = setup().await;
    let request = SignupRequest {
        confirm_password: "different".to_string(),
        ..signup_request("jane@example.com", "Secret!1")
    };
    let err = auth.signup(request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let directory = AccountDirectory::new(&store);
    assert!(directory.find_by_email("jane@example.com").await.unwrap().is_none());
    assert!(directory.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_email_differs_only_in_case_and_whitespace() {
    let (store, auth) = setup().await;
    auth.signup(signup_request("John@Example.com", "Secret!1")).await.unwrap();

    let err = auth
        .signup(signup_request("  john@example.COM  ", "Other!2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let directory = AccountDirectory::new(&store);
    let accounts = directory.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].email, "john@example.com");
}

#[tokio::test]
async fn login_success_sets_session_and_appends_one_event() {
    let (store, auth) = setup().await;
    let id = auth.signup(signup_request("jane@example.com", "Secret!1")).await.unwrap();

    let logged_in = auth
        .login(LoginRequest {
            email: "  Jane@Example.com ".to_string(),
            password: "Secret!1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(logged_in, Some(id));

    let directory = AccountDirectory::new(&store);
    let account = directory.find_by_id(id).await.unwrap().unwrap();
    assert!(account.session_active);
    assert!(account.last_login_at.is_some());

    let audit = AuditLog::new(&store);
    let rows = audit.query(&AuditQuery::for_account(id)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].online);
    assert_eq!(rows[0].account_email, "jane@example.com");
}

#[tokio::test]
async fn login_failure_is_indistinguishable_and_writes_nothing() {
    let (store, auth) = setup().await;
    let id = auth.signup(signup_request("jane@example.com", "Secret!1")).await.unwrap();

    let wrong_password = auth
        .login(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "Wrong".to_string(),
        })
        .await
        .unwrap();
    let unknown_email = auth
        .login(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "Secret!1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(wrong_password, None);
    assert_eq!(unknown_email, None);

    let directory = AccountDirectory::new(&store);
    let account = directory.find_by_id(id).await.unwrap().unwrap();
    assert!(!account.session_active);

    let audit = AuditLog::new(&store);
    assert!(audit.query(&AuditQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn logout_marks_offline_and_appends_event() {
    let (store, auth) = setup().await;
    let id = auth.signup(signup_request("jane@example.com", "Secret!1")).await.unwrap();
    auth.login(LoginRequest {
        email: "jane@example.com".to_string(),
        password: "Secret!1".to_string(),
    })
    .await
    .unwrap();

    auth.logout(id).await.unwrap();

    let directory = AccountDirectory::new(&store);
    let account = directory.find_by_id(id).await.unwrap().unwrap();
    assert!(!account.session_active);

    let audit = AuditLog::new(&store);
    let rows = audit.query(&AuditQuery::for_account(id)).await.unwrap();
    assert_eq!(rows.len(), 2);
    // Newest first: the offline transition leads.
    assert!(!rows[0].online);
    assert!(rows[1].online);
}

#[tokio::test]
async fn logout_unknown_account_is_a_noop() {
    let (store, auth) = setup().await;
    auth.logout(uuid::Uuid::new_v4()).await.unwrap();

    let audit = AuditLog::new(&store);
    assert!(audit.query(&AuditQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_flag_tracks_most_recent_event() {
    let (store, auth) = setup().await;
    let id = auth.signup(signup_request("flip@example.com", "Secret!1")).await.unwrap();
    let login = LoginRequest {
        email: "flip@example.com".to_string(),
        password: "Secret!1".to_string(),
    };

    auth.login(login.clone()).await.unwrap();
    auth.logout(id).await.unwrap();
    auth.login(login).await.unwrap();

    let directory = AccountDirectory::new(&store);
    let audit = AuditLog::new(&store);
    let account = directory.find_by_id(id).await.unwrap().unwrap();
    let rows = audit.query(&AuditQuery::for_account(id)).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(account.session_active, rows[0].online);
}
