use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pennywise_api::{app, config::Config, context::AppContext};
use pennywise_core::{MAX_BALANCE, SPEND_LIMIT};
use reqwest::{Method, StatusCode};
use serde_json::json;

struct TestServer {
    base_url: String,
    dir: tempfile::TempDir,
    ctx: Arc<AppContext>,
    handle: tokio::task::JoinHandle<()>,
}

fn test_config(dir: &Path, extra: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = HashMap::from([
        ("PENNYWISE_BIND".into(), "127.0.0.1:0".into()),
        ("PENNYWISE_STATE_FILE".into(), dir.join("budget.dat").display().to_string()),
        ("PENNYWISE_USERS_FILE".into(), dir.join("users").display().to_string()),
        ("PENNYWISE_LOG_DIR".into(), dir.join("logs").display().to_string()),
    ]);
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(move |key: &str| env.get(key).cloned()).unwrap()
}

fn prepare_dir(users: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("logs")).unwrap();
    std::fs::write(dir.path().join("users"), users.join("\n")).unwrap();
    dir
}

impl TestServer {
    async fn spawn(users: &[&str]) -> Self {
        Self::spawn_in(prepare_dir(users)).await
    }

    async fn spawn_in(dir: tempfile::TempDir) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = test_config(dir.path(), &[]);
        let ctx = Arc::new(AppContext::bootstrap(&config).expect("bootstrap failed"));
        let app = app::build_app(Arc::clone(&ctx));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url,
            dir,
            ctx,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn log_path(&self, name: &str) -> PathBuf {
        self.dir.path().join("logs").join(name)
    }

    fn log_lines(&self, name: &str) -> Vec<String> {
        std::fs::read_to_string(self.log_path(name))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn transactions(&self) -> Vec<String> {
        self.log_lines("transactions.csv")
    }

    fn unauthorized(&self) -> Vec<String> {
        self.log_lines("unauthorized.log")
    }

    fn state_bytes(&self) -> Vec<u8> {
        std::fs::read(self.state_path()).unwrap()
    }

    fn state_path(&self) -> PathBuf {
        self.dir.path().join("budget.dat")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn decode_state(bytes: &[u8]) -> (i32, i32) {
    assert_eq!(bytes.len(), 8);
    (
        i32::from_le_bytes(bytes[..4].try_into().unwrap()),
        i32::from_le_bytes(bytes[4..].try_into().unwrap()),
    )
}

async fn get_ledger(client: &reqwest::Client, srv: &TestServer, user: &str) -> serde_json::Value {
    let res = client
        .get(srv.url("/get"))
        .header("Authorization", user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn post_text(
    client: &reqwest::Client,
    srv: &TestServer,
    path: &str,
    user: &str,
    body: serde_json::Value,
) -> (StatusCode, String) {
    let res = client
        .post(srv.url(path))
        .header("Authorization", user)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn fresh_ledger_reads_zero() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let body = get_ledger(&client, &srv, "alice").await;
    assert_eq!(body, json!({ "balance": 0, "budget": 0 }));
}

#[tokio::test]
async fn set_and_spend_return_plain_balance_and_are_journaled() {
    let srv = TestServer::spawn(&["alice", "bob"]).await;
    let client = reqwest::Client::new();

    let (status, body) = post_text(&client, &srv, "/set", "alice", json!({ "amount": 5000 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "5000");

    let (status, body) = post_text(&client, &srv, "/spend", "bob", json!({ "amount": 1250 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "3750");

    let (status, body) = post_text(&client, &srv, "/spend", "bob", json!({ "amount": -50 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "3800");

    let lines = srv.transactions();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(",alice,SET,5000"));
    assert!(lines[1].ends_with(",bob,SPEND,1250"));
    assert!(lines[2].ends_with(",bob,SPEND,-50"));
    assert_eq!(decode_state(&srv.state_bytes()), (3800, 0));
}

#[tokio::test]
async fn set_budget_moves_balance_by_the_difference() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let (status, _) = post_text(&client, &srv, "/set_budget", "alice", json!({ "budget": 100 })).await;
    assert_eq!(status, StatusCode::OK);
    post_text(&client, &srv, "/set", "alice", json!({ "amount": 700 })).await;

    let (status, body) = post_text(&client, &srv, "/set_budget", "alice", json!({ "budget": 150 })).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "balance": 750, "budget": 150 }));

    let (_, body) = post_text(&client, &srv, "/set_budget", "alice", json!({ "budget": 40 })).await;
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "balance": 640, "budget": 40 }));

    assert_eq!(decode_state(&srv.state_bytes()), (640, 40));
    assert!(srv.transactions().last().unwrap().ends_with(",alice,BUDGET_CHANGE,40"));
}

#[tokio::test]
async fn over_cap_spend_is_rejected_without_change_or_journal() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();
    post_text(&client, &srv, "/set", "alice", json!({ "amount": 1000 })).await;

    for amount in [SPEND_LIMIT + 1, -SPEND_LIMIT - 1] {
        let (status, _) = post_text(&client, &srv, "/spend", "alice", json!({ "amount": amount })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let body = get_ledger(&client, &srv, "alice").await;
    assert_eq!(body["balance"], 1000);
    assert_eq!(srv.transactions().len(), 1);
    assert!(srv.unauthorized().is_empty());
}

#[tokio::test]
async fn set_accepts_ceiling_and_rejects_above_it() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let (status, body) = post_text(&client, &srv, "/set", "alice", json!({ "amount": MAX_BALANCE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, MAX_BALANCE.to_string());

    let (status, _) = post_text(
        &client,
        &srv,
        "/set",
        "alice",
        json!({ "amount": MAX_BALANCE as i64 + 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_text(&client, &srv, "/set_budget", "alice", json!({ "budget": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(get_ledger(&client, &srv, "alice").await["balance"], MAX_BALANCE);
    assert_eq!(srv.transactions().len(), 1);
}

#[tokio::test]
async fn missing_and_unknown_credentials_are_rejected_and_logged() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/set"))
        .json(&json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(srv.unauthorized().len(), 1);

    let res = client
        .post(srv.url("/spend"))
        .header("Authorization", "mallory")
        .json(&json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let lines = srv.unauthorized();
    assert_eq!(lines.len(), 2);
    let first: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(first.len(), 4);
    assert_eq!(first[2], "");
    assert!(first[3].starts_with("127.0.0.1:"));
    assert_eq!(lines[1].split(',').nth(2), Some("mallory"));

    assert!(srv.transactions().is_empty());
    assert_eq!(get_ledger(&client, &srv, "alice").await, json!({ "balance": 0, "budget": 0 }));
}

#[tokio::test]
async fn separators_in_credential_do_not_forge_log_fields() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/set"))
        .header("Authorization", "eve,1.2.3.4:80,x")
        .json(&json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let lines = srv.unauthorized();
    assert_eq!(lines.len(), 1);
    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[2], "eve%2C1.2.3.4:80%2Cx");
    assert!(fields[3].starts_with("127.0.0.1:"));
}

#[tokio::test]
async fn options_needs_no_credential_and_is_never_logged() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    for path in ["/get", "/set", "/spend", "/set_budget"] {
        let res = client
            .request(Method::OPTIONS, srv.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["access-control-allow-origin"].to_str().unwrap(),
            "*"
        );
        assert!(
            res.headers()["access-control-allow-headers"]
                .to_str()
                .unwrap()
                .contains("Authorization")
        );
        assert!(res.text().await.unwrap().is_empty());
    }

    assert!(srv.unauthorized().is_empty());
}

#[tokio::test]
async fn wrong_method_is_405_after_auth() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/get"))
        .header("Authorization", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = client
        .get(srv.url("/spend"))
        .header("Authorization", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(srv.transactions().is_empty());
}

#[tokio::test]
async fn malformed_body_is_400_and_content_type_is_not_required() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/spend"))
        .header("Authorization", "alice")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/set"))
        .header("Authorization", "alice")
        .body(r#"{"amount": 42}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "42");
}

#[tokio::test]
async fn null_amount_is_treated_as_zero() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();
    post_text(&client, &srv, "/set", "alice", json!({ "amount": 300 })).await;

    let (status, body) = post_text(&client, &srv, "/spend", "alice", json!({ "amount": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "300");
    assert!(srv.transactions().last().unwrap().ends_with(",alice,SPEND,0"));
}

#[tokio::test]
async fn failed_save_returns_500_and_changes_nothing() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();
    post_text(&client, &srv, "/set", "alice", json!({ "amount": 10 })).await;
    assert_eq!(srv.transactions().len(), 1);

    // A non-empty directory cannot be replaced by the atomic rename.
    std::fs::remove_file(srv.state_path()).unwrap();
    std::fs::create_dir(srv.state_path()).unwrap();
    std::fs::write(srv.state_path().join("keep"), b"x").unwrap();

    let (status, _) = post_text(&client, &srv, "/set", "alice", json!({ "amount": 99 })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(
        get_ledger(&client, &srv, "alice").await,
        json!({ "balance": 10, "budget": 0 })
    );
    assert_eq!(srv.transactions().len(), 1);
}

#[tokio::test]
async fn closed_transaction_log_does_not_fail_committed_mutation() {
    let srv = TestServer::spawn(&["alice"]).await;
    let client = reqwest::Client::new();

    srv.ctx.shutdown();

    let (status, body) = post_text(&client, &srv, "/set", "alice", json!({ "amount": 77 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "77");

    assert_eq!(get_ledger(&client, &srv, "alice").await["balance"], 77);
    assert_eq!(decode_state(&srv.state_bytes()), (77, 0));
    assert!(srv.transactions().is_empty());
}

#[tokio::test]
async fn health_is_not_gated() {
    let srv = TestServer::spawn(&["alice"]).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(srv.unauthorized().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spends_do_not_lose_updates() {
    let users: Vec<String> = (0..20).map(|i| format!("user{i}")).collect();
    let user_refs: Vec<&str> = users.iter().map(String::as_str).collect();
    let srv = TestServer::spawn(&user_refs).await;
    let client = reqwest::Client::new();

    post_text(&client, &srv, "/set", "user0", json!({ "amount": 1000 })).await;

    let mut tasks = Vec::new();
    for user in &users {
        let client = client.clone();
        let url = srv.url("/spend");
        let user = user.clone();
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .header("Authorization", user)
                .json(&json!({ "amount": 10 }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let expected = 1000 - 10 * users.len() as i32;
    assert_eq!(get_ledger(&client, &srv, "user0").await["balance"], expected);
    assert_eq!(decode_state(&srv.state_bytes()), (expected, 0));
    assert_eq!(srv.transactions().len(), 1 + users.len());
}

#[tokio::test]
async fn legacy_state_file_is_migrated_on_startup() {
    let dir = prepare_dir(&["alice"]);
    std::fs::write(dir.path().join("budget.dat"), 4321i32.to_le_bytes()).unwrap();

    let srv = TestServer::spawn_in(dir).await;
    assert_eq!(decode_state(&srv.state_bytes()), (4321, 0));

    let client = reqwest::Client::new();
    assert_eq!(
        get_ledger(&client, &srv, "alice").await,
        json!({ "balance": 4321, "budget": 0 })
    );
}

#[test]
fn corrupt_state_aborts_startup_by_default() {
    let dir = prepare_dir(&["alice"]);
    std::fs::write(dir.path().join("budget.dat"), [0u8; 6]).unwrap();

    let config = test_config(dir.path(), &[]);
    assert!(AppContext::bootstrap(&config).is_err());
    assert_eq!(std::fs::read(dir.path().join("budget.dat")).unwrap(), vec![0u8; 6]);
}

#[test]
fn corrupt_state_starts_empty_when_configured() {
    let dir = prepare_dir(&["alice"]);
    std::fs::write(dir.path().join("budget.dat"), [0u8; 6]).unwrap();

    let config = test_config(dir.path(), &[("PENNYWISE_ON_CORRUPT_STATE", "start-empty")]);
    let ctx = AppContext::bootstrap(&config).unwrap();
    assert_eq!(ctx.ledger.snapshot(), pennywise_core::LedgerState::empty());
    assert_eq!(std::fs::read(dir.path().join("budget.dat")).unwrap(), vec![0u8; 8]);
    assert!(dir.path().join("budget.dat.corrupt").exists());
}

#[test]
fn missing_log_directory_is_fatal() {
    let dir = prepare_dir(&["alice"]);
    std::fs::remove_dir(dir.path().join("logs")).unwrap();

    let config = test_config(dir.path(), &[]);
    assert!(AppContext::bootstrap(&config).is_err());
}

#[test]
fn missing_allowlist_is_fatal() {
    let dir = prepare_dir(&["alice"]);
    std::fs::remove_file(dir.path().join("users")).unwrap();

    let config = test_config(dir.path(), &[]);
    assert!(AppContext::bootstrap(&config).is_err());
}
