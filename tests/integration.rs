mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docsync_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docsync"))
}

fn setup_test_env(remote_base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("roster.csv"), "name,number\nMarchessault,81\n").unwrap();
    fs::write(
        files_dir.join("roster_metadata.json"),
        r#"{"description": "Current roster"}"#,
    )
    .unwrap();
    fs::write(files_dir.join("faq.md"), "# FAQ\n\nDoors open at 6.\n").unwrap();

    let root_str = root.display().to_string().replace('\\', "/");
    let config_content = format!(
        r#"[db]
path = "{root}/data/docsync.sqlite"

[remote]
base_url = "{remote}"
timeout_secs = 5

[clients.vgk]
chatbot_id = "{bot}"
project_id = "{project}"
api_key_env = "DOCSYNC_TEST_KEY"

[sync]
delay_ms = 0

[jobs.uploads]
kind = "directory"
client = "vgk"
root = "{root}/files"
"#,
        root = root_str,
        remote = remote_base_url,
        bot = common::CHATBOT_ID,
        project = common::PROJECT_ID,
    );

    let config_path = config_dir.join("docsync.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docsync(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docsync_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("DOCSYNC_TEST_KEY", common::API_KEY)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docsync binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_async(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_docsync(&config_path, &args)
    })
    .await
    .unwrap()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (stdout, _, success) = run_docsync(&config, &["init"]);
    assert!(success);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/docsync.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, _, first) = run_docsync(&config, &["init"]);
    let (_, _, second) = run_docsync(&config, &["init"]);
    assert!(first && second);
}

#[test]
fn test_clients_reports_api_key() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (stdout, _, success) = run_docsync(&config, &["clients"]);
    assert!(success);
    assert!(stdout.contains("vgk"));
    assert!(stdout.contains("DOCSYNC_TEST_KEY (set)"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let broken = fs::read_to_string(&config)
        .unwrap()
        .replace("client = \"vgk\"", "client = \"nobody\"");
    fs::write(&config, broken).unwrap();

    let (_, stderr, success) = run_docsync(&config, &["status"]);
    assert!(!success);
    assert!(stderr.contains("unknown client 'nobody'"));
}

#[test]
fn test_status_empty() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    run_docsync(&config, &["init"]);
    let (stdout, _, success) = run_docsync(&config, &["status"]);
    assert!(success);
    assert!(stdout.contains("Nothing synced yet."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_file_is_idempotent() {
    let server = common::start().await;
    let (tmp, config) = setup_test_env(&server.base_url());
    let file = tmp.path().join("files/faq.md");
    let file = file.to_str().unwrap();

    let (stdout, stderr, success) = run_async(&config, &["sync", file, "--client", "vgk"]).await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("faq.md: uploaded"));

    let (stdout, _, success) = run_async(&config, &["sync", file, "--client", "vgk"]).await;
    assert!(success);
    assert!(stdout.contains("faq.md: unchanged"));

    fs::write(tmp.path().join("files/faq.md"), "# FAQ\n\nDoors open at 7.\n").unwrap();
    let (stdout, _, success) = run_async(&config, &["sync", file, "--client", "vgk"]).await;
    assert!(success);
    assert!(stdout.contains("faq.md: replaced"));

    let st = server.state.lock().unwrap();
    assert_eq!(st.creates, 1);
    assert_eq!(st.updates, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_dry_run_makes_no_requests() {
    let server = common::start().await;
    let (tmp, config) = setup_test_env(&server.base_url());
    let file = tmp.path().join("files/faq.md");
    let file = file.to_str().unwrap();

    let (stdout, stderr, success) =
        run_async(&config, &["sync", file, "--client", "vgk", "--dry-run"]).await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("faq.md: would upload"));
    assert_eq!(server.state.lock().unwrap().creates, 0);

    run_async(&config, &["sync", file, "--client", "vgk"]).await;
    fs::write(tmp.path().join("files/faq.md"), "# FAQ\n\nDoors open at 7.\n").unwrap();

    let (stdout, _, success) =
        run_async(&config, &["sync", file, "--client", "vgk", "--dry-run"]).await;
    assert!(success);
    assert!(stdout.contains("faq.md: would replace"));
    let st = server.state.lock().unwrap();
    assert_eq!(st.creates, 1);
    assert_eq!(st.updates, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_unknown_client_fails() {
    let server = common::start().await;
    let (tmp, config) = setup_test_env(&server.base_url());
    let file = tmp.path().join("files/faq.md");

    let (_, stderr, success) =
        run_async(&config, &["sync", file.to_str().unwrap(), "--client", "ghost"]).await;
    assert!(!success);
    assert!(stderr.contains("Unknown client 'ghost'"));
    assert_eq!(server.state.lock().unwrap().creates, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_directory_job_then_status() {
    let server = common::start().await;
    let (_tmp, config) = setup_test_env(&server.base_url());

    let (stdout, stderr, success) = run_async(&config, &["run", "all"]).await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("uploads"));
    assert!(stdout.contains("2 uploaded"));

    {
        let st = server.state.lock().unwrap();
        assert_eq!(st.creates, 2);
        let roster = st.docs.iter().find(|d| d.filename == "roster.csv").unwrap();
        assert_eq!(roster.metadata["description"], "Current roster");
        assert!(st.docs.iter().all(|d| !d.filename.ends_with("_metadata.json")));
    }

    let (stdout, _, success) = run_async(&config, &["run", "uploads"]).await;
    assert!(success);
    assert!(stdout.contains("2 unchanged"));

    let (stdout, _, success) = run_async(&config, &["status", "--client", "vgk"]).await;
    assert!(success);
    assert!(stdout.contains("roster.csv"));
    assert!(stdout.contains("faq.md"));
    assert!(stdout.contains("Artifacts:   2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_docs_list() {
    let server = common::start().await;
    let (_tmp, config) = setup_test_env(&server.base_url());
    run_async(&config, &["run", "uploads"]).await;

    let (stdout, _, success) = run_async(&config, &["docs", "list", "--client", "vgk"]).await;
    assert!(success);
    let docs: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(docs.as_array().unwrap().len(), 2);
}
