use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn onboard_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_onboard"))
}

fn setup_test_env(provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("manual.json"),
        r#"{
  "title": "주문받고 결제하는 기본 교육",
  "goal": "손님이 기분 좋게 주문하고 결제할 수 있도록 돕기",
  "procedure": [
    {"step": "1. 인사", "details": ["손님이 오면 밝게 인사하기", "눈을 맞추고 인사 방법 지키기"]},
    {"step": "2. 주문 받기", "details": ["HOT/ICE 확인", "사이즈 확인"]},
    {"step": "3. 결제", "details": ["금액 다시 확인하기", "영수증 드리기"]}
  ],
  "precaution": ["손님 말 끊지 않기", "카드 결제 후 카드 돌려드리기"]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/onboard.sqlite"

[embedding]
provider = "{}"
dims = 256

[retrieval]
default_limit = 3
max_limit = 20
"#,
        root.display(),
        provider
    );

    let config_path = config_dir.join("onboard.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_onboard(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = onboard_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run onboard binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn manual_path(config_path: &Path) -> String {
    config_path
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .join("manual.json")
        .display()
        .to_string()
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("hash");

    let (stdout, stderr, success) = run_onboard(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_onboard(&config_path, &["init"]);
    assert!(success, "Second init failed (not idempotent)");
}

#[test]
fn test_manual_add_index_and_retrieve() {
    let (_tmp, config_path) = setup_test_env("hash");
    let manual = manual_path(&config_path);

    let (stdout, stderr, success) =
        run_onboard(&config_path, &["manual", "add", &manual, "--index"]);
    assert!(success, "manual add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Stored manual 1"));
    assert!(stdout.contains("6 chunks, 6 embedded"));

    let (stdout, _, success) = run_onboard(&config_path, &["retrieve", "1", "인사 방법", "--limit", "2"]);
    assert!(success);
    assert!(stdout.starts_with("1. [procedure]"), "got: {}", stdout);
    assert!(stdout.contains("1. 인사"));
}

#[test]
fn test_index_from_file_and_json_output() {
    let (_tmp, config_path) = setup_test_env("hash");
    let manual = manual_path(&config_path);

    let (stdout, stderr, success) = run_onboard(&config_path, &["index", "42", "--file", &manual]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("manual 42"));

    let (stdout, _, success) = run_onboard(&config_path, &["retrieve", "42", "인사 방법", "--json"]);
    assert!(success);
    let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(results.as_array().unwrap().len(), 3);
    assert_eq!(results[0]["manual_id"], 42);

    // Re-indexing unchanged content reuses every stored chunk.
    let (stdout, _, success) = run_onboard(&config_path, &["index", "42", "--file", &manual]);
    assert!(success);
    assert!(stdout.contains("0 embedded, 6 unchanged"));
}

#[test]
fn test_index_missing_manual_fails() {
    let (_tmp, config_path) = setup_test_env("hash");
    let (_, stderr, success) = run_onboard(&config_path, &["index", "99"]);
    assert!(!success);
    assert!(stderr.contains("manual 99 not found"));
}

#[test]
fn test_retrieve_limit_validation() {
    let (_tmp, config_path) = setup_test_env("hash");
    let (_, stderr, success) = run_onboard(&config_path, &["retrieve", "1", "인사", "--limit", "0"]);
    assert!(!success);
    assert!(stderr.contains("limit must be >= 1"));

    let (stdout, _, success) = run_onboard(&config_path, &["retrieve", "1", "인사"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_manual_show() {
    let (_tmp, config_path) = setup_test_env("hash");
    let manual = manual_path(&config_path);
    run_onboard(&config_path, &["manual", "add", &manual]);

    let (stdout, _, success) = run_onboard(&config_path, &["manual", "show", "1"]);
    assert!(success);
    assert!(stdout.contains("주문받고 결제하는 기본 교육"));

    let (_, _, success) = run_onboard(&config_path, &["manual", "show", "2"]);
    assert!(!success);
}

#[test]
fn test_disabled_provider_fails_indexing() {
    let (_tmp, config_path) = setup_test_env("disabled");
    let manual = manual_path(&config_path);
    let (_, stderr, success) = run_onboard(&config_path, &["index", "1", "--file", &manual]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_tone_needs_no_config() {
    let (stdout, _, success) = run_onboard(Path::new("/nonexistent/onboard.toml"), &["tone", "오늘도 화이팅!"]);
    assert!(success);
    assert_eq!(stdout.trim(), "expressive");
}
