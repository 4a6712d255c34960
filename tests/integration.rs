use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn anno_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("anno");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with_provider("gemini")
}

fn setup_test_env_with_provider(provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let stories = serde_json::json!({
        "stories": [
            {
                "content": "We met at a friend's birthday party in spring.\n\nAt first every day felt like a gift and he never left my side.\n\nLater the compliments turned into questions about where I had been.\n\nBy winter I was checking my phone before opening my own front door."
            },
            {
                "content": "A short story that fits in a single chunk."
            }
        ]
    });
    fs::write(
        root.join("stories.json"),
        serde_json::to_string_pretty(&stories).unwrap(),
    )
    .unwrap();

    let config_content = format!(
        r#"[store]
path = "{}/stories.json"

[chunking]
max_chars = 80
overlap_chars = 10

[annotator]
provider = "{}"

[rate_limit]
max_calls = 15
period_secs = 60
"#,
        root.display(),
        provider
    );

    let config_path = config_dir.join("anno.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_anno(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = anno_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("GOOGLE_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run anno binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn load_store(tmp: &TempDir) -> serde_json::Value {
    let content = fs::read_to_string(tmp.path().join("stories.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn chunk_count(store: &serde_json::Value) -> usize {
    store["stories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["chunks"].as_array().map_or(0, |c| c.len()))
        .sum()
}

#[test]
fn test_chunk_splits_stories() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_anno(&config_path, &["chunk"]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("stories chunked: 2"));
    assert!(stdout.contains("ok"));

    let store = load_store(&tmp);
    let first_chunks = store["stories"][0]["chunks"].as_array().unwrap();
    assert!(
        first_chunks.len() > 1,
        "long story should split into multiple chunks, got {}",
        first_chunks.len()
    );
    for chunk in first_chunks {
        assert!(chunk["content"].as_str().unwrap().chars().count() <= 80);
    }
}

#[test]
fn test_chunk_skips_already_chunked_stories() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (stdout, _, success) = run_anno(&config_path, &["chunk"]);
    assert!(success);
    assert!(stdout.contains("stories chunked: 0"));
    assert!(stdout.contains("stories skipped (already chunked): 2"));
}

#[test]
fn test_chunk_force_resplits() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (stdout, _, success) = run_anno(&config_path, &["chunk", "--force"]);
    assert!(success);
    assert!(stdout.contains("stories chunked: 2"));
}

#[test]
fn test_chunk_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_anno(&config_path, &["chunk", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));

    let store = load_store(&tmp);
    assert_eq!(chunk_count(&store), 0, "dry run must not write chunks");
}

#[test]
fn test_annotate_disabled_provider_errors() {
    let (_tmp, config_path) = setup_test_env_with_provider("disabled");

    run_anno(&config_path, &["chunk"]);
    let (_, stderr, success) = run_anno(&config_path, &["annotate", "timing"]);
    assert!(!success, "annotate should fail when provider disabled");
    assert!(
        stderr.contains("disabled"),
        "Should mention disabled, got: {}",
        stderr
    );
}

#[test]
fn test_annotate_without_api_key_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (_, stderr, success) = run_anno(&config_path, &["annotate", "timing"]);
    assert!(!success, "annotate without credential should fail");
    assert!(
        stderr.contains("GOOGLE_API_KEY"),
        "Should mention the missing key, got: {}",
        stderr
    );
}

#[test]
fn test_annotate_dry_run_counts_pending_without_credential() {
    let (tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let total = chunk_count(&load_store(&tmp));
    assert!(total > 0);

    let (stdout, stderr, success) =
        run_anno(&config_path, &["annotate", "timing", "--dry-run"]);
    assert!(success, "dry-run failed: {}", stderr);
    assert!(stdout.contains(&format!("pending timing: {}", total)));
}

#[test]
fn test_annotate_dry_run_reflects_existing_annotations() {
    let (tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);

    // Mark the first chunk as already labelled, as a prior interrupted run
    // would have left it.
    let mut store = load_store(&tmp);
    store["stories"][0]["chunks"][0]["timing"] = serde_json::json!("beginning");
    fs::write(
        tmp.path().join("stories.json"),
        serde_json::to_string_pretty(&store).unwrap(),
    )
    .unwrap();

    let total = chunk_count(&store);
    let (stdout, _, success) = run_anno(&config_path, &["annotate", "timing", "--dry-run"]);
    assert!(success);
    assert!(
        stdout.contains(&format!("pending timing: {}", total - 1)),
        "expected {} pending, got: {}",
        total - 1,
        stdout
    );
}

#[test]
fn test_annotate_tactics_dry_run_lists_each_tactic() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (stdout, _, success) = run_anno(&config_path, &["annotate", "tactics", "--dry-run"]);
    assert!(success);
    for tactic in [
        "gaslighting",
        "silent_treatment",
        "love_bombing",
        "projection",
        "triangulation",
    ] {
        assert!(
            stdout.contains(&format!("manipulation_tactics.{}", tactic)),
            "missing {} in: {}",
            tactic,
            stdout
        );
    }
}

#[test]
fn test_annotate_unknown_tactic_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (_, stderr, success) = run_anno(
        &config_path,
        &["annotate", "tactics", "--tactic", "flattery", "--dry-run"],
    );
    assert!(!success, "unknown tactic should fail");
    assert!(stderr.contains("Unknown tactic"));
}

#[test]
fn test_annotate_before_chunking_reports_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_anno(&config_path, &["annotate", "timing", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("no chunks in store"));
}

#[test]
fn test_stats_reports_coverage() {
    let (_tmp, config_path) = setup_test_env();

    run_anno(&config_path, &["chunk"]);
    let (stdout, _, success) = run_anno(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Stories:   2"));
    assert!(stdout.contains("timing"));
    assert!(stdout.contains("manipulation_tactics.gaslighting"));
}

#[test]
fn test_missing_store_is_fatal() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("stories.json")).unwrap();

    let (_, stderr, success) = run_anno(&config_path, &["chunk"]);
    assert!(!success, "missing store should be a fatal startup error");
    assert!(
        stderr.contains("Failed to read story store"),
        "got: {}",
        stderr
    );
}

#[test]
fn test_malformed_store_is_fatal() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("stories.json"), "{truncated").unwrap();

    let (_, stderr, success) = run_anno(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("not valid JSON"), "got: {}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, config_path) = setup_test_env();
    let config_content = format!(
        r#"[store]
path = "{}/stories.json"

[chunking]
max_chars = 40
overlap_chars = 40
"#,
        tmp.path().display()
    );
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_anno(&config_path, &["chunk"]);
    assert!(!success);
    assert!(
        stderr.contains("overlap_chars"),
        "Should mention the invalid field, got: {}",
        stderr
    );
}

#[test]
fn test_unknown_progress_mode_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_anno(&config_path, &["--progress", "loud", "stats"]);
    assert!(!success);
    assert!(stderr.contains("Unknown progress mode"), "got: {}", stderr);
}
