use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn lore_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lore");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    // Local notes
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "---\ntitle: Alpha Document\ntags: [rust, notes]\n---\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    )
    .unwrap();
    fs::write(
        files_dir.join("beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks are covered.",
    )
    .unwrap();
    let long_doc: String = (0..40)
        .map(|i| format!("Paragraph {} of the gamma manuscript, with enough words to carry real weight in every line. ", i).repeat(4))
        .collect::<Vec<_>>()
        .join("\n\n");
    fs::write(files_dir.join("gamma.txt"), long_doc).unwrap();

    // Twitter archive export
    let archive_dir = root.join("archive");
    fs::create_dir_all(&archive_dir).unwrap();
    fs::write(
        archive_dir.join("tweets.js"),
        r#"window.YTD.tweets.part0 = [
  { "tweet": {
      "id_str": "100",
      "created_at": "Wed Jan 01 12:00:00 +0000 2020",
      "full_text": "thinking about sourdough fermentation",
      "retweet_count": "1",
      "favorite_count": "4",
      "entities": { "hashtags": [ { "text": "baking" } ], "user_mentions": [], "urls": [] }
  } },
  { "tweet": {
      "id_str": "101",
      "created_at": "Wed Jan 01 12:05:00 +0000 2020",
      "full_text": "follow-up: the starter doubled overnight",
      "in_reply_to_status_id_str": "100",
      "in_reply_to_screen_name": "alice",
      "entities": {}
  } },
  { "tweet": {
      "id_str": "102",
      "created_at": "Thu Jan 02 09:00:00 +0000 2020",
      "full_text": "RT @baker: great crumb structure",
      "entities": {}
  } }
]"#,
    )
    .unwrap();
    fs::write(
        archive_dir.join("account.js"),
        r#"window.YTD.account.part0 = [ { "account": { "username": "alice" } } ]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/lore.sqlite"

[chunking]
chunk_size = 800
overlap_percent = 0.15
min_chunk_size = 500

[server]
bind = "127.0.0.1:7341"

[adapters.twitter]
archive_path = "{root}/archive"

[adapters.files]
root = "{root}/files"
include_globs = ["**/*.md", "**/*.txt"]
"#,
        root = root.display()
    );

    let config_path = config_dir.join("lore.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lore(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lore_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lore binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lore(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("lore.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_lore(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_lore(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_index_files() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, stderr, success) = run_lore(&config_path, &["index", "files"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents indexed: 3"));
    // gamma.txt is oversized and gets chunked.
    assert!(!stdout.contains("chunks written: 0"));
    assert!(stdout.contains("errors: 0"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_index_idempotent_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout1, _, _) = run_lore(&config_path, &["index", "files"]);
    assert!(stdout1.contains("documents indexed: 3"));

    let (stdout2, _, _) = run_lore(&config_path, &["index", "files"]);
    assert!(stdout2.contains("documents indexed: 3"));

    // Still three documents total.
    let (stats, _, _) = run_lore(&config_path, &["stats"]);
    assert!(stats.contains("Documents:  3"), "stats: {}", stats);
}

#[test]
fn test_index_twitter_and_search() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, stderr, success) = run_lore(&config_path, &["index", "twitter"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents indexed: 3"));

    let (stdout, _, success) = run_lore(&config_path, &["search", "sourdough"]);
    assert!(success, "search failed");
    assert!(
        stdout.contains("sourdough") && stdout.contains("id:"),
        "expected a hit with an id, got: {}",
        stdout
    );

    // content_type filter: the retweet is classified separately.
    let (stdout, _, _) = run_lore(
        &config_path,
        &["search", "crumb", "--content-type", "retweet"],
    );
    assert!(stdout.contains("crumb"), "got: {}", stdout);
}

#[test]
fn test_index_all_adapters() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, _, success) = run_lore(&config_path, &["index", "all"]);
    assert!(success);
    assert!(stdout.contains("index twitter"));
    assert!(stdout.contains("index files"));
}

#[test]
fn test_index_unknown_adapter() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (_, stderr, success) = run_lore(&config_path, &["index", "nonexistent"]);
    assert!(!success, "Unknown adapter should fail");
    assert!(stderr.contains("unknown adapter"), "got: {}", stderr);
}

#[test]
fn test_index_invalid_source_fails() {
    let (tmp, config_path) = setup_test_env();

    // Remove tweets.js so the archive fails validation.
    fs::remove_file(tmp.path().join("archive").join("tweets.js")).unwrap();

    run_lore(&config_path, &["init"]);
    let (_, stderr, success) = run_lore(&config_path, &["index", "twitter"]);
    assert!(!success, "Invalid source should fail");
    assert!(stderr.contains("invalid data source"), "got: {}", stderr);
}

#[test]
fn test_search_empty_and_no_results() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, _, success) = run_lore(&config_path, &["search", ""]);
    assert!(success, "Empty query should not panic");
    assert!(stdout.contains("No results"));

    run_lore(&config_path, &["index", "files"]);
    let (stdout, _, success) = run_lore(&config_path, &["search", "xyznonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    run_lore(&config_path, &["index", "files"]);

    let (stdout1, _, _) = run_lore(&config_path, &["search", "document"]);
    let (stdout2, _, _) = run_lore(&config_path, &["search", "document"]);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_recent_lists_documents() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    run_lore(&config_path, &["index", "files"]);

    let (stdout, _, success) = run_lore(&config_path, &["recent", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("id:"));
    assert_eq!(stdout.matches("id:").count(), 2);
}

#[test]
fn test_get_document_roundtrip() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    run_lore(&config_path, &["index", "files"]);

    let (search_out, _, _) = run_lore(&config_path, &["search", "Rust"]);
    let id = search_out
        .lines()
        .find(|l| l.trim().starts_with("id:"))
        .and_then(|l| l.split("id:").nth(1))
        .map(|s| s.trim().to_string())
        .expect("search should return an id");

    let (stdout, _, success) = run_lore(&config_path, &["get", &id]);
    assert!(success, "get should succeed");
    assert!(stdout.contains("--- Document ---"));
    assert!(stdout.contains(&id));
}

#[test]
fn test_get_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (_, stderr, success) = run_lore(&config_path, &["get", "nonexistent-id"]);
    assert!(!success, "get with missing id should fail");
    assert!(stderr.contains("not found"), "got: {}", stderr);
}

#[test]
fn test_chunked_document_get_shows_chunks() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    run_lore(&config_path, &["index", "files"]);

    let (search_out, _, _) = run_lore(&config_path, &["search", "manuscript"]);
    let id = search_out
        .lines()
        .find(|l| l.trim().starts_with("id:"))
        .and_then(|l| l.split("id:").nth(1))
        .map(|s| s.trim().to_string())
        .expect("chunked doc should be searchable through its chunks");

    let (stdout, _, success) = run_lore(&config_path, &["get", &id]);
    assert!(success);
    assert!(stdout.contains("--- Chunks ("));
    assert!(stdout.contains("[chunk 0]"));
}

#[test]
fn test_migrate_empty_legacy_tables() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, _, success) = run_lore(&config_path, &["migrate"]);
    assert!(success);
    assert!(stdout.contains("total migrated: 0"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_migrate_dry_run_flag() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, _, success) = run_lore(&config_path, &["migrate", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
}

#[test]
fn test_thread_on_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    let (stdout, _, success) = run_lore(&config_path, &["thread", "12345"]);
    assert!(success);
    assert!(stdout.contains("No thread found"));
}

#[test]
fn test_sources_listing() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lore(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("twitter"));
    assert!(stdout.contains("files"));
    assert!(stdout.contains("OK"));
}

#[test]
fn test_stats_after_indexing() {
    let (_tmp, config_path) = setup_test_env();

    run_lore(&config_path, &["init"]);
    run_lore(&config_path, &["index", "all"]);

    let (stdout, _, success) = run_lore(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:  6"), "stats: {}", stdout);
    assert!(stdout.contains("twitter"));
    assert!(stdout.contains("file"));
}
