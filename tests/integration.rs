use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

const MIB: usize = 1024 * 1024;

fn dash_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("dash");
    path
}

fn setup_test_env(external: bool) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("input")).unwrap();

    let external_line = if external {
        format!("external_dir = \"{}/files\"\n", root.display())
    } else {
        String::new()
    };

    let config_content = format!(
        r#"[db]
path = "{root}/data/dash.sqlite"

[attachments]
{external_line}downloads_dir = "{root}/downloads"

[search]
threshold = 0.3
"#,
        root = root.display(),
        external_line = external_line,
    );

    let config_path = config_dir.join("dash.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dash(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dash_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dash binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_dash_with_stdin(config_path: &Path, args: &[&str], stdin: &str) -> (String, String, bool) {
    let mut child = Command::new(dash_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn seed_records(config_path: &Path) {
    let (_, stderr, ok) = run_dash(
        config_path,
        &[
            "note", "add", "--title", "Shopping list", "--html", "<p>milk, eggs</p>", "--tag", "home",
        ],
    );
    assert!(ok, "note add failed: {}", stderr);
    let (_, stderr, ok) = run_dash(
        config_path,
        &["task", "add", "--title", "Pay rent", "--status", "pending", "--tag", "finance"],
    );
    assert!(ok, "task add failed: {}", stderr);
    let (_, stderr, ok) = run_dash(
        config_path,
        &[
            "event", "add", "--title", "Team sync", "--description", "weekly standup", "--at", "2024-05-06",
        ],
    );
    assert!(ok, "event add failed: {}", stderr);
}

fn result_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|l| l.trim().strip_prefix("id:"))
        .map(|s| s.trim().to_string())
        .collect()
}

fn write_input(config_path: &Path, name: &str, len: usize) -> PathBuf {
    let root = config_path.parent().unwrap().parent().unwrap();
    let path = root.join("input").join(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env(false);

    let (stdout, stderr, success) = run_dash(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/dash.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env(false);

    let (_, _, success1) = run_dash(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_dash(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_added_records_are_searchable() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["search", "milk"]);
    assert!(success);
    assert_eq!(result_ids(&stdout).first().map(String::as_str), Some("note-1"));
    assert!(stdout.contains("milk, eggs"), "HTML should be stripped: {}", stdout);

    let (stdout, _, _) = run_dash(&config_path, &["search", "pending"]);
    assert_eq!(result_ids(&stdout).first().map(String::as_str), Some("task-1"));

    let (stdout, _, _) = run_dash(&config_path, &["search", "sync"]);
    assert_eq!(result_ids(&stdout).first().map(String::as_str), Some("event-1"));
}

#[test]
fn test_search_tolerates_typos() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["search", "shoping"]);
    assert!(success);
    assert_eq!(result_ids(&stdout).first().map(String::as_str), Some("note-1"));
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["search", "   "]);
    assert!(success, "Empty query should not fail");
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["search", "xyznonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_reindex_keeps_results_identical() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (before, _, _) = run_dash(&config_path, &["search", "e", "--json"]);

    let (stdout, _, success) = run_dash(&config_path, &["reindex"]);
    assert!(success);
    assert!(stdout.contains("Indexed 3 records."));

    let (after, _, _) = run_dash(&config_path, &["reindex"]);
    assert!(after.contains("Indexed 3 records."));

    let (rebuilt, _, _) = run_dash(&config_path, &["search", "e", "--json"]);
    assert_eq!(before, rebuilt, "incremental index should match a rebuild");
}

#[test]
fn test_search_json_and_limit() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["search", "e", "--json", "--limit", "1"]);
    assert!(success);
    let hits: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0]["id"].is_string());
    assert!(hits[0]["score"].is_number());

    let (_, stderr, success) = run_dash(&config_path, &["search", "e", "--limit", "0"]);
    assert!(!success);
    assert!(stderr.contains("--limit"));
}

#[test]
fn test_small_attachment_round_trip() {
    let (tmp, config_path) = setup_test_env(true);
    run_dash(&config_path, &["init"]);
    let input = write_input(&config_path, "notes.txt", 2048);

    let (stdout, stderr, success) = run_dash(&config_path, &["attach", input.to_str().unwrap()]);
    assert!(success, "attach failed: {}", stderr);
    assert!(stdout.contains("Saved attachment 1: notes.txt (inline"), "{}", stdout);

    let (stdout, stderr, success) = run_dash(&config_path, &["export", "1"]);
    assert!(success, "export failed: {}", stderr);
    assert!(stdout.contains("Downloaded attachment 1"));
    assert_eq!(
        fs::read(tmp.path().join("downloads/notes.txt")).unwrap(),
        fs::read(&input).unwrap()
    );
}

#[test]
fn test_large_attachment_goes_external() {
    let (tmp, config_path) = setup_test_env(true);
    run_dash(&config_path, &["init"]);
    let input = write_input(&config_path, "video.bin", 6 * MIB);

    let (stdout, stderr, success) = run_dash(&config_path, &["attach", input.to_str().unwrap()]);
    assert!(success, "attach failed: {}", stderr);
    assert!(stdout.contains("(external"), "{}", stdout);
    let external = tmp.path().join("files/video.bin");
    assert_eq!(fs::read(&external).unwrap(), fs::read(&input).unwrap());

    let (stdout, stderr, success) = run_dash(&config_path, &["export", "1"]);
    assert!(success, "export failed: {}", stderr);
    assert!(stdout.contains("external file"), "{}", stdout);
    assert_eq!(fs::read(&external).unwrap().len(), 6 * MIB);
}

#[test]
fn test_large_attachment_without_external_dir_is_inline() {
    let (tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    let input = write_input(&config_path, "big.bin", 10 * MIB);

    let (stdout, stderr, success) = run_dash(&config_path, &["attach", input.to_str().unwrap()]);
    assert!(success, "attach failed: {}", stderr);
    assert!(stdout.contains("(inline, 10.0 MB)"), "{}", stdout);
    assert!(!stderr.contains("notice"), "no notice expected: {}", stderr);

    let (_, _, success) = run_dash(&config_path, &["export", "1"]);
    assert!(success);
    assert_eq!(
        fs::read(tmp.path().join("downloads/big.bin")).unwrap().len(),
        10 * MIB
    );
}

#[test]
fn test_export_missing_external_file_fails() {
    let (tmp, config_path) = setup_test_env(true);
    run_dash(&config_path, &["init"]);
    let input = write_input(&config_path, "video.bin", 6 * MIB);
    run_dash(&config_path, &["attach", input.to_str().unwrap()]);
    fs::remove_file(tmp.path().join("files/video.bin")).unwrap();

    let (_, stderr, success) = run_dash(&config_path, &["export", "1"]);
    assert!(!success);
    assert!(stderr.contains("no longer available"), "{}", stderr);
    assert!(!tmp.path().join("downloads/video.bin").exists());
}

#[test]
fn test_export_unknown_attachment() {
    let (tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);

    let (_, stderr, success) = run_dash(&config_path, &["export", "42"]);
    assert!(!success, "export of a missing id should fail");
    assert!(stderr.contains("not found"), "Should report not found, got: {}", stderr);
    assert!(!tmp.path().join("downloads").exists());
}

#[test]
fn test_attach_reads_paths_from_stdin() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    let a = write_input(&config_path, "a.txt", 10);
    let b = write_input(&config_path, "b.txt", 20);

    let stdin = format!("{}\n\n{}\n", a.display(), b.display());
    let (stdout, stderr, success) = run_dash_with_stdin(&config_path, &["attach"], &stdin);
    assert!(success, "attach failed: {}", stderr);
    assert!(stdout.contains("Saved attachment 1: a.txt"));
    assert!(stdout.contains("Saved attachment 2: b.txt"));
}

#[test]
fn test_attach_continues_past_a_bad_path() {
    let (tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    let good = write_input(&config_path, "good.txt", 10);
    let missing = tmp.path().join("input/missing.txt");

    let (stdout, stderr, success) = run_dash(
        &config_path,
        &["attach", missing.to_str().unwrap(), good.to_str().unwrap()],
    );
    assert!(!success, "a failed file should fail the command");
    assert!(stderr.contains("missing.txt"));
    assert!(stdout.contains("good.txt"));

    let (stdout, _, _) = run_dash(&config_path, &["attachments"]);
    assert!(stdout.contains("good.txt"));
    assert!(!stdout.contains("missing.txt"));
}

#[test]
fn test_stats_counts_records() {
    let (_tmp, config_path) = setup_test_env(false);
    run_dash(&config_path, &["init"]);
    seed_records(&config_path);

    let (stdout, _, success) = run_dash(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Notes:       1"));
    assert!(stdout.contains("Indexed:     3 / 3"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env(false);
    fs::write(&config_path, "[db]\npath = \"x.sqlite\"\n[search]\nthreshold = 2.0\n").unwrap();

    let (_, stderr, success) = run_dash(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("search.threshold"));
}
