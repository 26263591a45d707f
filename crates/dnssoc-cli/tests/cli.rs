//! Integration tests for the `dnssoc` binary.
//!
//! Each test builds a config plus fixture files in a temp directory,
//! launches the binary via `assert_cmd`, and asserts on exit code,
//! output files, and the cursor.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dnssoc() -> Command {
    Command::cargo_bin("dnssoc").expect("binary not found")
}

/// Set up a workspace with indicator files and a config pointing at them.
///
/// Returns the temp dir; the config lives at `config.toml` and output goes
/// to `out/` inside it.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("domains.txt"), "evil.com\n").unwrap();
    std::fs::write(dir.path().join("ips.txt"), "10.0.0.0/8\n").unwrap();

    let config = format!(
        r#"
logging = "warn"

[correlation]
output_dir = "{out}"
malicious_domains_file = "{domains}"
malicious_ips_file = "{ips}"
"#,
        out = dir.path().join("out").display(),
        domains = dir.path().join("domains.txt").display(),
        ips = dir.path().join("ips.txt").display(),
    );
    std::fs::write(dir.path().join("config.toml"), config).unwrap();
    dir
}

fn config_arg(dir: &TempDir) -> String {
    dir.path().join("config.toml").display().to_string()
}

fn read_matches(dir: &TempDir) -> Vec<serde_json::Value> {
    std::fs::read_to_string(dir.path().join("out").join("matches.json"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Full-encoding log: an IP match at 18:00, a domain match at 06:00, and a
/// record that matches nothing.
const FULL_LOG: &str = r#"{"timestamp":"2024-05-01T18:00:00Z","query":"benign.com","query_type":"A","answers":["10.1.2.3"]}
{"timestamp":"2024-05-01T06:00:00Z","query":"EVIL.com","query_type":"A","answers":["192.0.2.1"]}
{"timestamp":"2024-05-01T09:00:00Z","query":"nothing.io","query_type":"A","answers":[]}
"#;

/// Compact-encoding log: the client address matches at 12:00.
const COMPACT_LOG: &str =
    r#"["2024-05-01T12:00:00Z","bad.example","A",["192.0.2.5"],"10.9.9.9"]
"#;

const WINDOW: [&str; 4] = ["-s", "2024-05-01T00:00:00", "-e", "2024-05-02T00:00:00"];

// ---------------------------------------------------------------------------
// correlate
// ---------------------------------------------------------------------------

#[test]
fn correlate_appends_sorted_matches() {
    let dir = workspace();
    let full = dir.path().join("full.json");
    let compact = dir.path().join("compact.json");
    std::fs::write(&full, FULL_LOG).unwrap();
    std::fs::write(&compact, COMPACT_LOG).unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .arg(&compact)
        .args(WINDOW)
        .assert()
        .success()
        .stdout(predicate::str::contains("done:"))
        .stdout(predicate::str::contains("3 matches appended"));

    let docs = read_matches(&dir);
    assert_eq!(docs.len(), 3);

    // Sorted across both encodings by record timestamp
    assert_eq!(docs[0]["timestamp"], "2024-05-01T06:00:00.000000000Z");
    assert_eq!(docs[0]["query"], "EVIL.com");
    assert_eq!(docs[0]["matched_indicator_type"], "domain");
    assert_eq!(docs[0]["matched_indicator_value"], "evil.com");

    assert_eq!(docs[1]["timestamp"], "2024-05-01T12:00:00.000000000Z");
    assert_eq!(docs[1]["query"], "bad.example");
    assert_eq!(docs[1]["matched_indicator_type"], "ip");
    assert_eq!(docs[1]["matched_indicator_value"], "10.0.0.0/8");

    assert_eq!(docs[2]["timestamp"], "2024-05-01T18:00:00.000000000Z");
    assert_eq!(docs[2]["query"], "benign.com");
    assert_eq!(docs[2]["matched_indicator_type"], "ip");

    // No servers configured, so context stays empty
    for doc in &docs {
        assert_eq!(doc["intelligence_context"], serde_json::json!([]));
        assert!(doc["source_file"].as_str().unwrap().ends_with(".json"));
    }

    // Cursor carries the newest written timestamp
    let cursor = std::fs::read_to_string(dir.path().join("out").join("cursor")).unwrap();
    assert_eq!(cursor, "2024-05-01T18:00:00.000000000Z\n");
}

#[test]
fn correlate_resumes_from_the_cursor() {
    let dir = workspace();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .args(WINDOW)
        .assert()
        .success();
    assert_eq!(read_matches(&dir).len(), 2);

    // Second run without --start-date resumes at the cursor; only the
    // record sharing the cursor timestamp is seen again
    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matches appended"));

    let docs = read_matches(&dir);
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[2]["timestamp"], "2024-05-01T18:00:00.000000000Z");
}

#[test]
fn correlate_without_matches_leaves_cursor_untouched() {
    let dir = workspace();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let cursor_path = dir.path().join("out").join("cursor");
    std::fs::write(&cursor_path, "2024-04-01T00:00:00.000000000Z\n").unwrap();

    // Window far in the future, so every record falls outside it
    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .args(["-s", "2030-01-01", "-e", "2030-01-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no new matches"));

    assert!(!dir.path().join("out").join("matches.json").exists());
    assert_eq!(
        std::fs::read_to_string(&cursor_path).unwrap(),
        "2024-04-01T00:00:00.000000000Z\n"
    );
}

#[test]
fn correlate_skips_unrecognized_files() {
    let dir = workspace();
    let logs = dir.path().join("logs");
    std::fs::create_dir(&logs).unwrap();
    std::fs::write(logs.join("dns.json"), FULL_LOG).unwrap();
    std::fs::write(logs.join("README.txt"), "not a log\n").unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&logs)
        .args(WINDOW)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 matches appended"))
        .stdout(predicate::str::contains("skipped"));
}

#[test]
fn correlate_deletes_inputs_on_success() {
    let dir = workspace();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate", "-D"])
        .arg(&full)
        .args(WINDOW)
        .assert()
        .success();

    assert!(!full.exists());
    assert_eq!(read_matches(&dir).len(), 2);
}

#[test]
fn correlate_missing_explicit_input_fails() {
    let dir = workspace();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(dir.path().join("never-written.json"))
        .args(WINDOW)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn correlate_rejects_garbage_dates() {
    let dir = workspace();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .args(["-s", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("start-date"));
}

#[test]
fn correlate_without_output_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "logging = \"warn\"\n").unwrap();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    dnssoc()
        .args([
            "-c",
            &dir.path().join("config.toml").display().to_string(),
            "correlate",
        ])
        .arg(&full)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output"));
}

// ---------------------------------------------------------------------------
// fetch-iocs
// ---------------------------------------------------------------------------

#[test]
fn fetch_iocs_without_servers_fails() {
    let dir = workspace();

    dnssoc()
        .args(["-c", &config_arg(&dir), "fetch-iocs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no intelligence servers"));
}

#[test]
fn fetch_iocs_without_files_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "logging = \"warn\"\n").unwrap();

    dnssoc()
        .args([
            "-c",
            &dir.path().join("config.toml").display().to_string(),
            "fetch-iocs",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no indicator files"));
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn missing_named_config_fails() {
    dnssoc()
        .args(["-c", "/nonexistent/dnssoc.toml", "correlate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading config"));
}

#[test]
fn no_subcommand_shows_help() {
    dnssoc()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_commands() {
    dnssoc()
        .args(["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("correlate"))
        .stdout(predicate::str::contains("fetch-iocs"));
}

#[test]
fn version_flag() {
    dnssoc()
        .args(["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dnssoc"));
}

// ---------------------------------------------------------------------------
// Precedence
// ---------------------------------------------------------------------------

#[test]
fn cli_indicator_flags_override_config() {
    let dir = workspace();
    let alt = dir.path().join("alt-domains.txt");
    std::fs::write(&alt, "other.org\n").unwrap();
    let full = dir.path().join("full.json");
    std::fs::write(&full, FULL_LOG).unwrap();

    dnssoc()
        .args(["-c", &config_arg(&dir), "correlate"])
        .arg(&full)
        .args(WINDOW)
        .arg("--malicious-domains-file")
        .arg(&alt)
        .assert()
        .success()
        // evil.com no longer matches as a domain; only the IP hit remains
        .stdout(predicate::str::contains("1 matches appended"));
}
