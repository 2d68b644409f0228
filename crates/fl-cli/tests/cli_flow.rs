//! End-to-end tests for the fleet ledger binary.
//!
//! Tests the full pipeline: import → sessions → costs → summary

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const STATUS_LOG: &str = r#"{"_id":"1","tail_number":"VT-ABC","direction":"27","status":"departing","timestamp":"2024-06-18T09:00:00Z"}
{"_id":"2","tail_number":"VT-ABC","direction":"09","status":"arriving","timestamp":"2024-06-18T10:30:00Z"}
{"_id":"3","tail_number":"VT-ABC","direction":"27","status":"departing","timestamp":"2024-06-18T14:00:00Z"}
{"_id":"4","tail_number":"VT-XYZ","direction":"09","status":"arriving","timestamp":"2024-06-18T08:00:00Z"}
{"_id":"5","tail_number":"VT-XYZ","direction":"09","status":"arriving","timestamp":"undefined"}
"#;

/// An isolated home directory with a config file pointing at a temp database.
struct Workspace {
    temp: TempDir,
    config_path: PathBuf,
}

impl Workspace {
    fn new(extra_config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("data").join("fl.db");
        let config_path = temp.path().join("fl.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path = {:?}", db_path.display().to_string()).unwrap();
        writeln!(file, "{extra_config}").unwrap();
        Self { temp, config_path }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_fl"));
        command
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env("XDG_DATA_HOME", self.temp.path().join("share"))
            .arg("--config")
            .arg(&self.config_path);
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("failed to run fl")
    }

    fn import(&self, input: &str) -> Output {
        let mut child = self
            .command()
            .arg("import")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn fl import");
        child
            .stdin
            .as_mut()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().expect("failed to wait for fl import")
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "fl failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout(output)).expect("stdout should be JSON")
}

#[test]
fn test_import_is_idempotent() {
    let ws = Workspace::new("");

    let first = ws.import(STATUS_LOG);
    assert!(first.status.success());
    assert!(String::from_utf8_lossy(&first.stderr).contains("Imported 5 new events"));
    assert!(ws.path().join("data").join("fl.db").exists());

    let second = ws.import(STATUS_LOG);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("Imported 0 new events"));
}

#[test]
fn test_import_rejects_bad_json_line() {
    let ws = Workspace::new("");
    let output = ws.import("{\"_id\":\"1\"}\n{oops\n");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid JSON on line 2"));
}

#[test]
fn test_sessions_reconstructs_and_reports_rejections() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let output = stdout(&ws.run(&["sessions"]));
    assert!(output.contains("3 sessions: 1 completed, 1 in progress, 1 arrived only"));
    assert!(output.contains("Skipped 1 of 5 records:"));
    assert!(output.contains("unparsable timestamp: undefined"));

    let value = json(&ws.run(&["sessions", "--state", "arrived", "--json"]));
    let sessions = value["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["tail_number"], "VT-XYZ");
    assert_eq!(sessions[0]["date"], "2024-06-18");
}

#[test]
fn test_costs_prices_completed_sessions() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let value = json(&ws.run(&["costs", "--json"]));
    let costs: Vec<_> = value["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["tail_number"].as_str().unwrap().to_string(),
                s["state"].as_str().unwrap().to_string(),
                s["total_cost"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        costs,
        vec![
            ("VT-ABC".to_string(), "completed".to_string(), 1211),
            ("VT-ABC".to_string(), "in_progress".to_string(), 0),
            ("VT-XYZ".to_string(), "arrived_only".to_string(), 0),
        ]
    );
    assert_eq!(value["totals"]["total_cost"], 1211);
    assert_eq!(value["diagnostics"]["rejected"][0]["id"], "5");
    assert_eq!(value["diagnostics"]["rejected"][0]["reason"], "invalid_timestamp");
    assert_eq!(value["diagnostics"]["rejected"][0]["value"], "undefined");
}

#[test]
fn test_costs_filter_keeps_full_history_aggregate() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let value = json(&ws.run(&["costs", "--tail", "vt-abc", "--state", "in-progress", "--json"]));
    let sessions = value["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["cumulative_hours"], 1.5);
    assert_eq!(sessions[0]["total_cost"], 0);
}

#[test]
fn test_configured_policy_and_overrides() {
    let ws = Workspace::new("[policy]\nbase_rate_per_hour = 1404.0\n");
    assert!(ws.import(STATUS_LOG).status.success());

    // 1404 × 1.5 × 1.15 = 2421.9
    let value = json(&ws.run(&["costs", "--json"]));
    assert_eq!(value["sessions"][0]["total_cost"], 2422);

    // 1404 × 1.5 × 1.0 = 2106
    let value = json(&ws.run(&["costs", "--escalation", "0", "--json"]));
    assert_eq!(value["sessions"][0]["total_cost"], 2106);

    let output = stdout(&ws.run(&["policy"]));
    assert!(output.contains("Base rate:  1404 per hour"));
}

#[test]
fn test_invalid_policy_override_fails() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let output = ws.run(&["costs", "--escalation=-1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of range"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_summary_totals() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let value = json(&ws.run(&["summary", "--json"]));
    assert_eq!(value["totals"]["sessions"], 3);
    assert_eq!(value["totals"]["total_cost"], 1211);
    assert_eq!(value["aircraft"][0]["tail_number"], "VT-ABC");
    assert_eq!(value["months"][0]["month"], "2024-06");

    let output = stdout(&ws.run(&["summary"]));
    assert!(output.contains("Total cost: 1211"));
}

#[test]
fn test_status_lists_aircraft() {
    let ws = Workspace::new("");
    assert!(ws.import(STATUS_LOG).status.success());

    let output = stdout(&ws.run(&["status"]));
    assert!(output.contains("- VT-ABC: 3 events, last 2024-06-18T14:00:00Z"));
    // The malformed timestamp is counted but never reported as the latest.
    assert!(output.contains("- VT-XYZ: 2 events, last 2024-06-18T08:00:00Z"));
}

#[test]
fn test_unreachable_source_is_an_error() {
    let ws = Workspace::new("source_url = \"http://127.0.0.1:9/events\"\nfetch_timeout_secs = 5\n");

    let output = ws.run(&["sessions"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("event source unavailable"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_query_without_database_is_an_error() {
    let ws = Workspace::new("");

    let output = ws.run(&["costs"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("event source unavailable"));
    assert!(output.stdout.is_empty());
    assert!(!ws.path().join("data").join("fl.db").exists());
}

#[test]
fn test_no_subcommand_prints_help() {
    let ws = Workspace::new("");
    let output = stdout(&ws.run(&[]));
    assert!(output.contains("Usage"));
}
