use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "gembot-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn gembot(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gembot"))
        .args(args)
        .arg("--store")
        .arg(store)
        .args(["--seed", "7"])
        .env_remove("GEMBOT_STORE_DIR")
        .output()
        .expect("run cli")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn work_then_cooldown_then_balance() {
    let store = temp_path("work");
    let first = gembot(&store, &["work", "42", "--username", "mika"]);
    assert!(first.status.success());
    assert!(stdout(&first).contains("Truant"));
    assert!(store.join("42.json").exists());

    let second = gembot(&store, &["work", "42"]);
    assert!(!second.status.success());
    assert!(stdout(&second).contains("on a break"));

    let balance = gembot(&store, &["balance", "42", "--username", "mika"]);
    assert!(balance.status.success());
    let text = stdout(&balance);
    assert!(text.contains("Works completed: 1"));
    assert!(text.contains("9 more work(s)"));
    std::fs::remove_dir_all(store).expect("clean store");
}

#[test]
fn lottery_rejects_insufficient_balance_as_json() {
    let store = temp_path("lottery");
    std::fs::create_dir_all(&store).expect("create store");
    std::fs::write(
        store.join("7.json"),
        r#"{"balance": 250, "work_count": 0, "last_work_timestamp": 0.0, "job_index": 0}"#,
    )
    .expect("seed record");

    let output = gembot(&store, &["lottery", "buy", "7", "3", "--format", "json"]);
    assert!(!output.status.success());
    let body: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json error");
    assert_eq!(body["error"], "insufficient_balance");

    let buy = gembot(&store, &["lottery", "buy", "7", "2", "--format", "json"]);
    assert!(buy.status.success());
    let reply: serde_json::Value = serde_json::from_str(&stdout(&buy)).expect("json reply");
    assert_eq!(reply["value"]["reply"], "lottery");
    assert_eq!(reply["value"]["cost"], 200);
    assert_eq!(reply["persisted"], true);
    std::fs::remove_dir_all(store).expect("clean store");
}

#[test]
fn setjob_validates_range_and_rank_lists_players() {
    let store = temp_path("setjob");
    let rejected = gembot(&store, &["setjob", "u1", "9"]);
    assert!(!rejected.status.success());
    assert!(stdout(&rejected).contains("between 0 and 3"));

    let accepted = gembot(&store, &["setjob", "u1", "3"]);
    assert!(accepted.status.success());
    assert!(stdout(&accepted).contains("Tech CEO"));

    let rank = gembot(&store, &["rank"]);
    assert!(rank.status.success());
    let text = stdout(&rank);
    assert!(text.contains("👑 1."));
    assert!(text.contains("Unknown User (u1...)"));
    std::fs::remove_dir_all(store).expect("clean store");
}

#[test]
fn empty_rank_hints_at_work() {
    let store = temp_path("empty");
    let output = gembot(&store, &["rank"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Use `work`"));
}

#[test]
fn dispatch_reads_envelope_file() {
    let store = temp_path("dispatch");
    let request = temp_path("request.json");
    std::fs::write(&request, r#"{"name": "lottery", "user_id": "1"}"#).expect("write request");
    let output = gembot(&store, &["dispatch", request.to_str().expect("utf8 path")]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("lottery buy"));
    std::fs::remove_file(request).expect("clean request");
}

#[test]
fn simulate_writes_markdown_report() {
    let store = temp_path("sim-store");
    let output_path = temp_path("sim.md");
    let status = Command::new(env!("CARGO_BIN_EXE_gembot"))
        .args([
            "simulate",
            "--players",
            "3",
            "--rounds",
            "12",
            "--seeds",
            "1,2",
            "--report",
            "markdown",
            "--output",
        ])
        .arg(&output_path)
        .arg("--store")
        .arg(&store)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("## Seed 1"));
    assert!(content.contains("## Seed 2"));
    assert!(!store.exists());
    std::fs::remove_file(output_path).expect("clean output");
}
