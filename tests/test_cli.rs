use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SSH_RECORD: &str = "Jan  1 00:00:01 gw kernel: Inbound IN=eth0 OUT= SRC=203.0.113.5 \
                          DST=198.51.100.9 LEN=60 TOS=0x00 PROTO=TCP DPT=22 \n";
const HTTP_RECORD: &str = "Jan  1 00:00:02 gw kernel: Inbound IN=eth0 OUT= SRC=203.0.113.6 \
                           DST=192.0.2.80 LEN=60 TOS=0x00 PROTO=TCP DPT=80 \n";

/// Temporary log plus a config pointing the OS databases at local files
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(log: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("messages"), log).unwrap();
        std::fs::write(dir.path().join("services"), "").unwrap();
        std::fs::write(dir.path().join("protocols"), "tcp 6 TCP\n").unwrap();
        std::fs::write(
            dir.path().join("hitlog.toml"),
            format!(
                "[netdb]\nservices = {:?}\nprotocols = {:?}\n",
                dir.path().join("services"),
                dir.path().join("protocols")
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo_bin_cmd!("hitlog");
        cmd.arg("--config").arg(self.path("hitlog.toml"));
        cmd
    }
}

fn log_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_modes() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("hitlog");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--follow"))
        .stdout(predicate::str::contains("--tail-only"))
        .stdout(predicate::str::contains("--save"));
}

#[test]
fn test_version_prints_semantic_version() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("hitlog");
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::is_match(r"hitlog \d+\.\d+\.\d+").unwrap());
}

#[test]
fn test_reload_prints_hits_and_summary() {
    let sandbox = Sandbox::new(&format!("{}{}", SSH_RECORD, HTTP_RECORD));
    let log = sandbox.path("messages");

    sandbox
        .cmd()
        .args(["--firewall-ip", "198.51.100.9", log_arg(&log)])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[SERIOUS] HIT: Jan  1 00:00:01 from 203.0.113.5 to 198.51.100.9:22, protocol TCP, service SSH",
        ))
        .stdout(predicate::str::contains(
            "HIT: Jan  1 00:00:02 from 203.0.113.6 to 192.0.2.80:80, protocol TCP, service HTTP",
        ))
        .stdout(predicate::str::contains(
            "Summary: 2 events (inbound: 2, outbound: 0, serious inbound: 1, serious outbound: 0)",
        ));
}

#[test]
fn test_json_output() {
    let sandbox = Sandbox::new(SSH_RECORD);
    let log = sandbox.path("messages");

    let output = sandbox
        .cmd()
        .args(["--json", "--firewall-ip", "198.51.100.9", log_arg(&log)])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "summary goes to stderr in JSON mode");

    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["service"], "SSH");
    assert_eq!(event["direction"], "Inbound");
    assert_eq!(event["serious"], true);
    assert!(event["observed_at"].is_string());
}

#[test]
fn test_only_mine_filters_passing_traffic() {
    let sandbox = Sandbox::new(&format!("{}{}", SSH_RECORD, HTTP_RECORD));
    let log = sandbox.path("messages");

    sandbox
        .cmd()
        .args(["--only-mine", "--firewall-ip", "198.51.100.9", log_arg(&log)])
        .assert()
        .success()
        .stdout(predicate::str::contains("service SSH"))
        .stdout(predicate::str::contains("service HTTP").not());
}

#[test]
fn test_quiet_suppresses_summary() {
    let sandbox = Sandbox::new(SSH_RECORD);
    let log = sandbox.path("messages");

    sandbox
        .cmd()
        .args(["--quiet", log_arg(&log)])
        .assert()
        .success()
        .stdout(predicate::str::contains("HIT:"))
        .stdout(predicate::str::contains("Summary").not());
}

#[test]
fn test_save_writes_event_file() {
    let sandbox = Sandbox::new(&format!("{}{}", SSH_RECORD, HTTP_RECORD));
    let log = sandbox.path("messages");
    let saved = sandbox.path("events.txt");

    sandbox
        .cmd()
        .args(["--quiet", "--save", log_arg(&saved), log_arg(&log)])
        .assert()
        .success();

    let content = std::fs::read_to_string(&saved).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "Time:Jan  1 00:00:01 Direction: Inbound In:eth0 Out: Port:22 Source:203.0.113.5 \
         Destination:198.51.100.9 Length:60 TOS:0x00 Protocol:TCP Service:SSH"
    );
}

#[test]
fn test_missing_log_fails() {
    let sandbox = Sandbox::new("");
    let missing = sandbox.path("absent.log");

    sandbox
        .cmd()
        .arg(log_arg(&missing))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Log file not found or access denied"));
}

#[test]
fn test_invalid_config_rejected() {
    let sandbox = Sandbox::new(SSH_RECORD);
    let config = sandbox.path("bad.toml");
    std::fs::write(&config, "[log]\npoll_interval_ms = 1\n").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("hitlog");
    cmd.arg("--config")
        .arg(&config)
        .arg(log_arg(&sandbox.path("messages")))
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn test_invalid_firewall_ip_rejected() {
    let sandbox = Sandbox::new(SSH_RECORD);
    sandbox
        .cmd()
        .args(["--firewall-ip", "not-an-ip", log_arg(&sandbox.path("messages"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not an IPv4 address"));
}
