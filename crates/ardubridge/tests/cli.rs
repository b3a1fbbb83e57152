#![cfg(feature = "cli")]

use std::process::Command;

fn ardubridge() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ardubridge"));
    cmd.env_remove("ARDUBRIDGE_PORT")
        .env_remove("ARDUBRIDGE_BAUD")
        .args(["--log-level", "error"]);
    cmd
}

#[test]
fn version_prints_package_version() {
    let output = ardubridge().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("ardubridge {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_wire_constants() {
    let output = ardubridge()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("ardubridge {}", env!("CARGO_PKG_VERSION"))));
    assert!(stdout.contains("reset_byte: 0x1b"));
    assert!(stdout.contains("escape_byte: 0x5c"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = ardubridge().arg("frobnicate").output().expect("cli should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn board_command_without_port_is_usage_error() {
    let output = ardubridge()
        .args(["gpio", "read", "2"])
        .output()
        .expect("cli should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ARDUBRIDGE_PORT"));
}

#[test]
fn missing_device_is_transport_error() {
    let output = ardubridge()
        .args(["--port", "/dev/ardubridge-missing-0", "--retries", "0", "id"])
        .output()
        .expect("cli should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/dev/ardubridge-missing-0"));
}

#[test]
fn ports_lists_as_json() {
    let output = ardubridge()
        .args(["--format", "json", "ports"])
        .output()
        .expect("ports should run");

    // Hosts without a readable sysfs cannot enumerate; that is a transport error.
    if !output.status.success() {
        assert_eq!(output.status.code(), Some(3));
        return;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        assert!(line.starts_with('{') && line.contains("\"name\""), "{line}");
    }
}

#[test]
fn help_exits_zero() {
    let output = ardubridge().arg("--help").output().expect("help should run");
    assert!(output.status.success());
}
