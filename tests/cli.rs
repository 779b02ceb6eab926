//! End-to-end tests of the `ttycast` binary that need no network.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn ttycast() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ttycast"))
}

fn ttyrec_frame(sec: u32, usec: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&sec.to_le_bytes());
    out.extend_from_slice(&usec.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

#[test]
fn test_version() {
    let output = ttycast().arg("version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ttycast "), "got: {stdout}");
}

#[test]
fn test_convert_writes_both_streams() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("session.ttyrec");
    let mut raw = ttyrec_frame(100, 0, b"$ ");
    raw.extend(ttyrec_frame(100, 250_000, b"exit\r\n"));
    std::fs::write(&input, raw).unwrap();

    let script = dir.path().join("session.script");
    let timing = dir.path().join("session.timing");
    let output = ttycast()
        .arg("convert")
        .arg(&input)
        .arg(&script)
        .arg(&timing)
        .output()
        .unwrap();

    assert!(output.status.success(), "convert failed: {output:?}");
    assert_eq!(std::fs::read_to_string(&timing).unwrap(), "0.0 2\n0.25 6\n");
    let script_text = std::fs::read_to_string(&script).unwrap();
    assert!(script_text.ends_with("$ exit\r\n"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 frames, 8 bytes"));
}

#[test]
fn test_convert_rejects_short_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("short.ttyrec");
    std::fs::write(&input, b"tiny").unwrap();

    let output = ttycast()
        .arg("convert")
        .arg(&input)
        .arg(dir.path().join("out.script"))
        .arg(dir.path().join("out.timing"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not a valid ttyrec file"),
        "Expected conversion error, got: {stderr}"
    );
    assert!(!dir.path().join("out.script").exists());
}

#[test]
fn test_convert_missing_file() {
    let output = ttycast()
        .args(["convert", "/nonexistent/in.ttyrec", "/tmp/x.script", "/tmp/x.timing"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"), "got: {stderr}");
}

/// `dirs` honours XDG variables on Linux only.
#[cfg(target_os = "linux")]
#[test]
fn test_record_without_upload_uses_configured_fallback() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let config_home = dir.path().join("config");
    let data_home = dir.path().join("data");
    let ttyrec = dir.path().join("fake-ttyrec");
    std::fs::write(
        &ttyrec,
        "#!/bin/sh\nfor last; do :; done\nprintf '\\000\\000\\000\\000\\000\\000\\000\\000\\002\\000\\000\\000hi' > \"$last\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&ttyrec, std::fs::Permissions::from_mode(0o755)).unwrap();

    std::fs::create_dir_all(config_home.join("ttycast")).unwrap();
    std::fs::write(
        config_home.join("ttycast/config.toml"),
        format!(
            "[capture]\nfallback_utility = \"{}\"\n",
            ttyrec.display()
        ),
    )
    .unwrap();

    let prefix = dir.path().join("out/demo");
    let output = ttycast()
        .env("XDG_CONFIG_HOME", &config_home)
        .env("XDG_DATA_HOME", &data_home)
        .args(["record", "--strategy", "fallback", "--no-upload", "--output"])
        .arg(&prefix)
        .args(["--", "echo", "hi"])
        .output()
        .unwrap();

    assert!(output.status.success(), "record failed: {output:?}");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out/demo.timing")).unwrap(),
        "0.0 2\n"
    );
    let script = std::fs::read(dir.path().join("out/demo.script")).unwrap();
    assert!(script.ends_with(b"hi"));
    assert!(!Path::new(&data_home).join("ttycast/recordings").exists());
}
