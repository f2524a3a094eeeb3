use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn qrcard(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qrcard"))
        .args(args)
        .current_dir(workdir)
        .env("XDG_CONFIG_HOME", workdir.join("config"))
        .env("QRCARD_HISTORY", "false")
        .env("QRCARD_LOG_LEVEL", "error")
        .env_remove("QRCARD_URL")
        .output()
        .expect("run qrcard")
}

#[test]
fn writes_png_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out/card.png");

    let output = qrcard(
        dir.path(),
        &["--url", "https://example.com/cv", "--output", out.to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let png = fs::read(&out).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}

#[test]
fn unwritable_output_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"file").unwrap();
    let out = blocker.join("card.png");

    let output = qrcard(
        dir.path(),
        &["--url", "https://example.com/cv", "--output", out.to_str().unwrap()],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to write"), "stderr: {stderr}");
    assert!(!out.exists());
}

#[test]
fn rejected_url_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();

    let output = qrcard(dir.path(), &["--url", "ftp://x.com"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid input"));
}
