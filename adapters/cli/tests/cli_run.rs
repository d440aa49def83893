use std::process::Command;

fn grower() -> Command {
    Command::new(env!("CARGO_BIN_EXE_grower"))
}

#[test]
fn quiet_autopilot_run_succeeds() {
    let output = grower()
        .args(["--seed", "11", "--quiet"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch grower");

    assert!(output.status.success(), "grower exited with {:?}", output.status);
    assert!(output.stdout.is_empty());
}

#[test]
fn banner_and_summary_are_printed() {
    let output = grower()
        .args(["--seed", "11"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch grower");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Welcome to Grower."));
    assert!(stdout.contains("scene 0 level 0:"));
}

#[test]
fn missing_config_file_is_reported() {
    let output = grower()
        .args(["--config", "does/not/exist.toml", "--quiet"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch grower");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config"));
}
