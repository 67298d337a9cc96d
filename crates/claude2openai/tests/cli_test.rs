use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn version_prints_welcome_and_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("claude2openai")?;
    cmd.arg("--version");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Welcome to Claude2OpenAI"))
        .stderr(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn help_lists_flags() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("claude2openai")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--upstream-url"))
        .stdout(predicate::str::contains("--log-file"));
    Ok(())
}

#[test]
fn unreadable_config_fails_to_start() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("claude2openai")?;
    cmd.args(["--config", "/nonexistent/claude2openai/config.yml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
    Ok(())
}
