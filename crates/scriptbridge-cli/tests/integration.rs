//! Integration tests for the scriptbridge binary

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scriptbridge.toml")
}

fn scriptbridge_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("scriptbridge");
    cmd.env("SCRIPTBRIDGE_CONFIG", fixture_config_path());
    cmd
}

fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Err(e) = fs::write(&path, text) {
        panic!("failed to write {}: {}", path.display(), e);
    }
    path
}

#[test]
fn test_version() {
    scriptbridge_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scriptbridge"));
}

#[test]
fn test_help() {
    scriptbridge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("share a registry of host objects"));
}

#[test]
fn test_invalid_command() {
    scriptbridge_cmd().arg("invalid").assert().failure();
}

#[test]
fn test_languages_lists_python() {
    scriptbridge_cmd()
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("python"))
        .stdout(predicate::str::contains(".jy"));
}

#[test]
fn test_eval_expression() {
    scriptbridge_cmd()
        .args(["eval", "1 + 1"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_eval_json() {
    scriptbridge_cmd()
        .args(["eval", "--json", "'a' + 'b'"])
        .assert()
        .success()
        .stdout("\"ab\"\n");
}

#[test]
fn test_eval_with_bean() {
    scriptbridge_cmd()
        .args(["eval", "--bean", "count:int=41", "count + 1"])
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_eval_unknown_language() {
    scriptbridge_cmd()
        .args(["eval", "--lang", "tcl", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No scripting engine registered"));
}

#[test]
fn test_run_prints_script_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "hello.py", "print \"PASSED\"\n");
    scriptbridge_cmd()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout("PASSED\n");
    Ok(())
}

#[test]
fn test_run_configured_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "hello.jy", "print \"from\", \"jy\"\n");
    scriptbridge_cmd()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout("from jy\n");
    Ok(())
}

#[test]
fn test_run_eval_mode_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let script = write_script(
        dir.path(),
        "calc.py",
        "def square(x):\n    return x * x\nsquare(7)\n",
    );
    scriptbridge_cmd()
        .args(["run", "--mode", "eval", "--json"])
        .arg(&script)
        .assert()
        .success()
        .stdout("49\n");
    Ok(())
}

#[test]
fn test_run_reports_error_location() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "broken.py", "x = 1\ny = x / 0\n");
    scriptbridge_cmd()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.py:2"))
        .stderr(predicate::str::contains("ZeroDivisionError"));
    Ok(())
}

#[test]
fn test_run_unknown_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "script.rb", "puts 1\n");
    scriptbridge_cmd()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no language for extension '.rb'"));
    Ok(())
}

#[test]
fn test_config_set_and_show() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let config = dir.path().join("scriptbridge.toml");

    cargo_bin_cmd!("scriptbridge")
        .env("SCRIPTBRIDGE_CONFIG", &config)
        .args(["config", "set", "bridge-binding", "host"])
        .assert()
        .success();
    assert!(fs::read_to_string(&config)?.contains("bridge-binding = \"host\""));

    cargo_bin_cmd!("scriptbridge")
        .env("SCRIPTBRIDGE_CONFIG", &config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bridge-binding"))
        .stdout(predicate::str::contains("host"));
    Ok(())
}

#[test]
fn test_config_set_unknown_key() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    cargo_bin_cmd!("scriptbridge")
        .env("SCRIPTBRIDGE_CONFIG", dir.path().join("scriptbridge.toml"))
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
    Ok(())
}

#[test]
fn test_config_path_honors_env() {
    scriptbridge_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scriptbridge.toml"));
}

#[test]
fn test_custom_bridge_binding() {
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(e) => panic!("tempdir: {}", e),
    };
    let config = write_script(dir.path(), "scriptbridge.toml", "bridge-binding = \"host\"\n");
    cargo_bin_cmd!("scriptbridge")
        .env("SCRIPTBRIDGE_CONFIG", &config)
        .args(["eval", "host.lookupBean(\"missing\") is None"])
        .assert()
        .success()
        .stdout("true\n");
}
