//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the nomads-chat binary with a clean environment
fn chat_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nomads-chat").unwrap();
    // Keep ambient configuration out of the tests
    cmd.env_remove("NOMADS_CONFIG")
        .env_remove("NOMADS_OPENAI_API_KEY")
        .env_remove("NOMADS_DOCS_DIR")
        .env_remove("NOMADS_PERSONA")
        .env_remove("NOMADS_LOG_LEVEL");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    chat_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nomads Stakeholder Chat"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("persona"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_version_command() {
    chat_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nomads-chat"))
        .stdout(predicate::str::contains("branch:"))
        .stdout(predicate::str::contains("built:"))
        .stdout(predicate::str::contains("rustc:"));
}

#[test]
fn test_short_version_flag() {
    chat_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nomads-chat"));
}

// ─────────────────────────────────────────────────────────────────
// Persona Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_persona_list_shows_all_stakeholders() {
    chat_cmd()
        .args(["persona", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("municipality"))
        .stdout(predicate::str::contains("e-retailer"))
        .stdout(predicate::str::contains("retail-buyer"))
        .stdout(predicate::str::contains("competitor"))
        .stdout(predicate::str::contains("waste-expert"))
        .stdout(predicate::str::contains("Sanne de Vries (Municipality)"))
        .stdout(predicate::str::contains("Jeroen Bakker (Waste Expert)"));
}

#[test]
fn test_persona_show_prints_instruction() {
    chat_cmd()
        .args(["persona", "show", "municipality"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sanne de Vries"))
        .stdout(predicate::str::contains("Gemeente Utrecht"))
        .stdout(predicate::str::contains("circular systems"));
}

#[test]
fn test_persona_show_unknown_fails() {
    chat_cmd()
        .args(["persona", "show", "ceo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown persona"));
}

// ─────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_validate_valid_fixture() {
    chat_cmd()
        .args(["config", "validate", "--config"])
        .arg(common::valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_config_validate_invalid_fixture() {
    chat_cmd()
        .args(["config", "validate", "--config"])
        .arg(common::invalid_config_fixture())
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn test_config_validate_missing_file() {
    chat_cmd()
        .args(["config", "validate", "--config", "/no/such/config.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_show_prints_sections() {
    chat_cmd()
        .args(["config", "show", "--config"])
        .arg(common::valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("[documents]"))
        .stdout(predicate::str::contains("[openai]"))
        .stdout(predicate::str::contains("[retrieval]"))
        .stdout(predicate::str::contains("[chat]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_init_then_validate() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("chat.toml");

    chat_cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    chat_cmd()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("chat.toml");
    std::fs::write(&path, "# existing").unwrap();

    chat_cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ─────────────────────────────────────────────────────────────────
// Startup Gate / Credential Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_ask_without_api_key_is_fatal() {
    chat_cmd()
        .args([
            "ask",
            "What changed?",
            "--persona",
            "municipality",
            "--password",
            "anything",
        ])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E110"))
        .stderr(predicate::str::contains("NOMADS_OPENAI_API_KEY"));
}

#[test]
fn test_wrong_password_halts_before_any_work() {
    // With a key present and documents available, a wrong password must
    // still stop the pipeline at the gate (exit before any indexing).
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("doc.txt"), "reference").unwrap();

    chat_cmd()
        .env("NOMADS_OPENAI_API_KEY", "sk-test")
        .env("NOMADS_DOCS_DIR", temp.path())
        .args([
            "ask",
            "What changed?",
            "--persona",
            "municipality",
            "--password",
            "wrong-password",
        ])
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("Access denied"));
}

#[test]
fn test_missing_documents_directory_is_fatal() {
    chat_cmd()
        .env("NOMADS_OPENAI_API_KEY", "sk-test")
        .env("NOMADS_DOCS_DIR", "/no/such/docs")
        .args([
            "ask",
            "What changed?",
            "--persona",
            "municipality",
            "--password",
            "nomads2025",
        ])
        .assert()
        .failure()
        .code(20)
        .stderr(predicate::str::contains("Document directory not found"));
}

#[test]
fn test_empty_documents_directory_is_fatal() {
    let temp = tempfile::TempDir::new().unwrap();

    chat_cmd()
        .env("NOMADS_OPENAI_API_KEY", "sk-test")
        .env("NOMADS_DOCS_DIR", temp.path())
        .args([
            "ask",
            "What changed?",
            "--persona",
            "municipality",
            "--password",
            "nomads2025",
        ])
        .assert()
        .failure()
        .code(20)
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn test_ask_unknown_persona_fails_before_prompting() {
    chat_cmd()
        .args(["ask", "question", "--persona", "ghost", "--password", "x"])
        .assert()
        .failure()
        .code(60)
        .stderr(predicate::str::contains("Unknown persona"));
}
