//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides
//! through the CLI surface.

mod common;

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Test fixture for configuration testing
struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

fn chat_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nomads-chat").unwrap();
    cmd.env_remove("NOMADS_CONFIG")
        .env_remove("NOMADS_OPENAI_API_KEY")
        .env_remove("NOMADS_OPENAI_MODEL")
        .env_remove("NOMADS_DOCS_DIR")
        .env_remove("NOMADS_LOG_LEVEL");
    cmd
}

fn validate(fixture: &ConfigFixture) -> assert_cmd::assert::Assert {
    chat_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[documents]

[openai]

[retrieval]

[chat]

[logging]
"#,
    );

    validate(&fixture)
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_empty_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    validate(&fixture).success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[documents]
dir = "./reference"

[openai]
base_url = "http://localhost:11434/v1"
api_key = "sk-local"
model = "llama3"
embedding_model = "nomic-embed-text"
timeout_secs = 30
max_retries = 3

[retrieval]
chunk_chars = 600
chunk_overlap = 60
top_k = 5
min_score = 0.25

[chat]
replay_history = false
max_history_messages = 6
streaming = false

[logging]
level = "trace"
max_files = 3
json_format = true
"#,
    );

    validate(&fixture).success();
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_malformed_toml_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[documents\ndir = oops");

    validate(&fixture)
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_bad_log_level_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "loud"
"#,
    );

    validate(&fixture)
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_zero_top_k_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[retrieval]
top_k = 0
"#,
    );

    validate(&fixture)
        .failure()
        .code(10)
        .stderr(predicate::str::contains("top_k"));
}

#[test]
fn test_overlap_must_be_smaller_than_chunk() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[retrieval]
chunk_chars = 100
chunk_overlap = 100
"#,
    );

    validate(&fixture)
        .failure()
        .code(10)
        .stderr(predicate::str::contains("chunk_overlap"));
}

#[test]
fn test_bad_base_url_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[openai]
base_url = "not a url at all"
"#,
    );

    validate(&fixture)
        .failure()
        .code(10)
        .stderr(predicate::str::contains("base URL"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_model() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[openai]
model = "gpt-4"
"#,
    );

    chat_cmd()
        .env("NOMADS_OPENAI_MODEL", "custom-model")
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-model"));
}

#[test]
fn test_env_overrides_documents_dir() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[documents]
dir = "./from-file"
"#,
    );

    chat_cmd()
        .env("NOMADS_DOCS_DIR", "/srv/from-env")
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("/srv/from-env"));
}

#[test]
fn test_env_override_still_validated() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    chat_cmd()
        .env("NOMADS_LOG_LEVEL", "shouting")
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Invalid log level"));
}

// ─────────────────────────────────────────────────────────────────
// Fixture Files
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_bundled_valid_fixture_passes() {
    chat_cmd()
        .args(["config", "validate", "--config"])
        .arg(common::valid_config_fixture())
        .assert()
        .success();
}

#[test]
fn test_bundled_invalid_fixture_fails() {
    chat_cmd()
        .args(["config", "validate", "--config"])
        .arg(common::invalid_config_fixture())
        .assert()
        .failure()
        .code(10);
}
