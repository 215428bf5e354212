//! Embeds git and toolchain metadata as NOMADS_* rustc-env vars, read back
//! by src/version.rs.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let hash = run("git", &["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(unknown);
    let branch = run("git", &["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(unknown);
    let dirty = match run("git", &["status", "--porcelain"]) {
        Some(out) if out.is_empty() => "false",
        Some(_) => "true",
        None => "unknown",
    };
    let rustc = run("rustc", &["--version"]).unwrap_or_else(unknown);
    let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    emit("NOMADS_GIT_HASH", &hash);
    emit("NOMADS_GIT_BRANCH", &branch);
    emit("NOMADS_GIT_DIRTY", dirty);
    emit("NOMADS_BUILD_TIMESTAMP", &stamp.to_string());
    emit("NOMADS_TARGET", &env::var("TARGET").unwrap_or_else(|_| unknown()));
    emit("NOMADS_PROFILE", &env::var("PROFILE").unwrap_or_else(|_| unknown()));
    emit("NOMADS_RUSTC_VERSION", &rustc);
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

/// Run a command, returning trimmed stdout on success only.
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8(output.stdout).ok()?.trim().to_string())
}

fn unknown() -> String {
    "unknown".to_string()
}
