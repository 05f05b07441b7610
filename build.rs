//! Build script for persona-forge
//!
//! Embeds build-time information into the binary:
//! - Git commit hash, branch and dirty state
//! - Build timestamp, target and profile
//! - Rust compiler version
//!
//! Also re-runs the build when the bundled data tables change, since
//! they are compiled in with `include_str!`.

use std::env;
use std::process::Command;

const DATA_TABLES: &[&str] = &[
    "config/catalog.toml",
    "config/reference.toml",
    "config/rules.toml",
    "config/criteria.toml",
];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    for table in DATA_TABLES {
        println!("cargo:rerun-if-changed={}", table);
    }

    let git_hash = run("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = run("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = match Command::new("git").args(["status", "--porcelain"]).output() {
        Ok(out) if out.status.success() => (!out.stdout.is_empty()).to_string(),
        _ => "unknown".to_string(),
    };
    let rustc_version = run("rustc", &["--version"]);

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env_or_unknown("TARGET");
    let profile = env_or_unknown("PROFILE");
    let host = env_or_unknown("HOST");

    let vars = [
        ("GIT_HASH", git_hash.as_str()),
        ("GIT_BRANCH", git_branch.as_str()),
        ("GIT_DIRTY", git_dirty.as_str()),
        ("BUILD_TIMESTAMP", build_timestamp.as_str()),
        ("TARGET", target.as_str()),
        ("PROFILE", profile.as_str()),
        ("RUSTC_VERSION", rustc_version.as_str()),
        ("HOST", host.as_str()),
    ];
    for (key, value) in vars {
        println!("cargo:rustc-env=PERSONA_FORGE_{}={}", key, value);
    }
}

/// Run a command and return its trimmed stdout, or "unknown"
fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn env_or_unknown(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| "unknown".to_string())
}
