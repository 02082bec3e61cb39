//! Build metadata for `esa-guard --version`.
//!
//! Sets two compile-time environment variables:
//! - `ESA_GUARD_BUILD_TIMESTAMP`: UTC build time, ISO 8601
//! - `ESA_GUARD_GIT_COMMIT`: short commit hash, or "unknown" outside a git checkout

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let built_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=ESA_GUARD_BUILD_TIMESTAMP={}", built_at);

    let commit = short_commit().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=ESA_GUARD_GIT_COMMIT={}", commit);
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}
