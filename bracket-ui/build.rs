//! Build script for bracket-ui
//!
//! Captures build identification for the startup banner and /api/buildinfo:
//! - Git commit hash (short form)
//! - Build timestamp
//! - Build profile (debug/release)

use std::path::Path;
use std::process::Command;

fn main() {
    // Capture git commit hash (short form, 8 characters)
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Capture build timestamp in ISO 8601 format
    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    // Determine build profile
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    // Make values available to the binary via environment variables
    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    // Rerun whenever the crate's sources or embedded UI change, and when HEAD
    // moves in a git checkout, so the timestamp tracks the last real rebuild
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=ui");
    if let Some(head) = git_head() {
        println!("cargo:rerun-if-changed={}", head);
    }
}

/// Path of the repository's HEAD file, if the crate sits in a git checkout
fn git_head() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--git-path", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let head = String::from_utf8(output.stdout).ok()?.trim().to_string();
    Path::new(&head).exists().then_some(head)
}
