//! Build script for DietLens
//!
//! Bumps the local build counter and embeds build metadata for the status tool.

use std::fs;
use std::path::Path;

const BUILD_COUNTER_FILE: &str = "build_number.txt";

fn read_counter(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn main() {
    println!("cargo:rerun-if-changed=src");

    let counter_path = Path::new(BUILD_COUNTER_FILE);
    let build = read_counter(counter_path) + 1;

    // A read-only checkout still builds, it just keeps reporting the same number
    if let Err(e) = fs::write(counter_path, build.to_string()) {
        println!("cargo:warning=could not persist build counter: {}", e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=DIETLENS_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=DIETLENS_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=DIETLENS_BUILD_PROFILE={}", profile);
}
