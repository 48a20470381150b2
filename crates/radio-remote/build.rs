//! Stamps the binary with the commit and build time shown by `--version`.

use std::process::Command;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn main() {
    for var in ["SOURCE_DATE_EPOCH", "RADIO_REMOTE_GIT_SHA"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    println!("cargo:rustc-env=GIT_SHA={}", commit());
    println!("cargo:rustc-env=BUILD_DATE={}", build_time());
}

/// Short commit hash; packagers without a checkout can pin it by env var.
fn commit() -> String {
    if let Ok(pinned) = std::env::var("RADIO_REMOTE_GIT_SHA") {
        if !pinned.trim().is_empty() {
            return pinned.trim().to_owned();
        }
    }
    let out = match Command::new("git").args(["rev-parse", "--short=10", "HEAD"]).output() {
        Ok(out) if out.status.success() => out.stdout,
        _ => return "unknown".to_owned(),
    };
    match String::from_utf8_lossy(&out).trim() {
        "" => "unknown".to_owned(),
        sha => sha.to_owned(),
    }
}

/// Reproducible builds set `SOURCE_DATE_EPOCH`; otherwise use the current time.
fn build_time() -> String {
    let stamp = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());
    stamp
        .unwrap_or_else(OffsetDateTime::now_utc)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown-date".to_owned())
}
