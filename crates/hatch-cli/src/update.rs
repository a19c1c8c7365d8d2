//! Background check for a newer release of the CLI.
//!
//! At most once a day the registry is asked for the latest
//! published version of [`PACKAGE`]. Failures are logged at debug level and
//! never affect the command being run.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use semver::Version;
use tracing::debug;

use hatch_adapters::NpmRegistry;
use hatch_core::application::ports::PackageRegistry;
use hatch_core::domain::Deadline;

use crate::config::AppConfig;

/// Package the CLI is published as.
pub const PACKAGE: &str = "@hatch-cli/core";

const STAMP_FILE: &str = "last-update-check";
const CHECK_INTERVAL_HOURS: i64 = 24;
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Returns the newer version, if one was found.
pub fn check(config: &AppConfig) -> Option<Version> {
    if !config.check_updates {
        return None;
    }
    let stamp = config.cli_home().join(STAMP_FILE);
    let now = Utc::now();
    if !is_due(&stamp, now) {
        debug!("update check skipped; checked recently");
        return None;
    }
    if let Err(e) = write_stamp(&stamp, now) {
        debug!(error = %e, "cannot record update check");
    }

    let latest = NpmRegistry::new(config.registry_url.clone())
        .and_then(|registry| registry.resolve_latest(PACKAGE, &Deadline::after(LOOKUP_TIMEOUT)));
    match latest {
        Ok(latest) => newer_than(env!("CARGO_PKG_VERSION"), &latest),
        Err(e) => {
            debug!(error = %e, "update check failed");
            None
        }
    }
}

fn is_due(stamp: &Path, now: DateTime<Utc>) -> bool {
    let last = fs::read_to_string(stamp)
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|t| t.with_timezone(&Utc));
    match last {
        Some(last) => now - last >= TimeDelta::hours(CHECK_INTERVAL_HOURS),
        None => true,
    }
}

fn write_stamp(stamp: &Path, now: DateTime<Utc>) -> std::io::Result<()> {
    if let Some(parent) = stamp.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(stamp, now.to_rfc3339())
}

fn newer_than(current: &str, latest: &str) -> Option<Version> {
    let current = Version::parse(current).ok()?;
    let latest = Version::parse(latest).ok()?;
    (latest > current).then_some(latest)
}
