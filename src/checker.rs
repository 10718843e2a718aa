use tracing::{debug, warn};

use crate::distro::{DistroProfile, UpdateFormat};
use crate::runner::CommandRunner;

/// One pending update as reported by the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub package_name: String,
    /// Rest of the matched line, e.g. `1.0 -> 1.1`. Display only.
    pub detail: String,
}

/// Refreshes the package database (best effort) and lists pending updates
/// in the order the tool printed them.
pub fn check(profile: &DistroProfile, runner: &dyn CommandRunner) -> Vec<UpdateRecord> {
    if let Some(refresh) = &profile.refresh_cmd {
        let output = runner.run(refresh);
        if !output.success {
            warn!("Package database refresh failed, listing from the existing cache");
        }
    }

    let Some(list) = &profile.list_cmd else {
        return Vec::new();
    };

    let output = runner.run(list);
    let updates = parse_updates(&output.stdout, &profile.format);
    debug!("{} reported {} update(s)", list.program(), updates.len());
    updates
}

/// Extracts update records from list output. Lines that do not match
/// `format` are headers or noise and are dropped.
pub fn parse_updates(output: &str, format: &UpdateFormat) -> Vec<UpdateRecord> {
    output
        .lines()
        .filter(|line| match format {
            UpdateFormat::Transition { marker } => line.contains(marker.as_str()),
            UpdateFormat::Columns => !line.trim().is_empty(),
        })
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<UpdateRecord> {
    let mut tokens = line.split_whitespace();
    let package_name = tokens.next()?.to_string();
    let detail = tokens.collect::<Vec<_>>().join(" ");
    Some(UpdateRecord {
        package_name,
        detail,
    })
}
