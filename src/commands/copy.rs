use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::library::archiver::{self, CopyOutcome};
use crate::library::index::ContentIndex;

pub fn run(basepath: &Path, index: &ContentIndex) -> Result<CommandReport> {
    let mut report = CommandReport::new("copy");
    if index.is_empty() {
        report.detail("index is empty; only the index file will be written");
    }
    let outcome = archiver::archive(index, basepath)?;

    for (hash, item) in &outcome.items {
        match item {
            CopyOutcome::Copied {
                source,
                destination,
            } => report.detail(format!(
                "copied {hash} {} --> {}",
                source.display(),
                destination.display()
            )),
            CopyOutcome::Skipped { destination } => report.detail(format!(
                "skipped {hash} already at {}",
                destination.display()
            )),
        }
    }
    for failure in &outcome.failures {
        report.issue(format!("{} {}: {}", failure.code, failure.hash, failure.error));
    }

    report.detail(format!("archive={}", basepath.display()));
    report.detail(format!("copied={}", outcome.copied()));
    report.detail(format!("skipped={}", outcome.skipped()));
    report.detail(format!("failed={}", outcome.failures.len()));
    report.detail(format!("index={}", outcome.index_path.display()));
    Ok(report)
}
