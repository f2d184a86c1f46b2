use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::library::config::ScanConfig;
use crate::library::index::ContentIndex;
use crate::library::progress::ScanProgress;
use crate::library::scanner;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub roots: Vec<PathBuf>,
    pub show_progress: bool,
}

/// Scans each root in order. The first inaccessible root aborts the command.
pub fn run(
    opts: &ScanOptions,
    cfg: &ScanConfig,
    index: &mut ContentIndex,
) -> Result<CommandReport> {
    let mut report = CommandReport::new("scan");

    for root in &opts.roots {
        let label = root.display().to_string();
        let mut progress = ScanProgress::new(&label, cfg.progress_every, opts.show_progress);
        let outcome = scanner::scan(root, cfg, index, &mut progress)?;
        progress.finish();

        report.detail(format!(
            "root={} processed={} new={} merged={} excluded={} failed={}",
            outcome.root.display(),
            outcome.processed,
            outcome.created,
            outcome.merged,
            outcome.excluded,
            outcome.failures.len()
        ));
        for failure in &outcome.failures {
            report.issue(format!(
                "{} {}: {}",
                failure.code,
                failure.path.display(),
                failure.error
            ));
        }
    }

    report.detail(format!("records={}", index.len()));
    Ok(report)
}
