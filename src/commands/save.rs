use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::library::index::ContentIndex;

pub fn run(path: &Path, index: &ContentIndex) -> Result<CommandReport> {
    let mut report = CommandReport::new("save");
    index.save(path)?;

    report.detail(format!("index={}", path.display()));
    report.detail(format!("records={}", index.len()));
    Ok(report)
}
