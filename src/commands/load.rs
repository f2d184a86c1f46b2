use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::library::index::ContentIndex;

/// Replaces `index` with the contents of `path`; on error `index` is left as it was.
pub fn run(path: &Path, index: &mut ContentIndex) -> Result<CommandReport> {
    let mut report = CommandReport::new("load");
    let loaded = ContentIndex::load(path)?;

    report.detail(format!("index={}", path.display()));
    report.detail(format!("records={}", loaded.len()));
    *index = loaded;
    Ok(report)
}
