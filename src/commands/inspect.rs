use std::env;

use crate::commands::CommandReport;
use crate::library::index::ContentIndex;

include!(concat!(env!("OUT_DIR"), "/imglib_env_allowlist.rs"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub records: usize,
    pub paths: usize,
    pub duplicate_records: usize,
    pub redundant_copies: usize,
    pub undated: usize,
    pub with_event: usize,
    pub total_bytes: u64,
    pub reclaimable_bytes: u64,
}

pub fn stats(index: &ContentIndex) -> IndexStats {
    let mut stats = IndexStats::default();
    for (_, record) in index.iter() {
        let extra = record.paths.len().saturating_sub(1);
        stats.records += 1;
        stats.paths += record.paths.len();
        stats.redundant_copies += extra;
        stats.total_bytes += record.size;
        stats.reclaimable_bytes += record.size * extra as u64;
        if extra > 0 {
            stats.duplicate_records += 1;
        }
        if record.date.is_none() {
            stats.undated += 1;
        }
        if record.event.is_some() {
            stats.with_event += 1;
        }
    }
    stats
}

/// Summary of the in-memory index plus the `IMGLIB_*` overrides in effect.
pub fn run(index: &ContentIndex) -> CommandReport {
    let mut report = CommandReport::new("debug");
    let stats = stats(index);

    report.detail(format!("records={}", stats.records));
    report.detail(format!("paths={}", stats.paths));
    report.detail(format!("duplicate_records={}", stats.duplicate_records));
    report.detail(format!("redundant_copies={}", stats.redundant_copies));
    report.detail(format!("undated={}", stats.undated));
    report.detail(format!("with_event={}", stats.with_event));
    report.detail(format!("total_bytes={}", stats.total_bytes));
    report.detail(format!("reclaimable_bytes={}", stats.reclaimable_bytes));

    for key in GENERATED_IMGLIB_ENV_ALLOWLIST {
        if let Ok(value) = env::var(key) {
            report.detail(format!("env.{key}={value}"));
        }
    }
    report
}
