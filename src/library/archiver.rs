use crate::error::LibraryError;
use crate::library::digest::file_hash;
use crate::library::index::{ContentIndex, INDEX_FILE_NAME, ImageRecord};
use crate::library::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Path fragments that identify the original export of a photo.
pub const PREFERRED_MARKERS: [&str; 2] = ["Masters", "Originals"];
pub const UNKNOWN_DIR: &str = "Unknown";
const LOCK_FILE_NAME: &str = ".imglib.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied { source: PathBuf, destination: PathBuf },
    Skipped { destination: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ArchiveFailure {
    pub hash: String,
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveOutcome {
    pub items: Vec<(String, CopyOutcome)>,
    pub failures: Vec<ArchiveFailure>,
    pub index_path: PathBuf,
}

impl ArchiveOutcome {
    pub fn copied(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, item)| matches!(item, CopyOutcome::Copied { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, item)| matches!(item, CopyOutcome::Skipped { .. }))
            .count()
    }
}

/// Held for the duration of an archive pass.
struct ArchiveLock {
    _file: File,
}

impl ArchiveLock {
    fn acquire(basepath: &Path) -> Result<Self> {
        let path = basepath.join(LOCK_FILE_NAME);
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.try_lock_exclusive()
            .map_err(|_| LibraryError::ArchiveLocked(basepath.to_path_buf()))?;
        Ok(Self { _file: file })
    }
}

pub fn preferred_path(record: &ImageRecord) -> Option<&str> {
    record
        .paths
        .iter()
        .find(|path| PREFERRED_MARKERS.iter().any(|marker| path.contains(marker)))
        .or_else(|| record.paths.first())
        .map(String::as_str)
}

fn is_dir_component(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

/// `<year>/<month>` for a `YYYY:MM:...` date, `Unknown` otherwise.
pub fn date_dir(date: Option<&str>) -> PathBuf {
    let Some(date) = date else {
        return PathBuf::from(UNKNOWN_DIR);
    };
    let mut parts = date.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(_))
            if is_dir_component(year) && is_dir_component(month) =>
        {
            Path::new(year).join(month)
        }
        _ => PathBuf::from(UNKNOWN_DIR),
    }
}

/// Archive-relative destination for a record, before collision handling.
pub fn destination_for(hash: &str, record: &ImageRecord) -> Result<PathBuf, LibraryError> {
    let source = preferred_path(record).ok_or_else(|| LibraryError::NoSource(hash.to_string()))?;
    let name = Path::new(source)
        .file_name()
        .ok_or_else(|| LibraryError::MissingFileName(PathBuf::from(source)))?
        .to_string_lossy();
    let event = record.event.as_deref().filter(|event| is_dir_component(event));
    let file_name = match event {
        Some(event) => format!("{event} - {name}"),
        None => name.into_owned(),
    };
    Ok(date_dir(record.date.as_deref()).join(file_name))
}

/// `dest` with `-n` appended to its stem; `n == 0` is `dest` itself.
pub fn numbered(dest: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return dest.to_path_buf();
    }
    let mut name = dest.file_stem().unwrap_or_default().to_os_string();
    name.push(format!("-{n}"));
    if let Some(ext) = dest.extension() {
        name.push(".");
        name.push(ext);
    }
    dest.with_file_name(name)
}

fn first_existing_source(hash: &str, record: &ImageRecord) -> Result<PathBuf, LibraryError> {
    record
        .paths
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .ok_or_else(|| LibraryError::NoSource(hash.to_string()))
}

/// Copies one record into the archive, renaming around collisions.
pub fn archive_record(hash: &str, record: &ImageRecord, basepath: &Path) -> Result<CopyOutcome> {
    let destination = basepath.join(destination_for(hash, record)?);
    if let Some(dir) = destination.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut n = 0;
    let target = loop {
        let candidate = numbered(&destination, n);
        let exists = candidate
            .try_exists()
            .with_context(|| format!("failed to stat {}", candidate.display()))?;
        if !exists {
            break candidate;
        }
        if file_hash(&candidate)? == hash {
            info!(hash, destination = %candidate.display(), "skipping, already archived");
            return Ok(CopyOutcome::Skipped {
                destination: candidate,
            });
        }
        n += 1;
    };

    let source = first_existing_source(hash, record)?;
    info!(hash, source = %source.display(), destination = %target.display(), "copying");
    fs::copy(&source, &target).with_context(|| {
        format!("failed to copy {} to {}", source.display(), target.display())
    })?;
    Ok(CopyOutcome::Copied {
        source,
        destination: target,
    })
}

fn failure_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<LibraryError>() {
        return err.code();
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return "IO_FAILED";
    }
    "ARCHIVE_FAILED"
}

/// Realizes the deduplicated archive under `basepath` and writes its index.
///
/// A failing record is reported and skipped; only lock, directory and index
/// write errors abort the pass.
pub fn archive(index: &ContentIndex, basepath: &Path) -> Result<ArchiveOutcome> {
    fs::create_dir_all(basepath)
        .with_context(|| format!("failed to create {}", basepath.display()))?;
    let _lock = ArchiveLock::acquire(basepath)?;

    let mut out = ArchiveOutcome::default();
    for (hash, record) in index.iter() {
        match archive_record(hash, record, basepath) {
            Ok(item) => out.items.push((hash.clone(), item)),
            Err(err) => {
                let code = failure_code(&err);
                let error = format!("{err:#}");
                warn::emit(WarnEvent {
                    code,
                    stage: "archive",
                    action: "copy-record",
                    hash,
                    path: record.paths.first().map(String::as_str).unwrap_or(""),
                    target: &basepath.display().to_string(),
                    err: &error,
                });
                out.failures.push(ArchiveFailure {
                    hash: hash.clone(),
                    code,
                    error,
                });
            }
        }
    }

    let index_path = basepath.join(INDEX_FILE_NAME);
    index.save(&index_path)?;
    info!(
        copied = out.copied(),
        skipped = out.skipped(),
        failed = out.failures.len(),
        index = %index_path.display(),
        "archive finished"
    );
    out.index_path = index_path;
    Ok(out)
}
