use crate::error::LibraryError;
use crate::library::config::ScanConfig;
use crate::library::digest::hash_bytes;
use crate::library::index::{ContentIndex, Sighting, Upsert};
use crate::library::metadata::capture_date;
use crate::library::progress::ScanProgress;
use crate::library::warn::{self, WarnEvent};
use anyhow::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Directory names that mark an exported photo library; their presence makes
/// the parent directory of a file its event.
pub const EVENT_MARKERS: [&str; 3] = ["Masters", "Originals", "Previews"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Symlink,
    Extension,
    ExcludedPath,
    TooSmall,
}

#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub root: PathBuf,
    pub processed: u64,
    pub excluded: u64,
    pub created: u64,
    pub merged: u64,
    pub failures: Vec<ScanFailure>,
}

pub fn event_for_path(path: &Path) -> Option<String> {
    let marked = path.components().any(|component| match component {
        Component::Normal(segment) => segment
            .to_str()
            .is_some_and(|segment| EVENT_MARKERS.contains(&segment)),
        _ => false,
    });
    if !marked {
        return None;
    }
    path.parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn exclusion(
    path: &Path,
    is_symlink: bool,
    cfg: &ScanConfig,
    size: impl FnOnce() -> Result<u64, LibraryError>,
) -> Result<Option<Exclusion>, LibraryError> {
    if is_symlink {
        return Ok(Some(Exclusion::Symlink));
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    if !cfg.extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
        return Ok(Some(Exclusion::Extension));
    }
    let full = path.to_string_lossy();
    if cfg.exclude.iter().any(|needle| full.contains(needle.as_str())) {
        return Ok(Some(Exclusion::ExcludedPath));
    }
    if cfg.min_size > 0 && size()? < cfg.min_size {
        return Ok(Some(Exclusion::TooSmall));
    }
    Ok(None)
}

/// Absolute form of `path` with `.` and `..` collapsed lexically.
/// Symlinks are left unresolved.
fn normalized_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

fn check_root(root: &Path) -> Result<(), LibraryError> {
    let meta = fs::metadata(root).map_err(|source| LibraryError::RootInaccessible {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(LibraryError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| LibraryError::RootInaccessible {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn ingest(
    entry: &DirEntry,
    cfg: &ScanConfig,
    index: &mut ContentIndex,
) -> Result<Option<Upsert>, LibraryError> {
    let absolute =
        normalized_absolute(entry.path()).map_err(|err| LibraryError::io(entry.path(), err))?;
    let excluded = exclusion(&absolute, entry.path_is_symlink(), cfg, || {
        entry
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| LibraryError::io(entry.path(), err.into()))
    })?;
    if let Some(reason) = excluded {
        debug!(path = %absolute.display(), ?reason, "excluded");
        return Ok(None);
    }

    let path = absolute
        .to_str()
        .ok_or_else(|| LibraryError::NonUtf8Path(absolute.clone()))?
        .to_string();
    let event = event_for_path(&absolute);
    let bytes = fs::read(&absolute).map_err(|err| LibraryError::io(&absolute, err))?;
    let hash = hash_bytes(&bytes);
    debug!(%hash, %path, "hashed");

    let sighting = Sighting {
        path,
        event,
        size: bytes.len() as u64,
    };
    Ok(Some(index.upsert(&hash, sighting, || {
        capture_date(&absolute, &bytes)
    })))
}

fn record_failure(outcome: &mut ScanOutcome, path: PathBuf, err: LibraryError) {
    let code = err.code();
    let error = format!("{:#}", anyhow::Error::from(err));
    warn::emit(WarnEvent {
        code,
        stage: "scan",
        action: "ingest-file",
        hash: "",
        path: &path.display().to_string(),
        target: "",
        err: &error,
    });
    outcome.failures.push(ScanFailure { path, code, error });
}

/// Walks `root` and folds every matching image into `index`.
///
/// An inaccessible root aborts the scan; unreadable entries below it are
/// recorded in the outcome and skipped.
pub fn scan(
    root: &Path,
    cfg: &ScanConfig,
    index: &mut ContentIndex,
    progress: &mut ScanProgress,
) -> Result<ScanOutcome> {
    check_root(root)?;

    let mut outcome = ScanOutcome {
        root: root.to_path_buf(),
        ..ScanOutcome::default()
    };

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                let io = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                record_failure(&mut outcome, path.clone(), LibraryError::io(path, io));
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_type().is_file() && !entry.path_is_symlink() {
            continue;
        }

        match ingest(&entry, cfg, index) {
            Ok(Some(Upsert::Created)) => {
                outcome.processed += 1;
                outcome.created += 1;
                progress.tick();
            }
            Ok(Some(Upsert::Merged)) => {
                outcome.processed += 1;
                outcome.merged += 1;
                progress.tick();
            }
            Ok(None) => outcome.excluded += 1,
            Err(err) => record_failure(&mut outcome, entry.path().to_path_buf(), err),
        }
    }

    info!(
        root = %root.display(),
        processed = outcome.processed,
        created = outcome.created,
        merged = outcome.merged,
        excluded = outcome.excluded,
        failed = outcome.failures.len(),
        "scan finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::metadata::tests::jpeg_with_date;
    use tempfile::tempdir;

    fn write(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn run(root: &Path, cfg: &ScanConfig, index: &mut ContentIndex) -> ScanOutcome {
        scan(root, cfg, index, &mut ScanProgress::hidden()).unwrap()
    }

    fn abs(path: &Path) -> String {
        std::path::absolute(path).unwrap().to_str().unwrap().to_string()
    }

    #[test]
    fn event_is_parent_name_when_a_marker_segment_exists() {
        assert_eq!(
            event_for_path(Path::new("/lib/Originals/Vacation/a.jpg")).as_deref(),
            Some("Vacation")
        );
        assert_eq!(
            event_for_path(Path::new("/lib/Masters/2019/Party/b.jpg")).as_deref(),
            Some("Party")
        );
        assert_eq!(
            event_for_path(Path::new("/lib/Previews/c.jpg")).as_deref(),
            Some("Previews")
        );
        assert_eq!(event_for_path(Path::new("/lib/Vacation/a.jpg")), None);
        assert_eq!(event_for_path(Path::new("/lib/MyMasters/Trip/a.jpg")), None);
    }

    #[cfg(unix)]
    #[test]
    fn parent_dir_segments_are_collapsed() {
        assert_eq!(
            normalized_absolute(Path::new("/lib/other/../photos/./a.jpg")).unwrap(),
            PathBuf::from("/lib/photos/a.jpg")
        );
        assert_eq!(
            normalized_absolute(Path::new("/../a.jpg")).unwrap(),
            PathBuf::from("/a.jpg")
        );
    }

    #[test]
    fn roundabout_root_spelling_records_the_same_path() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("other")).unwrap();
        write(&tmp.path().join("lib/a.jpg"), b"pixels");

        let mut index = ContentIndex::default();
        run(&tmp.path().join("other/../lib"), &ScanConfig::default(), &mut index);
        run(&tmp.path().join("lib"), &ScanConfig::default(), &mut index);

        assert_eq!(index.len(), 1);
        let (_, record) = index.iter().next().unwrap();
        assert_eq!(record.paths, vec![abs(&tmp.path().join("lib/a.jpg"))]);
    }

    #[test]
    fn exclusion_rules_apply_in_order() {
        let cfg = ScanConfig {
            min_size: 10,
            ..ScanConfig::default()
        };
        let big = || -> Result<u64, LibraryError> { Ok(100) };
        let small = || -> Result<u64, LibraryError> { Ok(3) };
        assert_eq!(
            exclusion(Path::new("/p/a.jpg"), true, &cfg, big).unwrap(),
            Some(Exclusion::Symlink)
        );
        assert_eq!(
            exclusion(Path::new("/p/a.png"), false, &cfg, big).unwrap(),
            Some(Exclusion::Extension)
        );
        assert_eq!(
            exclusion(Path::new("/p/Thumbnails/a.jpg"), false, &cfg, big).unwrap(),
            Some(Exclusion::ExcludedPath)
        );
        assert_eq!(
            exclusion(Path::new("/p/a_face.JPEG"), false, &cfg, big).unwrap(),
            Some(Exclusion::ExcludedPath)
        );
        assert_eq!(
            exclusion(Path::new("/p/a.jpg"), false, &cfg, small).unwrap(),
            Some(Exclusion::TooSmall)
        );
        assert_eq!(exclusion(Path::new("/p/a.JPG"), false, &cfg, big).unwrap(), None);
        assert_eq!(
            exclusion(Path::new("/p/a.Jpg"), false, &cfg, big).unwrap(),
            Some(Exclusion::Extension)
        );
    }

    #[test]
    fn identical_content_in_two_libraries_becomes_one_record() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("Originals/Vacation/a.jpg");
        let b = tmp.path().join("Masters/Vacation/b.jpg");
        write(&a, b"same pixels");
        write(&b, b"same pixels");

        let mut index = ContentIndex::default();
        let outcome = run(tmp.path(), &ScanConfig::default(), &mut index);
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.merged, 1);
        assert_eq!(index.len(), 1);

        let record = index.get(&hash_bytes(b"same pixels")).unwrap();
        assert_eq!(record.event.as_deref(), Some("Vacation"));
        assert_eq!(record.size, 11);
        assert!(record.paths.contains(&abs(&a)));
        assert!(record.paths.contains(&abs(&b)));
    }

    #[test]
    fn different_content_yields_different_records() {
        let tmp = tempdir().unwrap();
        write(&tmp.path().join("a.jpg"), b"one");
        write(&tmp.path().join("b.jpg"), b"two");
        let mut index = ContentIndex::default();
        run(tmp.path(), &ScanConfig::default(), &mut index);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn rescanning_does_not_duplicate_paths() {
        let tmp = tempdir().unwrap();
        write(&tmp.path().join("x/a.jpg"), b"same");
        write(&tmp.path().join("y/b.jpg"), b"same");
        let mut index = ContentIndex::default();
        run(tmp.path(), &ScanConfig::default(), &mut index);
        let first = index.clone();

        let outcome = run(tmp.path(), &ScanConfig::default(), &mut index);
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.merged, 2);
        assert_eq!(index, first);
    }

    #[test]
    fn date_comes_from_the_first_sighting_only() {
        let tmp = tempdir().unwrap();
        write(&tmp.path().join("first/IMG_20210304_153000.jpg"), b"same");
        let mut index = ContentIndex::default();
        run(&tmp.path().join("first"), &ScanConfig::default(), &mut index);

        write(&tmp.path().join("second/IMG_19990101_000000.jpg"), b"same");
        run(&tmp.path().join("second"), &ScanConfig::default(), &mut index);

        let record = index.get(&hash_bytes(b"same")).unwrap();
        assert_eq!(record.date.as_deref(), Some("2021:03:04 15:30:00"));
        assert_eq!(record.paths.len(), 2);
    }

    #[test]
    fn embedded_date_is_recorded() {
        let tmp = tempdir().unwrap();
        let bytes = jpeg_with_date("2018:02:03 04:05:06");
        write(&tmp.path().join("IMG_20210304_153000.jpg"), &bytes);
        let mut index = ContentIndex::default();
        run(tmp.path(), &ScanConfig::default(), &mut index);
        let record = index.get(&hash_bytes(&bytes)).unwrap();
        assert_eq!(record.date.as_deref(), Some("2018:02:03 04:05:06"));
    }

    #[test]
    fn filtered_files_are_not_indexed() {
        let tmp = tempdir().unwrap();
        write(&tmp.path().join("keep.jpg"), b"keep me");
        write(&tmp.path().join("notes.txt"), b"text");
        write(&tmp.path().join("Thumbnails/t.jpg"), b"thumb");
        write(&tmp.path().join("tiny.jpg"), b"x");
        let cfg = ScanConfig {
            min_size: 2,
            ..ScanConfig::default()
        };
        let mut index = ContentIndex::default();
        let outcome = run(tmp.path(), &cfg, &mut index);
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.excluded, 3);
        assert_eq!(index.len(), 1);
        assert!(index.get(&hash_bytes(b"keep me")).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("real.jpg");
        write(&target, b"real");
        std::os::unix::fs::symlink(&target, tmp.path().join("link.jpg")).unwrap();

        let mut index = ContentIndex::default();
        let outcome = run(tmp.path(), &ScanConfig::default(), &mut index);
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.excluded, 1);
        assert_eq!(index.get(&hash_bytes(b"real")).unwrap().paths, vec![abs(&target)]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = tempdir().unwrap();
        let mut index = ContentIndex::default();
        let err = scan(
            &tmp.path().join("nope"),
            &ScanConfig::default(),
            &mut index,
            &mut ScanProgress::hidden(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not accessible"));
        assert!(index.is_empty());
    }

    #[test]
    fn file_root_is_fatal() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.jpg");
        write(&file, b"x");
        let mut index = ContentIndex::default();
        let err = scan(&file, &ScanConfig::default(), &mut index, &mut ScanProgress::hidden())
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
