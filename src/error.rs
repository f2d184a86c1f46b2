use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("scan root {} is not accessible", .path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scan root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("i/o failure on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse index {}", .path.display())]
    IndexParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("path {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("record {0} has no readable source path")]
    NoSource(String),
    #[error("file name not found for {}", .0.display())]
    MissingFileName(PathBuf),
    #[error("archive {} is locked by another run", .0.display())]
    ArchiveLocked(PathBuf),
    #[error("config invalid: {0}")]
    InvalidConfig(String),
}

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable code used in `IMGLIB_WARN` lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RootInaccessible { .. } => "ROOT_INACCESSIBLE",
            Self::NotADirectory(_) => "ROOT_NOT_DIR",
            Self::Io { .. } => "IO_FAILED",
            Self::IndexParse { .. } => "INDEX_PARSE_FAILED",
            Self::NonUtf8Path(_) => "PATH_NOT_UTF8",
            Self::NoSource(_) => "SOURCE_MISSING",
            Self::MissingFileName(_) => "FILE_NAME_MISSING",
            Self::ArchiveLocked(_) => "ARCHIVE_LOCKED",
            Self::InvalidConfig(_) => "CONFIG_INVALID",
        }
    }
}
