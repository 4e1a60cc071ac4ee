use chrono::{DateTime, NaiveDate, Utc};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

const GZIP_EXTENSION: &str = ".gz";

/// Decides where the active log file lives and how rotated files are named.
///
/// Rotated files (backups) are named `{stem}.{unix millis}.{extension}`, with
/// `.gz` appended once compressed, so they sort in creation order.
#[derive(Debug, Clone)]
pub enum FileNaming {
    /// The active file always has the same path.
    Fixed {
        /// Path of the active log file.
        path: PathBuf,
    },
    /// The active file is named `{prefix}_{YYYY-MM-DD}.log`, with the date
    /// taken when the file is opened.
    Dated {
        /// Directory holding the active file and its backups.
        dir: PathBuf,
        /// File name prefix, usually `{app name}_{app version}`.
        prefix: String,
    },
}

impl FileNaming {
    /// Always writes to `path`.
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        Self::Fixed { path: path.into() }
    }

    /// Writes to `{dir}/{prefix}_{YYYY-MM-DD}.log`.
    pub fn dated(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self::Dated {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// The directory holding the log files.
    pub fn dir(&self) -> &Path {
        match self {
            FileNaming::Fixed { path } => path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new(".")),
            FileNaming::Dated { dir, .. } => dir,
        }
    }

    /// The path of an active file opened at `now`.
    pub fn active_path(&self, now: DateTime<Utc>) -> PathBuf {
        match self {
            FileNaming::Fixed { path } => path.clone(),
            FileNaming::Dated { dir, prefix } => dir.join(format!("{prefix}_{}.log", now.format("%Y-%m-%d"))),
        }
    }

    /// The backup path for `active` rotated at `millis`.
    pub(crate) fn backup_path(active: &Path, millis: u128) -> PathBuf {
        let stem = active.file_stem().and_then(OsStr::to_str).unwrap_or_default();

        let name = match active.extension().and_then(OsStr::to_str) {
            Some(extension) => format!("{stem}.{millis}.{extension}"),
            None => format!("{stem}.{millis}"),
        };

        active.with_file_name(name)
    }

    /// Returns the rotation timestamp if `file_name` is a backup produced by this naming.
    pub(crate) fn backup_timestamp(&self, file_name: &str) -> Option<u128> {
        let name = file_name.strip_suffix(GZIP_EXTENSION).unwrap_or(file_name);

        let name = match self.extension() {
            Some(extension) => name.strip_suffix(extension)?.strip_suffix('.')?,
            None => name,
        };

        let (stem, millis) = name.rsplit_once('.')?;

        if !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let matches = match self {
            FileNaming::Fixed { path } => Some(stem) == path.file_stem().and_then(OsStr::to_str),
            FileNaming::Dated { prefix, .. } => stem
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(is_file_date),
        };

        matches.then(|| millis.parse().ok()).flatten()
    }

    fn extension(&self) -> Option<&str> {
        match self {
            FileNaming::Fixed { path } => path.extension().and_then(OsStr::to_str),
            FileNaming::Dated { .. } => Some("log"),
        }
    }
}

/// Only an exact `YYYY-MM-DD`, so `app_rc_2024-03-09` is not taken for `app`.
fn is_file_date(date: &str) -> bool {
    date.len() == 10 && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}
