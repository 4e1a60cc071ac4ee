use crate::{error::RotationError, naming::FileNaming};
use flate2::{write::GzEncoder, Compression};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Which rotated files to keep around, and in what form.
///
/// The count limit and the age limit are applied independently: a backup is
/// removed if it is beyond the newest `max_backups`, or older than `max_age`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    max_backups: Option<usize>,
    max_age: Option<Duration>,
    compress: bool,
}

impl RetentionPolicy {
    /// Keeps every backup, uncompressed.
    pub fn keep_all() -> Self {
        Self::default()
    }

    /// Keeps at most `max_backups` of the most recent backups.
    pub fn with_max_backups(self, max_backups: usize) -> Self {
        Self {
            max_backups: Some(max_backups),
            ..self
        }
    }

    /// Removes backups rotated more than `max_age` ago.
    pub fn with_max_age(self, max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..self
        }
    }

    /// Gzips every backup right after rotation.
    pub fn with_compression(self, compress: bool) -> Self {
        Self { compress, ..self }
    }

    pub(crate) fn compress(&self) -> bool {
        self.compress
    }

    /// Removes the backups this policy no longer allows. Every failure is
    /// returned, a single failing file does not stop the cleanup.
    pub(crate) fn enforce(&self, naming: &FileNaming, now: SystemTime) -> Vec<RotationError> {
        if self.max_backups.is_none() && self.max_age.is_none() {
            return Vec::new();
        }

        let backups = match list_backups(naming) {
            Ok(backups) => backups,
            Err(error) => return vec![error],
        };

        let now = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let max_age = self.max_age.map(|age| age.as_millis());

        backups
            .into_iter()
            .enumerate()
            .filter(|(position, backup)| {
                let over_count = self.max_backups.is_some_and(|max| *position >= max);
                let too_old = max_age.is_some_and(|age| now.saturating_sub(backup.timestamp) > age);

                over_count || too_old
            })
            .filter_map(|(_, backup)| {
                std::fs::remove_file(&backup.path)
                    .map_err(|source| RotationError::Remove {
                        path: backup.path,
                        source,
                    })
                    .err()
            })
            .collect()
    }
}

/// A rotated log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Where the backup lives.
    pub path: PathBuf,
    /// When it was rotated, in milliseconds since the Unix epoch.
    pub timestamp: u128,
}

/// Lists the backups produced with `naming`, newest first.
pub fn list_backups(naming: &FileNaming) -> Result<Vec<Backup>, RotationError> {
    let dir = naming.dir();

    let list_error = |source| RotationError::List {
        path: dir.to_owned(),
        source,
    };

    let mut backups = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;

        let Some(timestamp) = entry.file_name().to_str().and_then(|name| naming.backup_timestamp(name)) else {
            continue;
        };

        backups.push(Backup {
            path: entry.path(),
            timestamp,
        });
    }

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.path.cmp(&a.path)));

    Ok(backups)
}

/// Gzips `path` into `{path}.gz` and removes the original.
pub(crate) fn compress_file(path: &Path) -> Result<PathBuf, RotationError> {
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    let gz_path = PathBuf::from(gz_path);

    let compress = || -> io::Result<()> {
        let mut source = File::open(path)?;
        let mut encoder = GzEncoder::new(File::create(&gz_path)?, Compression::default());

        io::copy(&mut source, &mut encoder)?;
        encoder.finish()?.sync_all()?;

        std::fs::remove_file(path)
    };

    compress().map_err(|source| {
        let _ = std::fs::remove_file(&gz_path);

        RotationError::Compress {
            path: path.to_owned(),
            source,
        }
    })?;

    Ok(gz_path)
}
