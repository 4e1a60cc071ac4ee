use std::{io, path::PathBuf};

/// A failure while rotating a log file or cleaning up old ones.
///
/// These never fail the write that caused the rotation: the logger keeps
/// writing to the file it already has open and reports the error through
/// [`RollingLogger::rotation_errors`](crate::RollingLogger::rotation_errors).
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The active file could not be flushed before rotating.
    #[error("flushing {}: {source}", .path.display())]
    Flush {
        /// The active file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The active file could not be renamed into a backup.
    #[error("renaming {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        /// The active file.
        from: PathBuf,
        /// The backup path.
        to: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A new active file could not be opened.
    #[error("opening {}: {source}", .path.display())]
    Open {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A backup could not be compressed.
    #[error("compressing {}: {source}", .path.display())]
    Compress {
        /// The backup being compressed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The log directory could not be listed.
    #[error("listing {}: {source}", .path.display())]
    List {
        /// The log directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// An old backup could not be removed.
    #[error("removing {}: {source}", .path.display())]
    Remove {
        /// The backup that should have been removed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}
