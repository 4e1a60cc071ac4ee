use crate::strategy::{RotateStrategy, Trigger};
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// The currently active log file together with its rotation state.
#[derive(Debug)]
pub(crate) struct LogFile {
    path: PathBuf,
    file: File,
    size: u64,
    strategy: RotateStrategy,
}

impl LogFile {
    /// Opens `path` for appending, creating it and its parent directories if needed.
    /// An existing file keeps its contents and counts towards the size limit.
    pub(crate) fn new(path: &Path, strategy: RotateStrategy) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_owned(),
            file,
            size,
            strategy,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Records that the open file now lives at `path`.
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn strategy(&self) -> RotateStrategy {
        self.strategy
    }

    /// Whether `incoming` more bytes require a rotation first.
    pub(crate) fn needs_rotation(&self, incoming: usize) -> Option<Trigger> {
        self.strategy.trigger(self.size, incoming as u64)
    }

    /// Restarts the rotation clock without touching the file.
    pub(crate) fn restart_clock(&mut self) {
        self.strategy = self.strategy.copy_new_start();
    }

    /// Writes the whole buffer. On failure the size is re-read from disk, so a
    /// partial write still counts towards the limit.
    pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.file.write_all(buf) {
            Ok(()) => {
                self.size += buf.len() as u64;
                Ok(())
            }
            Err(error) => {
                if let Ok(metadata) = self.file.metadata() {
                    self.size = metadata.len();
                }

                Err(error)
            }
        }
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }

    #[cfg(test)]
    pub(crate) fn set_rotate_start(&mut self, start: std::time::SystemTime) {
        self.strategy.set_rotate_start(start);
    }
}
