//! This crate provides a rolling logger that rotates log files when they grow
//! past a size limit or have been active for too long, whichever happens
//! first. The `RollingLogger` struct implements the `Write` trait, both by
//! value and by shared reference, so it can be used as a standard writer and
//! shared between threads.
//!
//! The `RollingLogger` struct contains the following key components:
//!
//! * `naming`: Where the active file lives and how backups are named.
//! * `retention`: How many backups to keep, for how long, and whether to
//!   compress them.
//! * `state`: The active file, guarded by a mutex held across the rotation
//!   check, the rotation and the write.
//!
//! Rotation failures never fail a write. The logger keeps appending to the
//! file it has open and reports the failure through a side channel, see
//! [`RollingLogger::rotation_errors`].

#![deny(missing_docs)]

mod error;
mod log_file;
mod naming;
mod retention;
mod strategy;

pub use error::RotationError;
pub use naming::FileNaming;
pub use retention::{list_backups, Backup, RetentionPolicy};
pub use strategy::{RotateStrategy, Trigger};

use chrono::{DateTime, Utc};
use crossbeam::channel::{Receiver, Sender};
use log_file::LogFile;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// A logger that rolls over based on a specified strategy (time duration, file size or both).
#[derive(Debug)]
pub struct RollingLogger {
    naming: FileNaming,
    retention: RetentionPolicy,
    state: Mutex<State>,
    error_sender: Sender<RotationError>,
    error_receiver: Receiver<RotationError>,
}

#[derive(Debug)]
struct State {
    file: LogFile,
    last_backup: u128,
}

impl RollingLogger {
    /// Creates a new `RollingLogger` writing to `path`, keeping every backup.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the log file cannot be created.
    pub fn new(path: &Path, rotate_strategy: RotateStrategy) -> io::Result<Self> {
        Self::with_naming(FileNaming::fixed(path), rotate_strategy, RetentionPolicy::keep_all())
    }

    /// Creates a new `RollingLogger` with full control over file naming and retention.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the log directory or the log file cannot be created.
    pub fn with_naming(
        naming: FileNaming,
        rotate_strategy: RotateStrategy,
        retention: RetentionPolicy,
    ) -> io::Result<Self> {
        Self::open_at(naming, rotate_strategy, retention, Utc::now())
    }

    fn open_at(
        naming: FileNaming,
        rotate_strategy: RotateStrategy,
        retention: RetentionPolicy,
        now: DateTime<Utc>,
    ) -> io::Result<Self> {
        let file = LogFile::new(&naming.active_path(now), rotate_strategy)?;
        let (error_sender, error_receiver) = crossbeam::channel::bounded(ERROR_CHANNEL_CAPACITY);

        Ok(Self {
            naming,
            retention,
            state: Mutex::new(State { file, last_backup: 0 }),
            error_sender,
            error_receiver,
        })
    }

    /// The path of the file currently being written to.
    pub fn current_path(&self) -> PathBuf {
        self.lock().file.path().to_owned()
    }

    /// Bytes written to the current file, including what it held when opened.
    pub fn current_size(&self) -> u64 {
        self.lock().file.size()
    }

    /// A receiver for rotation and cleanup failures.
    ///
    /// The channel is bounded; when nobody drains it, further errors are only
    /// reported through `tracing`.
    pub fn rotation_errors(&self) -> Receiver<RotationError> {
        self.error_receiver.clone()
    }

    /// Rotates the current file right away, even if no limit has been reached.
    ///
    /// # Errors
    ///
    /// Returns the error if the file could not be rotated, in which case the
    /// logger continues with the file it had. Cleanup failures after a
    /// successful rotation go to [`RollingLogger::rotation_errors`].
    pub fn rotate(&self) -> Result<(), RotationError> {
        let mut state = self.lock();
        self.flush_and_rotate(&mut state, Trigger::Manual)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks the limits, rotates if needed, and writes the whole buffer into
    /// the current file, all under one lock.
    fn write_locked(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();

        match state.file.needs_rotation(buf.len()) {
            // An empty file has nothing worth archiving; it simply becomes the new file.
            Some(Trigger::Time) if state.file.size() == 0 => state.file.restart_clock(),
            Some(_) if state.file.size() == 0 => (),
            Some(trigger) => {
                if let Err(error) = self.flush_and_rotate(&mut state, trigger) {
                    self.report(error);
                }
            }
            None => (),
        }

        state.file.write_all(buf)?;

        Ok(buf.len())
    }

    /// Flushes the current log file, renames it into a backup and opens a new
    /// file. If any step fails, the previous file handle stays in place and is
    /// found again under its active name by the next rotation.
    fn flush_and_rotate(&self, state: &mut State, trigger: Trigger) -> Result<(), RotationError> {
        let from = state.file.path().to_owned();

        state.file.flush().map_err(|source| RotationError::Flush {
            path: from.clone(),
            source,
        })?;

        let now = SystemTime::now();
        let (to, millis) = self.next_backup_path(&from, now, state.last_backup);

        std::fs::rename(&from, &to).map_err(|source| RotationError::Rename {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        state.last_backup = millis;

        let path = self.naming.active_path(DateTime::<Utc>::from(now));

        match LogFile::new(&path, state.file.strategy().copy_new_start()) {
            Ok(file) => state.file = file,
            Err(source) => {
                self.restore_active(state, &to, &from);
                return Err(RotationError::Open { path, source });
            }
        }

        tracing::debug!(?trigger, backup = %to.display(), "rotated log file");

        self.housekeeping(&to, now);

        Ok(())
    }

    /// Moves a backup whose successor could not be opened back to `active`.
    fn restore_active(&self, state: &mut State, backup: &Path, active: &Path) {
        if let Err(source) = std::fs::rename(backup, active) {
            self.report(RotationError::Rename {
                from: backup.to_owned(),
                to: active.to_owned(),
                source,
            });

            // keep rotating the file the handle actually points to
            state.file.set_path(backup.to_owned());
        }
    }

    /// Picks a backup name that sorts after every previous backup and is not taken yet.
    fn next_backup_path(&self, active: &Path, now: SystemTime, last_backup: u128) -> (PathBuf, u128) {
        let now = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let mut millis = now.max(last_backup + 1);

        loop {
            let path = FileNaming::backup_path(active, millis);
            let mut gz_path = path.as_os_str().to_owned();
            gz_path.push(".gz");

            if !path.exists() && !Path::new(&gz_path).exists() {
                return (path, millis);
            }

            millis += 1;
        }
    }

    fn housekeeping(&self, backup: &Path, now: SystemTime) {
        if self.retention.compress() {
            if let Err(error) = retention::compress_file(backup) {
                self.report(error);
            }
        }

        for error in self.retention.enforce(&self.naming, now) {
            self.report(error);
        }
    }

    fn report(&self, error: RotationError) {
        tracing::error!("log rotation failed: {error}");

        // Full channel: the error above is the only trace left.
        let _ = self.error_sender.try_send(error);
    }

    #[cfg(test)]
    pub(crate) fn set_rotate_start(&self, start: SystemTime) {
        self.lock().file.set_rotate_start(start);
    }
}

impl Write for &RollingLogger {
    /// Writes a buffer into the current log file. If the log file needs to be rotated
    /// according to the specified strategy, it flushes and rotates the log file before
    /// writing the buffer. The buffer is never split between two files.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_locked(buf)
    }

    /// Flushes the current log file, ensuring all buffered data reaches the disk.
    fn flush(&mut self) -> io::Result<()> {
        self.lock().file.flush()
    }
}

impl Write for RollingLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_locked(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::{list_backups, FileNaming, RetentionPolicy, RollingLogger, RotateStrategy, RotationError};
    use chrono::Utc;
    use std::{
        io::Write,
        path::{Path, PathBuf},
        time::{Duration, SystemTime},
    };
    use tempfile::TempDir;

    /// Every file belonging to the logger, oldest backup first, active file last.
    fn files_in_creation_order(logger: &RollingLogger, naming: &FileNaming) -> Vec<PathBuf> {
        let mut files: Vec<_> = list_backups(naming)
            .unwrap()
            .into_iter()
            .rev()
            .map(|backup| backup.path)
            .collect();

        files.push(logger.current_path());
        files
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn never_rotate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");

        let mut logger = RollingLogger::new(&path, RotateStrategy::never()).unwrap();

        writeln!(&mut logger, "foo").unwrap();
        writeln!(&mut logger, "bar").unwrap();
        writeln!(&mut logger, "lol").unwrap();

        let data = std::fs::read_to_string(path).unwrap();

        insta::assert_snapshot!(&data, @r###"
        foo
        bar
        lol
        "###);

        assert_eq!(1, dir.path().read_dir().unwrap().count());
    }

    #[test]
    fn rotate_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let naming = FileNaming::fixed(&path);

        let mut logger = RollingLogger::new(&path, RotateStrategy::size(4)).unwrap();

        writeln!(&mut logger, "foo").unwrap();
        writeln!(&mut logger, "bar").unwrap();
        writeln!(&mut logger, "lol").unwrap();

        let files = files_in_creation_order(&logger, &naming);
        assert_eq!(3, files.len());

        insta::assert_snapshot!(read(&files[0]), @"foo");
        insta::assert_snapshot!(read(&files[1]), @"bar");
        insta::assert_snapshot!(read(&files[2]), @"lol");
    }

    #[test]
    fn rotate_before_exceeding_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let logger = RollingLogger::new(&path, RotateStrategy::size(100)).unwrap();
        let record = [b'x'; 40];

        for _ in 0..3 {
            (&logger).write_all(&record).unwrap();
        }

        let sizes: Vec<_> = files_in_creation_order(&logger, &naming)
            .iter()
            .map(|file| std::fs::metadata(file).unwrap().len())
            .collect();

        assert_eq!(vec![80, 40], sizes);
    }

    #[test]
    fn oversized_record_goes_into_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let logger = RollingLogger::new(&path, RotateStrategy::size(10)).unwrap();

        (&logger).write_all(&[b'x'; 25]).unwrap();
        (&logger).write_all(&[b'y'; 5]).unwrap();

        let sizes: Vec<_> = files_in_creation_order(&logger, &naming)
            .iter()
            .map(|file| std::fs::metadata(file).unwrap().len())
            .collect();

        assert_eq!(vec![25, 5], sizes);
    }

    #[test]
    fn rotate_minutely() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let naming = FileNaming::fixed(&path);

        let mut logger = RollingLogger::new(&path, RotateStrategy::minutely()).unwrap();

        writeln!(&mut logger, "foo").unwrap();

        logger.set_rotate_start(SystemTime::now() - Duration::from_secs(59));
        writeln!(&mut logger, "bar").unwrap();

        logger.set_rotate_start(SystemTime::now() - Duration::from_secs(60));
        writeln!(&mut logger, "lol").unwrap();

        let files = files_in_creation_order(&logger, &naming);
        assert_eq!(2, files.len());

        insta::assert_snapshot!(read(&files[0]), @r###"
        foo
        bar
        "###);

        insta::assert_snapshot!(read(&files[1]), @"lol");
    }

    #[test]
    fn rotate_daily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let naming = FileNaming::fixed(&path);

        let mut logger = RollingLogger::new(&path, RotateStrategy::daily()).unwrap();

        writeln!(&mut logger, "foo").unwrap();

        logger.set_rotate_start(SystemTime::now() - Duration::from_secs(60 * 60 * 24 - 1));
        writeln!(&mut logger, "bar").unwrap();

        logger.set_rotate_start(SystemTime::now() - Duration::from_secs(60 * 60 * 24));
        writeln!(&mut logger, "lol").unwrap();

        let files = files_in_creation_order(&logger, &naming);
        assert_eq!(2, files.len());

        insta::assert_snapshot!(read(&files[0]), @r###"
        foo
        bar
        "###);

        insta::assert_snapshot!(read(&files[1]), @"lol");
    }

    #[test]
    fn time_trigger_without_size_pressure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let strategy = RotateStrategy::size(1024 * 1024).with_interval(Duration::from_millis(100));
        let logger = RollingLogger::new(&path, strategy).unwrap();

        for _ in 0..6 {
            (&logger).write_all(b"tick\n").unwrap();
            std::thread::sleep(Duration::from_millis(40));
        }

        let files = files_in_creation_order(&logger, &naming);
        assert!(files.len() > 1, "expected a time based rotation, got {files:?}");

        let total: String = files.iter().map(|file| read(file)).collect();
        assert_eq!("tick\n".repeat(6), total);
    }

    #[test]
    fn empty_file_is_not_archived_on_time_trigger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");

        let mut logger = RollingLogger::new(&path, RotateStrategy::minutely()).unwrap();

        logger.set_rotate_start(SystemTime::now() - Duration::from_secs(120));
        writeln!(&mut logger, "foo").unwrap();

        assert_eq!(1, dir.path().read_dir().unwrap().count());
        insta::assert_snapshot!(read(&path), @"foo");
    }

    #[test]
    fn concatenated_files_reproduce_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let logger = RollingLogger::new(&path, RotateStrategy::size(64)).unwrap();
        let mut expected = Vec::new();

        for i in 0..50 {
            let record = format!("record number {i} {}\n", "-".repeat(i % 13));
            (&logger).write_all(record.as_bytes()).unwrap();
            expected.extend_from_slice(record.as_bytes());
        }

        let files = files_in_creation_order(&logger, &naming);
        assert!(files.len() > 1);

        let mut actual = Vec::new();

        for file in &files {
            let data = std::fs::read(file).unwrap();
            assert!(data.len() <= 64, "{} holds {} bytes", file.display(), data.len());
            actual.extend_from_slice(&data);
        }

        assert_eq!(expected, actual);
    }

    #[test]
    fn retention_keeps_newest_backups() {
        let dir = TempDir::new().unwrap();
        let naming = FileNaming::fixed(dir.path().join("app.log"));

        let logger = RollingLogger::with_naming(
            naming.clone(),
            RotateStrategy::size(10),
            RetentionPolicy::keep_all().with_max_backups(2),
        )
        .unwrap();

        for i in 0..6 {
            (&logger).write_all(format!("entry {i}\n").as_bytes()).unwrap();
        }

        let files = files_in_creation_order(&logger, &naming);
        assert_eq!(3, files.len());

        insta::assert_snapshot!(read(&files[0]), @"entry 3");
        insta::assert_snapshot!(read(&files[1]), @"entry 4");
        insta::assert_snapshot!(read(&files[2]), @"entry 5");
    }

    #[test]
    fn compressed_backups() {
        let dir = TempDir::new().unwrap();
        let naming = FileNaming::fixed(dir.path().join("app.log"));

        let logger = RollingLogger::with_naming(
            naming.clone(),
            RotateStrategy::size(10),
            RetentionPolicy::keep_all().with_compression(true),
        )
        .unwrap();

        (&logger).write_all(b"entry 0\n").unwrap();
        (&logger).write_all(b"entry 1\n").unwrap();

        let backups = list_backups(&naming).unwrap();
        assert_eq!(1, backups.len());
        assert_eq!(Some("gz"), backups[0].path.extension().and_then(|e| e.to_str()));
        assert!(logger.rotation_errors().try_recv().is_err());
    }

    #[test]
    fn dated_file_names() {
        let dir = TempDir::new().unwrap();
        let naming = FileNaming::dated(dir.path(), "billing_1.4.2");

        let logger = RollingLogger::with_naming(naming, RotateStrategy::never(), RetentionPolicy::keep_all()).unwrap();

        let name = logger.current_path().file_name().unwrap().to_str().unwrap().to_owned();
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

        assert_eq!(format!("billing_1.4.2_{today}.log"), name);
    }

    #[test]
    fn manual_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let logger = RollingLogger::new(&path, RotateStrategy::never()).unwrap();

        (&logger).write_all(b"before\n").unwrap();
        logger.rotate().unwrap();
        (&logger).write_all(b"after\n").unwrap();

        let files = files_in_creation_order(&logger, &naming);
        assert_eq!(2, files.len());

        insta::assert_snapshot!(read(&files[0]), @"before");
        insta::assert_snapshot!(read(&files[1]), @"after");
    }

    #[cfg(unix)]
    #[test]
    fn failed_rotation_keeps_writing() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let path = log_dir.join("app.log");

        let logger = RollingLogger::new(&path, RotateStrategy::size(8)).unwrap();
        let errors = logger.rotation_errors();

        (&logger).write_all(b"first\n").unwrap();

        // The open handle survives, but nothing can be renamed inside a removed directory.
        std::fs::remove_dir_all(&log_dir).unwrap();

        (&logger).write_all(b"second\n").unwrap();

        assert!(matches!(errors.try_recv(), Ok(RotationError::Rename { .. })));
        assert_eq!(13, logger.current_size());
        assert_eq!(path, logger.current_path());
    }

    #[test]
    fn failed_open_restores_active_file() {
        let dir = TempDir::new().unwrap();
        let naming = FileNaming::dated(dir.path(), "app");

        let yesterday = Utc::now() - chrono::Duration::days(1);
        let stale = naming.active_path(yesterday);
        let today = naming.active_path(Utc::now());

        let logger =
            RollingLogger::open_at(naming.clone(), RotateStrategy::size(8), RetentionPolicy::keep_all(), yesterday)
                .unwrap();

        let errors = logger.rotation_errors();

        // a directory in place of today's file makes opening it fail
        std::fs::create_dir(&today).unwrap();

        (&logger).write_all(b"first\n").unwrap();
        (&logger).write_all(b"second\n").unwrap();

        assert!(matches!(errors.try_recv(), Ok(RotationError::Open { .. })));
        assert!(errors.try_recv().is_err());
        assert_eq!(stale, logger.current_path());
        assert_eq!("first\nsecond\n", std::fs::read_to_string(&stale).unwrap());
        assert!(list_backups(&naming).unwrap().is_empty());

        std::fs::remove_dir(&today).unwrap();

        (&logger).write_all(b"later\n").unwrap();
        (&logger).write_all(b"later\n").unwrap();

        assert!(errors.try_recv().is_err());
        assert_eq!(today, logger.current_path());
        assert!(!stale.exists());

        let backups = list_backups(&naming).unwrap();

        assert_eq!(2, backups.len());
        assert_eq!("later\n", std::fs::read_to_string(&backups[0].path).unwrap());
        assert_eq!("first\nsecond\n", std::fs::read_to_string(&backups[1].path).unwrap());
        assert_eq!("later\n", std::fs::read_to_string(&today).unwrap());
    }

    #[test]
    fn concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let naming = FileNaming::fixed(&path);

        let logger = RollingLogger::new(&path, RotateStrategy::size(200)).unwrap();

        std::thread::scope(|scope| {
            for thread in 0..4 {
                let logger = &logger;

                scope.spawn(move || {
                    for i in 0..100 {
                        let mut writer = logger;
                        writer.write_all(format!("thread-{thread} line-{i:04}\n").as_bytes()).unwrap();
                    }
                });
            }
        });

        let mut lines = Vec::new();

        for file in files_in_creation_order(&logger, &naming) {
            let data = read(&file);
            assert!(data.len() <= 200);
            lines.extend(data.lines().map(str::to_owned));
        }

        assert_eq!(400, lines.len());
        assert!(lines.iter().all(|line| line.starts_with("thread-") && line.len() == 18));
    }
}
