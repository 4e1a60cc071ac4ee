use std::time::{Duration, SystemTime};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(60 * 60 * 24);

/// The reason a log file was rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The next write would have pushed the file over its maximum size.
    Size,
    /// The file has been open for at least the configured interval.
    Time,
    /// The rotation was requested explicitly.
    Manual,
}

/// A strategy that dictates when log rotation should occur.
///
/// Size and time limits can be combined, in which case the file is rotated
/// by whichever limit is reached first.
#[derive(Debug, Clone, Copy)]
pub struct RotateStrategy {
    /// Maximum number of bytes a file may hold before rotating.
    max_size: Option<u64>,
    /// Maximum time a file stays active before rotating.
    interval: Option<Duration>,
    /// The time when the current file started.
    rotate_start: SystemTime,
}

impl RotateStrategy {
    /// Creates a new `RotateStrategy` that never rotates.
    pub fn never() -> Self {
        Self::new(None, None)
    }

    /// Creates a new `RotateStrategy` that rotates daily.
    pub fn daily() -> Self {
        Self::every(DAY)
    }

    /// Creates a new `RotateStrategy` that rotates hourly.
    pub fn hourly() -> Self {
        Self::every(HOUR)
    }

    /// Creates a new `RotateStrategy` that rotates every minute.
    pub fn minutely() -> Self {
        Self::every(MINUTE)
    }

    /// Creates a new `RotateStrategy` that rotates once the file has been
    /// active for the given interval.
    pub fn every(interval: Duration) -> Self {
        Self::new(None, Some(interval))
    }

    /// Creates a new `RotateStrategy` that rotates when the log reaches the given size in bytes.
    ///
    /// The rotation happens before the write that would exceed the limit, so the
    /// write lands in the fresh file and no file grows past `max_size` unless a
    /// single write is larger than the limit on its own.
    pub fn size(max_size: u64) -> Self {
        Self::new(Some(max_size), None)
    }

    /// Adds a size limit to this strategy.
    pub fn with_max_size(self, max_size: u64) -> Self {
        Self {
            max_size: Some(max_size),
            ..self
        }
    }

    /// Adds a time limit to this strategy.
    pub fn with_interval(self, interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..self
        }
    }

    /// The configured size limit, if any.
    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// The configured time limit, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    fn new(max_size: Option<u64>, interval: Option<Duration>) -> Self {
        Self {
            max_size,
            interval,
            rotate_start: SystemTime::now(),
        }
    }

    /// Checks whether writing `incoming` more bytes into a file currently holding
    /// `current_size` bytes requires a rotation first. The size limit is checked
    /// before the time limit.
    pub(crate) fn trigger(self, current_size: u64, incoming: u64) -> Option<Trigger> {
        if let Some(max_size) = self.max_size {
            if current_size.saturating_add(incoming) > max_size {
                return Some(Trigger::Size);
            }
        }

        match self.interval {
            Some(interval) if self.lifetime() >= interval => Some(Trigger::Time),
            _ => None,
        }
    }

    /// Returns a copy of the current `RotateStrategy` with a new rotation start time.
    pub(crate) fn copy_new_start(self) -> Self {
        Self {
            rotate_start: SystemTime::now(),
            ..self
        }
    }

    /// Returns the duration of time since the rotation started.
    pub(crate) fn lifetime(self) -> Duration {
        SystemTime::now().duration_since(self.rotate_start).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn set_rotate_start(&mut self, start: SystemTime) {
        self.rotate_start = start;
    }
}
