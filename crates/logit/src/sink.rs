use crate::{encoder::Encoder, entry::LogEntry, error::SinkError, level::Level};
use rolling_logger::RollingLogger;
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, PoisonError,
    },
};

/// A destination for log entries.
///
/// Sinks are shared between every thread logging through the same
/// [`Logger`](crate::Logger), so each sink is responsible for its own
/// synchronization.
pub trait Sink: Send + Sync {
    /// A short name used when reporting failures of this sink.
    fn name(&self) -> &str;

    /// Delivers one entry.
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError>;

    /// Pushes out anything the sink buffers.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        (**self).write(entry)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// A sink behind a minimum-severity gate.
pub struct LevelFilteredSink {
    sink: Arc<dyn Sink>,
    min_level: AtomicU8,
}

impl LevelFilteredSink {
    pub fn new(sink: impl Sink + 'static, min_level: Level) -> Self {
        Self::from_arc(Arc::new(sink), min_level)
    }

    pub fn from_arc(sink: Arc<dyn Sink>, min_level: Level) -> Self {
        Self {
            sink,
            min_level: AtomicU8::new(min_level as u8),
        }
    }

    pub fn name(&self) -> &str {
        self.sink.name()
    }

    pub fn min_level(&self) -> Level {
        Level::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    /// Changes the gate at runtime.
    pub fn set_min_level(&self, min_level: Level) {
        self.min_level.store(min_level as u8, Ordering::Relaxed);
    }

    pub fn accept(&self, entry: &LogEntry) -> bool {
        entry.level() >= self.min_level()
    }

    /// Forwards the entry if it passes the gate, otherwise does nothing.
    pub fn dispatch(&self, entry: &LogEntry) -> Result<(), SinkError> {
        if self.accept(entry) {
            self.sink.write(entry)
        } else {
            Ok(())
        }
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for LevelFilteredSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelFilteredSink")
            .field("sink", &self.name())
            .field("min_level", &self.min_level())
            .finish()
    }
}

/// Encodes entries and writes each one with a single `write_all` call.
pub struct WriterSink<W> {
    name: String,
    encoder: Encoder,
    writer: W,
}

/// Writes entries to standard output.
pub type ConsoleSink = WriterSink<io::Stdout>;

/// Writes entries to a rotating log file.
pub type FileSink = WriterSink<RollingLogger>;

impl<W> WriterSink<W> {
    pub fn new(name: impl Into<String>, encoder: Encoder, writer: W) -> Self {
        Self {
            name: name.into(),
            encoder,
            writer,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl ConsoleSink {
    pub fn stdout(encoder: Encoder) -> Self {
        Self::new("console", encoder, io::stdout())
    }
}

impl FileSink {
    pub fn file(logger: RollingLogger, encoder: Encoder) -> Self {
        Self::new("file", encoder, logger)
    }
}

impl<W> Sink for WriterSink<W>
where
    W: Send + Sync,
    for<'a> &'a W: Write,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let mut record = Vec::with_capacity(256);
        self.encoder.encode(entry, &mut record)?;

        (&self.writer).write_all(&record)?;

        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        (&self.writer).flush()?;
        Ok(())
    }
}

/// Keeps every entry in memory. Handy in tests and for inspecting what a
/// component logged.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything received so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());

        Ok(())
    }
}
