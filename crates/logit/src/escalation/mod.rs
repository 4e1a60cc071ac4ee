//! Forwarding of severe entries to an external crash-reporting service.
//!
//! Reports are queued into a bounded channel and delivered by a single
//! background thread, so a slow or unreachable service never blocks the
//! logging caller.

mod http;

pub use http::HttpCrashReporter;

use crate::{
    config::Environment,
    entry::LogEntry,
    error::{EscalationError, SinkError},
    level::Level,
    sink::Sink,
};
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// What the crash-reporting service receives for one entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CrashReport {
    pub message: String,
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    /// `op`, `traceId`, `environment` and every field of the entry.
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl CrashReport {
    pub fn from_entry(entry: &LogEntry, environment: Environment) -> Self {
        let mut context = serde_json::Map::new();

        context.insert("op".into(), entry.op().into());
        context.insert("traceId".into(), entry.trace_id().into());
        context.insert("environment".into(), environment.as_str().into());

        for field in entry.fields() {
            context.insert(field.key.to_string(), (&field.value).into());
        }

        Self {
            message: entry.message().to_owned(),
            level: entry.level(),
            timestamp: entry.timestamp(),
            context,
        }
    }
}

/// The seam to the crash-reporting service.
pub trait CrashReporter: Send + Sync {
    fn report(&self, report: &CrashReport) -> Result<(), EscalationError>;
}

impl<F> CrashReporter for F
where
    F: Fn(&CrashReport) -> Result<(), EscalationError> + Send + Sync,
{
    fn report(&self, report: &CrashReport) -> Result<(), EscalationError> {
        self(report)
    }
}

#[derive(Debug, Clone)]
pub struct EscalationOptions {
    /// Reports waiting for delivery. Anything beyond is dropped.
    pub queue_capacity: usize,
    /// Upper bound for [`EscalationSink::flush`].
    pub flush_timeout: Duration,
    pub environment: Environment,
}

impl Default for EscalationOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            flush_timeout: Duration::from_secs(5),
            environment: Environment::default(),
        }
    }
}

enum Message {
    Report(CrashReport),
    Flush(Sender<()>),
}

/// A sink handing entries to a [`CrashReporter`] on a background thread.
///
/// Register it behind a [`LevelFilteredSink`](crate::LevelFilteredSink) at
/// `Level::Error` to escalate errors and fatals only.
pub struct EscalationSink {
    sender: Sender<Message>,
    options: EscalationOptions,
    dropped: AtomicU64,
    _worker: thread::JoinHandle<()>,
}

impl EscalationSink {
    /// Starts the delivery thread.
    pub fn new(reporter: Arc<dyn CrashReporter>, options: EscalationOptions) -> io::Result<Self> {
        let (sender, receiver) = channel::bounded(options.queue_capacity.max(1));

        let worker = thread::Builder::new()
            .name("logit-escalation".into())
            .spawn(move || deliver(receiver, reporter))?;

        Ok(Self {
            sender,
            options,
            dropped: AtomicU64::new(0),
            _worker: worker,
        })
    }

    /// Reports discarded because the queue was full or the worker was gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn drop_report(&self, error: EscalationError) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("dropping crash report: {error}");
    }
}

impl Sink for EscalationSink {
    fn name(&self) -> &str {
        "escalation"
    }

    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let report = CrashReport::from_entry(entry, self.options.environment);

        match self.sender.try_send(Message::Report(report)) {
            Ok(()) => (),
            Err(TrySendError::Full(_)) => self.drop_report(EscalationError::QueueFull),
            Err(TrySendError::Disconnected(_)) => self.drop_report(EscalationError::Disconnected),
        }

        Ok(())
    }

    /// Waits until every report queued before this call was handed to the
    /// reporter, or until the flush timeout passes.
    fn flush(&self) -> Result<(), SinkError> {
        let timeout = self.options.flush_timeout;
        let deadline = Instant::now() + timeout;
        let (ack, acked) = channel::bounded(1);

        match self.sender.send_timeout(Message::Flush(ack), timeout) {
            Ok(()) => (),
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!("{}", EscalationError::FlushTimeout(timeout));
                return Ok(());
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                tracing::warn!("{}", EscalationError::Disconnected);
                return Ok(());
            }
        }

        match acked.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(()) => (),
            Err(RecvTimeoutError::Timeout) => tracing::warn!("{}", EscalationError::FlushTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => tracing::warn!("{}", EscalationError::Disconnected),
        }

        Ok(())
    }
}

fn deliver(receiver: Receiver<Message>, reporter: Arc<dyn CrashReporter>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Report(report) => {
                if let Err(err) = reporter.report(&report) {
                    tracing::warn!("error delivering crash report: {err}");
                }
            }
            Message::Flush(ack) => {
                // the flushing side may have given up already
                ack.send(()).ok();
            }
        }
    }
}
