use crate::{
    config::LoggerConfig,
    encoder::Encoder,
    entry::{Field, LogEntry},
    error::ConfigError,
    escalation::{CrashReporter, EscalationOptions, EscalationSink, HttpCrashReporter},
    level::Level,
    router::SinkRouter,
    sink::{ConsoleSink, FileSink, LevelFilteredSink, Sink},
    trace::TraceContext,
};
use crossbeam::channel::Receiver;
use rolling_logger::{FileNaming, RetentionPolicy, RollingLogger, RotateStrategy, RotationError};
use std::{backtrace::Backtrace, error::Error, fmt, sync::Arc};

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

struct Inner {
    router: SinkRouter,
    app_name: String,
    app_version: String,
    capture_backtrace: bool,
    rotation_errors: Option<Receiver<RotationError>>,
    on_exit: ExitHook,
}

/// The logging facade handed to application code.
///
/// Cheap to clone; every clone shares the same sinks. Logging calls never
/// fail: sink failures are reported through `tracing` and swallowed.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Builds console, file and escalation sinks from the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration is invalid, the log file
    /// cannot be opened or the escalation worker cannot be started.
    pub fn new(config: &LoggerConfig) -> Result<Self, ConfigError> {
        Self::with_reporter(config, None)
    }

    /// Like [`Logger::new`], but escalates into the given reporter instead of
    /// the HTTP endpoint from the configuration.
    pub fn with_reporter(
        config: &LoggerConfig,
        reporter: Option<Arc<dyn CrashReporter>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let encoder = Encoder::new(config.encoder_style(), config.time_format.clone());

        let mut builder = Self::builder(&config.app.name, &config.app.version)
            .capture_backtrace(config.capture_backtrace);

        if config.console.enabled {
            builder = builder.sink(ConsoleSink::stdout(encoder.clone()), config.console.level);
        }

        if config.file.enabled {
            let file = &config.file;

            let naming = FileNaming::dated(&file.dir, format!("{}_{}", config.app.name, config.app.version));

            let strategy =
                RotateStrategy::size(file.max_size.bytes().max(0).unsigned_abs()).with_interval(file.rotation_interval);

            let mut retention = RetentionPolicy::keep_all().with_compression(file.compress);

            if let Some(max_backups) = file.max_backups {
                retention = retention.with_max_backups(max_backups);
            }

            if let Some(max_age) = file.max_age {
                retention = retention.with_max_age(max_age);
            }

            let writer = RollingLogger::with_naming(naming, strategy, retention).map_err(ConfigError::OpenLogFile)?;

            builder = builder
                .rotation_errors(writer.rotation_errors())
                .sink(FileSink::file(writer, encoder), file.level);
        }

        if config.escalation_active() {
            let escalation = &config.escalation;

            let reporter = match reporter {
                Some(reporter) => reporter,
                None => {
                    let endpoint = escalation
                        .endpoint
                        .clone()
                        .ok_or(ConfigError::MissingEscalationEndpoint)?;

                    Arc::new(HttpCrashReporter::new(
                        endpoint,
                        escalation.key.clone(),
                        escalation.request_timeout,
                    ))
                }
            };

            let options = EscalationOptions {
                queue_capacity: escalation.queue_capacity,
                flush_timeout: escalation.flush_timeout,
                environment: config.app.environment,
            };

            let sink = EscalationSink::new(reporter, options).map_err(ConfigError::EscalationWorker)?;

            builder = builder.sink(sink, escalation.level);
        }

        Ok(builder.build())
    }

    /// Starts a logger with hand-picked sinks.
    pub fn builder(app_name: impl Into<String>, app_version: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder {
            app_name: app_name.into(),
            app_version: app_version.into(),
            sinks: Vec::new(),
            capture_backtrace: false,
            rotation_errors: None,
            on_exit: None,
        }
    }

    /// A logger without any sinks. Nothing is written anywhere.
    pub fn noop() -> Self {
        Self::builder("", "").build()
    }

    /// Starts a new trace, or continues the one identified by `candidate`.
    pub fn new_trace_context(&self, candidate: Option<&str>) -> TraceContext {
        TraceContext::new(candidate)
    }

    /// The registered sinks, e.g. to adjust their levels at runtime.
    pub fn sinks(&self) -> &[LevelFilteredSink] {
        self.inner.router.sinks()
    }

    /// Failures rotating or cleaning up the log file, when there is one.
    ///
    /// Writing never fails because of them; they are also logged through
    /// `tracing`.
    pub fn rotation_errors(&self) -> Option<&Receiver<RotationError>> {
        self.inner.rotation_errors.as_ref()
    }

    pub fn debug(&self, fields: impl IntoIterator<Item = Field>) {
        self.emit(Level::Debug, None, "debug".to_owned(), "debug", fields, Vec::new());
    }

    pub fn info(
        &self,
        trace: Option<&TraceContext>,
        message: impl Into<String>,
        op: &str,
        fields: impl IntoIterator<Item = Field>,
    ) {
        self.emit(Level::Info, trace, message.into(), op, fields, Vec::new());
    }

    pub fn warn(
        &self,
        trace: Option<&TraceContext>,
        message: impl Into<String>,
        op: &str,
        fields: impl IntoIterator<Item = Field>,
    ) {
        self.emit(Level::Warn, trace, message.into(), op, fields, Vec::new());
    }

    /// Logs `err` as the message, with its source chain as the `cause` field.
    pub fn error(
        &self,
        trace: Option<&TraceContext>,
        err: &dyn Error,
        op: &str,
        fields: impl IntoIterator<Item = Field>,
    ) {
        let details = self.error_details(err);
        self.emit(Level::Error, trace, err.to_string(), op, fields, details);
    }

    /// Logs like [`Logger::error`], flushes every sink and terminates the
    /// process with exit code 1.
    pub fn fatal(
        &self,
        trace: Option<&TraceContext>,
        err: &dyn Error,
        op: &str,
        fields: impl IntoIterator<Item = Field>,
    ) {
        let details = self.error_details(err);
        self.emit(Level::Fatal, trace, err.to_string(), op, fields, details);
        self.flush();

        (self.inner.on_exit)(1);
    }

    /// Flushes every sink, waiting for queued crash reports to be delivered.
    pub fn flush(&self) {
        if let Err(err) = self.inner.router.flush() {
            tracing::error!("error flushing log sinks: {err}");
        }
    }

    /// Flushes everything before the process exits.
    pub fn shutdown(&self) {
        tracing::debug!("shutting down logger");
        self.flush();
    }

    fn error_details(&self, err: &dyn Error) -> Vec<Field> {
        let mut details = Vec::new();

        let mut causes = Vec::new();
        let mut source = err.source();

        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        if !causes.is_empty() {
            details.push(Field::new("cause", causes.join(": ")));
        }

        if self.inner.capture_backtrace {
            details.push(Field::new("stacktrace", Backtrace::force_capture().to_string()));
        }

        details
    }

    fn emit(
        &self,
        level: Level,
        trace: Option<&TraceContext>,
        message: String,
        op: &str,
        fields: impl IntoIterator<Item = Field>,
        details: Vec<Field>,
    ) {
        let router = &self.inner.router;

        if router.is_empty() {
            return;
        }

        let mut builder = LogEntry::builder(level, message)
            .op(op)
            .field("appName", self.inner.app_name.clone())
            .field("appVersion", self.inner.app_version.clone())
            .fields(fields)
            .fields(details);

        if let Some(trace) = trace {
            builder = builder.trace_id(trace.trace_id());
        }

        if let Err(err) = router.dispatch(&builder.build()) {
            tracing::error!("error dispatching log entry: {err}");
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("app_name", &self.inner.app_name)
            .field("app_version", &self.inner.app_version)
            .field("sinks", &self.inner.router)
            .finish_non_exhaustive()
    }
}

pub struct LoggerBuilder {
    app_name: String,
    app_version: String,
    sinks: Vec<LevelFilteredSink>,
    capture_backtrace: bool,
    rotation_errors: Option<Receiver<RotationError>>,
    on_exit: Option<ExitHook>,
}

impl LoggerBuilder {
    /// Registers a sink receiving entries at or above `min_level`.
    pub fn sink(mut self, sink: impl Sink + 'static, min_level: Level) -> Self {
        self.sinks.push(LevelFilteredSink::new(sink, min_level));
        self
    }

    pub fn capture_backtrace(mut self, capture_backtrace: bool) -> Self {
        self.capture_backtrace = capture_backtrace;
        self
    }

    /// Exposes the rotation failures of a file sink through
    /// [`Logger::rotation_errors`].
    pub fn rotation_errors(mut self, rotation_errors: Receiver<RotationError>) -> Self {
        self.rotation_errors = Some(rotation_errors);
        self
    }

    /// Replaces the process exit performed after a fatal entry.
    pub fn on_exit(mut self, on_exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Box::new(on_exit));
        self
    }

    pub fn build(self) -> Logger {
        let on_exit = self.on_exit.unwrap_or_else(|| Box::new(|code| std::process::exit(code)));

        Logger {
            inner: Arc::new(Inner {
                router: SinkRouter::new(self.sinks),
                app_name: self.app_name,
                app_version: self.app_version,
                capture_backtrace: self.capture_backtrace,
                rotation_errors: self.rotation_errors,
                on_exit,
            }),
        }
    }
}
